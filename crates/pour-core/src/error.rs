//! Error taxonomy shared by every core operation.

use std::path::PathBuf;

use pour_schema::{ManifestError, OsConstraint, OsVersion, PackageName, Sha256Digest, Version};
use thiserror::Error;

/// Convenience alias used throughout the core.
pub type Result<T, E = Error> = std::result::Result<T, E>;

/// Every failure a core operation can surface.
#[derive(Error, Debug)]
pub enum Error {
    /// A manifest failed to parse or validate.
    #[error("Invalid manifest: {0}")]
    InvalidManifest(#[from] ManifestError),

    /// The same `(name, version)` was ingested with a different checksum.
    #[error("Checksum drift for {name} {version}: recorded {recorded}, offered {offered}")]
    DuplicateVersionConflict {
        /// Package name.
        name: PackageName,
        /// Conflicting version.
        version: Version,
        /// Checksum already in the store.
        recorded: Sha256Digest,
        /// Checksum of the rejected manifest.
        offered: Sha256Digest,
    },

    /// No manifest (or no installed package) matches the request.
    #[error("Not found: {0}")]
    NotFound(String),

    /// Downloaded bytes do not hash to the manifest checksum.
    #[error("Integrity mismatch: expected {expected}, got {actual}")]
    IntegrityMismatch {
        /// Checksum recorded in the manifest.
        expected: Sha256Digest,
        /// Checksum of the bytes that were offered.
        actual: Sha256Digest,
    },

    /// The host OS is older than the manifest requires.
    #[error("Unsupported platform: host {host} does not satisfy '{required}'")]
    UnsupportedPlatform {
        /// Host OS version, or `unknown` when it could not be detected.
        host: String,
        /// The manifest's constraint.
        required: String,
    },

    /// The artifact could not be unpacked or does not contain the bundle.
    #[error("Extraction failed: {0}")]
    ExtractionError(String),

    /// `install` was called while the package is not absent.
    #[error("{0} is already installed")]
    AlreadyInstalled(PackageName),

    /// `upgrade` or `uninstall` was called while the package is absent.
    #[error("{0} is not installed")]
    NotInstalled(PackageName),

    /// The artifact fetcher or update provider failed.
    #[error("Fetch failed: {0}")]
    FetchError(String),

    /// A fetch or extraction exceeded its time budget. Safe to retry.
    #[error("Timed out after {secs}s during {operation}")]
    TransportTimeout {
        /// What was running when the budget elapsed.
        operation: &'static str,
        /// The budget in seconds.
        secs: u64,
    },

    /// Some cleanup paths could not be removed during a full uninstall.
    #[error("{} cleanup path(s) could not be removed", .failures.len())]
    PartialCleanupFailure {
        /// Each path that was skipped with the reason it failed.
        failures: Vec<(PathBuf, String)>,
    },

    /// A filesystem operation failed.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// The installed-state store failed.
    #[error("State store error: {0}")]
    State(String),

    /// Settings could not be loaded.
    #[error("Configuration error: {0}")]
    Config(String),
}

impl Error {
    /// Build an [`Error::UnsupportedPlatform`] for `host` against `required`.
    pub fn unsupported(host: Option<&OsVersion>, required: &OsConstraint) -> Self {
        Self::UnsupportedPlatform {
            host: host.map_or_else(|| "unknown".to_string(), ToString::to_string),
            required: required.to_string(),
        }
    }

    /// Process exit code for this error kind.
    pub fn exit_code(&self) -> u8 {
        match self {
            Self::InvalidManifest(_) => 2,
            Self::DuplicateVersionConflict { .. } => 10,
            Self::NotFound(_) => 11,
            Self::IntegrityMismatch { .. } => 12,
            Self::UnsupportedPlatform { .. } => 13,
            Self::ExtractionError(_) => 14,
            Self::AlreadyInstalled(_) => 15,
            Self::NotInstalled(_) => 16,
            Self::FetchError(_) => 17,
            Self::TransportTimeout { .. } => 18,
            Self::PartialCleanupFailure { .. } => 19,
            Self::Io(_) => 20,
            Self::State(_) => 21,
            Self::Config(_) => 22,
        }
    }

    /// Whether retrying the same operation may succeed.
    pub fn is_retriable(&self) -> bool {
        matches!(self, Self::TransportTimeout { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn exit_codes_are_distinct_and_non_zero() {
        let digest = Sha256Digest::compute(b"x");
        let errors = [
            Error::InvalidManifest(ManifestError::EmptyField("name")),
            Error::DuplicateVersionConflict {
                name: PackageName::new("a"),
                version: Version::parse("1.0").unwrap(),
                recorded: digest.clone(),
                offered: digest.clone(),
            },
            Error::NotFound("a".into()),
            Error::IntegrityMismatch {
                expected: digest.clone(),
                actual: digest,
            },
            Error::UnsupportedPlatform {
                host: "13.0".into(),
                required: "14".into(),
            },
            Error::ExtractionError("bad".into()),
            Error::AlreadyInstalled(PackageName::new("a")),
            Error::NotInstalled(PackageName::new("a")),
            Error::FetchError("down".into()),
            Error::TransportTimeout {
                operation: "fetch",
                secs: 1,
            },
            Error::PartialCleanupFailure { failures: vec![] },
            Error::Io(std::io::Error::other("disk")),
            Error::State("db".into()),
            Error::Config("toml".into()),
        ];

        let codes: HashSet<u8> = errors.iter().map(Error::exit_code).collect();
        assert_eq!(codes.len(), errors.len());
        assert!(!codes.contains(&0));
    }

    #[test]
    fn only_timeouts_are_retriable() {
        assert!(
            Error::TransportTimeout {
                operation: "fetch",
                secs: 5
            }
            .is_retriable()
        );
        assert!(!Error::FetchError("404".into()).is_retriable());
    }
}
