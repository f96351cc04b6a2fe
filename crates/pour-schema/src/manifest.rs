//! Versioned package manifests and their TOML form.
//!
//! ```toml
//! name = "xamrock"
//! version = "0.1.14"
//! checksum = "3f1c...64 hex chars..."
//! url_template = "https://github.com/xamrock/xamrock-desktop/releases/download/{{version}}/Xamrock.zip"
//! os_constraint = ">= :sonoma"
//! artifact_kind = "archive"
//! install_target = "Xamrock.app"
//! cleanup_paths = ["~/Library/Caches/com.kiloloco.xamrock-client"]
//! ```

use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::hash::Sha256Digest;
use crate::platform::OsConstraint;
use crate::template::{render_url, validate_template};
use crate::types::{ArtifactKind, Livecheck, PackageName};
use crate::version::Version;

/// Errors raised while parsing or validating a manifest.
#[derive(Error, Debug)]
pub enum ManifestError {
    /// The manifest file could not be read.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// The TOML content could not be deserialized into a manifest.
    #[error("Parse error: {0}")]
    Parse(#[from] toml::de::Error),

    /// The manifest could not be rendered as TOML.
    #[error("Serialize error: {0}")]
    Serialize(#[from] toml::ser::Error),

    /// A version string is not dotted-numeric.
    #[error("Invalid version: '{0}'")]
    InvalidVersion(String),

    /// A checksum is not a 64 character hex SHA256 digest.
    #[error("Invalid checksum: {0}")]
    InvalidChecksum(String),

    /// An OS constraint names an unknown release or a malformed version.
    #[error("Invalid OS constraint: '{0}'")]
    InvalidOsConstraint(String),

    /// The download URL template is unusable.
    #[error("Invalid URL template: {0}")]
    InvalidTemplate(String),

    /// A required field is empty.
    #[error("Empty field: {0}")]
    EmptyField(&'static str),

    /// A field is present but has an unacceptable value.
    #[error("Invalid {field}: {reason}")]
    InvalidField {
        /// Name of the offending field.
        field: &'static str,
        /// Why the value was rejected.
        reason: String,
    },
}

/// One installable release of a package.
///
/// Manifests are immutable once ingested; a new release is a new manifest.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Manifest {
    /// Package name (normalized to lowercase).
    pub name: PackageName,
    /// Release version.
    pub version: Version,
    /// SHA256 digest of the release artifact.
    pub checksum: Sha256Digest,
    /// Download URL with the version left as `{{version}}`.
    pub url_template: String,
    /// Minimum host OS version.
    pub os_constraint: OsConstraint,
    /// How the artifact is packaged.
    pub artifact_kind: ArtifactKind,
    /// Name of the application bundle placed on install (e.g. `Xamrock.app`).
    pub install_target: String,
    /// Paths removed on a full uninstall, in order. `~` is the user's home.
    #[serde(default)]
    pub cleanup_paths: Vec<String>,
    /// Short human-readable summary.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Project homepage.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub homepage: Option<String>,
    /// Where update checks look for the latest release.
    #[serde(default)]
    pub livecheck: Livecheck,
}

impl Manifest {
    /// Read, parse and validate a manifest file.
    ///
    /// # Errors
    ///
    /// Returns [`ManifestError::Io`] if the file cannot be read, and any
    /// error from [`Manifest::parse`].
    pub fn from_file(path: &Path) -> Result<Self, ManifestError> {
        let content = fs::read_to_string(path)?;
        Self::parse(&content)
    }

    /// Parse and validate a manifest from TOML.
    ///
    /// # Errors
    ///
    /// Returns [`ManifestError::Parse`] for malformed TOML or invalid field
    /// values, and the errors of [`Manifest::validate`].
    pub fn parse(content: &str) -> Result<Self, ManifestError> {
        let manifest: Self = toml::from_str(content)?;
        manifest.validate()?;
        Ok(manifest)
    }

    /// Serialize this manifest to TOML.
    ///
    /// # Errors
    ///
    /// Returns [`ManifestError::Serialize`] if serialization fails.
    pub fn to_toml(&self) -> Result<String, ManifestError> {
        Ok(toml::to_string_pretty(self)?)
    }

    /// Check the invariants serde alone cannot express.
    ///
    /// # Errors
    ///
    /// Returns [`ManifestError::EmptyField`] for an empty name or install
    /// target, [`ManifestError::InvalidTemplate`] for a bad URL template and
    /// [`ManifestError::InvalidField`] for a non-bundle install target or a
    /// relative cleanup path.
    pub fn validate(&self) -> Result<(), ManifestError> {
        if self.name.is_empty() {
            return Err(ManifestError::EmptyField("name"));
        }
        if !self.name.is_path_safe() {
            return Err(ManifestError::InvalidField {
                field: "name",
                reason: format!(
                    "'{}' may only contain a-z, 0-9, '.', '_' and '-' and must start with a letter or digit",
                    self.name
                ),
            });
        }
        if self.install_target.trim().is_empty() {
            return Err(ManifestError::EmptyField("install_target"));
        }
        if !self.install_target.ends_with(".app") || self.install_target.contains('/') {
            return Err(ManifestError::InvalidField {
                field: "install_target",
                reason: format!("'{}' is not an .app bundle name", self.install_target),
            });
        }

        validate_template(&self.url_template)?;

        for path in &self.cleanup_paths {
            if path.trim().is_empty() {
                return Err(ManifestError::EmptyField("cleanup_paths"));
            }
            if !(path.starts_with('/') || path == "~" || path.starts_with("~/")) {
                return Err(ManifestError::InvalidField {
                    field: "cleanup_paths",
                    reason: format!("'{path}' must be absolute or start with ~/"),
                });
            }
        }

        Ok(())
    }

    /// Download URL for this release.
    pub fn download_url(&self) -> String {
        render_url(&self.url_template, &self.version)
    }

    /// `(owner, repo)` when the URL template points at `github.com`.
    pub fn github_repo(&self) -> Option<(&str, &str)> {
        let rest = self
            .url_template
            .strip_prefix("https://github.com/")
            .or_else(|| self.url_template.strip_prefix("http://github.com/"))?;
        let mut parts = rest.split('/');
        let owner = parts.next().filter(|s| !s.is_empty())?;
        let repo = parts.next().filter(|s| !s.is_empty())?;
        Some((owner, repo))
    }
}

impl std::str::FromStr for Manifest {
    type Err = ManifestError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}
