//! Host OS versions and the minimum-OS constraint a manifest declares.
//!
//! Constraints are written the way release notes talk about macOS: either a
//! plain version (`14.0`) or a release codename (`sonoma`, `:sonoma`),
//! optionally prefixed with `>=`.
//!
//! ```
//! use pour_schema::{OsConstraint, OsVersion};
//!
//! let constraint: OsConstraint = ">= :sonoma".parse().unwrap();
//! assert!(constraint.is_satisfied_by(&"14.5".parse::<OsVersion>().unwrap()));
//! assert!(!constraint.is_satisfied_by(&"13.6".parse::<OsVersion>().unwrap()));
//! ```

use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::manifest::ManifestError;
use crate::version::Version;

/// macOS release codenames and the version each one shipped as.
const CODENAMES: &[(&str, &str)] = &[
    ("high_sierra", "10.13"),
    ("mojave", "10.14"),
    ("catalina", "10.15"),
    ("big_sur", "11"),
    ("monterey", "12"),
    ("ventura", "13"),
    ("sonoma", "14"),
    ("sequoia", "15"),
    ("tahoe", "26"),
];

/// A host operating system version, ordered like [`Version`].
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct OsVersion(Version);

impl OsVersion {
    /// Parse a dotted-numeric OS version such as `14.5` or `10.15.7`.
    ///
    /// # Errors
    ///
    /// Returns [`ManifestError::InvalidOsConstraint`] if the text is not a
    /// dotted-numeric version.
    pub fn parse(s: &str) -> Result<Self, ManifestError> {
        Version::parse(s)
            .map(Self)
            .map_err(|_| ManifestError::InvalidOsConstraint(s.to_string()))
    }

    /// Look up the version a macOS codename corresponds to.
    pub fn from_codename(name: &str) -> Option<Self> {
        let name = name.trim().trim_start_matches(':').to_lowercase();
        CODENAMES
            .iter()
            .find(|(codename, _)| *codename == name)
            .and_then(|(_, v)| Version::parse(v).ok())
            .map(Self)
    }

    /// Return the version as written.
    pub fn as_str(&self) -> &str {
        self.0.as_str()
    }
}

impl std::str::FromStr for OsVersion {
    type Err = ManifestError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl std::fmt::Display for OsVersion {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Minimum host OS version required by a release.
///
/// The original text is kept so a manifest serializes back exactly as it
/// was written.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OsConstraint {
    raw: String,
    minimum: OsVersion,
}

impl OsConstraint {
    /// Parse a constraint like `14.0`, `sonoma`, `:sonoma` or `>= :sonoma`.
    ///
    /// # Errors
    ///
    /// Returns [`ManifestError::InvalidOsConstraint`] for unknown codenames
    /// and malformed versions.
    pub fn parse(s: &str) -> Result<Self, ManifestError> {
        let raw = s.trim();
        let operand = raw.strip_prefix(">=").unwrap_or(raw).trim();

        let minimum = if operand.starts_with(|c: char| c.is_ascii_digit()) {
            OsVersion::parse(operand)?
        } else {
            OsVersion::from_codename(operand)
                .ok_or_else(|| ManifestError::InvalidOsConstraint(s.to_string()))?
        };

        Ok(Self {
            raw: raw.to_string(),
            minimum,
        })
    }

    /// The oldest host version that satisfies this constraint.
    pub fn minimum(&self) -> &OsVersion {
        &self.minimum
    }

    /// Whether `host` is at least the minimum version.
    pub fn is_satisfied_by(&self, host: &OsVersion) -> bool {
        host >= &self.minimum
    }

    /// Return the constraint as written.
    pub fn as_str(&self) -> &str {
        &self.raw
    }
}

impl std::str::FromStr for OsConstraint {
    type Err = ManifestError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl std::fmt::Display for OsConstraint {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.raw)
    }
}

impl Serialize for OsConstraint {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.raw)
    }
}

impl<'de> Deserialize<'de> for OsConstraint {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        Self::parse(&s).map_err(serde::de::Error::custom)
    }
}
