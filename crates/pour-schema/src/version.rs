//! Dotted-numeric release versions.
//!
//! Versions compare segment by segment, left to right, numerically. The
//! shorter version is padded with zeros, so `1.2` and `1.2.0` are the same
//! release. Equality and hashing agree with that ordering.

use std::cmp::Ordering;
use std::hash::{Hash, Hasher};

use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::manifest::ManifestError;

/// A release version such as `0.1.14`.
#[derive(Debug, Clone)]
pub struct Version {
    raw: String,
    segments: Vec<u64>,
}

impl Version {
    /// Parse a dotted-numeric version string.
    ///
    /// # Errors
    ///
    /// Returns [`ManifestError::InvalidVersion`] if the string is empty or any
    /// segment is not an unsigned integer.
    pub fn parse(s: &str) -> Result<Self, ManifestError> {
        let raw = s.trim();
        if raw.is_empty() {
            return Err(ManifestError::InvalidVersion(s.to_string()));
        }

        let segments = raw
            .split('.')
            .map(str::parse::<u64>)
            .collect::<Result<Vec<_>, _>>()
            .map_err(|_| ManifestError::InvalidVersion(s.to_string()))?;

        Ok(Self {
            raw: raw.to_string(),
            segments,
        })
    }

    /// Return the version exactly as it was written.
    pub fn as_str(&self) -> &str {
        &self.raw
    }

    /// Numeric segments, in order.
    pub fn segments(&self) -> &[u64] {
        &self.segments
    }

    /// Segments with trailing zeros dropped; equal versions share this form.
    fn significant(&self) -> &[u64] {
        let len = self
            .segments
            .iter()
            .rposition(|&s| s != 0)
            .map_or(0, |i| i + 1);
        &self.segments[..len]
    }
}

impl Ord for Version {
    fn cmp(&self, other: &Self) -> Ordering {
        let len = self.segments.len().max(other.segments.len());
        for i in 0..len {
            let a = self.segments.get(i).copied().unwrap_or(0);
            let b = other.segments.get(i).copied().unwrap_or(0);
            match a.cmp(&b) {
                Ordering::Equal => {}
                unequal => return unequal,
            }
        }
        Ordering::Equal
    }
}

impl PartialOrd for Version {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl PartialEq for Version {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for Version {}

impl Hash for Version {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.significant().hash(state);
    }
}

impl std::str::FromStr for Version {
    type Err = ManifestError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl std::fmt::Display for Version {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.raw)
    }
}

impl AsRef<str> for Version {
    fn as_ref(&self) -> &str {
        &self.raw
    }
}

impl Serialize for Version {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.raw)
    }
}

impl<'de> Deserialize<'de> for Version {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        Self::parse(&s).map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    fn v(s: &str) -> Version {
        Version::parse(s).unwrap()
    }

    #[test]
    fn compares_numerically_not_lexically() {
        assert!(v("0.1.14") > v("0.1.13"));
        assert!(v("0.1.10") > v("0.1.9"));
        assert!(v("2.0") > v("1.99.99"));
    }

    #[test]
    fn pads_shorter_version_with_zeros() {
        assert_eq!(v("1.2"), v("1.2.0"));
        assert!(v("1.2.0.1") > v("1.2"));
        assert!(v("1.2") < v("1.2.0.1"));
    }

    #[test]
    fn equal_versions_hash_alike() {
        let set: HashSet<Version> = [v("1.2"), v("1.2.0"), v("1.2.0.0")].into_iter().collect();
        assert_eq!(set.len(), 1);
    }

    #[test]
    fn keeps_raw_text_for_display() {
        assert_eq!(v("0.1.13").to_string(), "0.1.13");
        assert_eq!(v(" 1.0 ").as_str(), "1.0");
    }

    #[test]
    fn rejects_non_numeric_segments() {
        assert!(Version::parse("").is_err());
        assert!(Version::parse("1.0-beta").is_err());
        assert!(Version::parse("1..2").is_err());
        assert!(Version::parse("v1.2").is_err());
    }

    #[test]
    fn max_is_well_defined() {
        let versions = [v("0.1.13"), v("0.1.15"), v("0.1.14")];
        assert_eq!(versions.iter().max(), Some(&v("0.1.15")));
    }
}
