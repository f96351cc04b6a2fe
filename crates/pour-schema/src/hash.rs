//! SHA256 release checksums.

use serde::{Deserialize, Deserializer, Serialize};
use sha2::{Digest, Sha256};

use crate::manifest::ManifestError;

/// A validated SHA256 digest (64 lowercase hex characters).
///
/// Digests are validated when parsed or deserialized, so an invalid hex
/// string never reaches the store or the verifier.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(transparent)]
pub struct Sha256Digest(String);

impl Sha256Digest {
    /// Parse a digest, accepting strings with or without a `sha256:` prefix.
    ///
    /// # Errors
    ///
    /// Returns [`ManifestError::InvalidChecksum`] if the hex portion is not
    /// exactly 64 ASCII hex characters.
    pub fn parse(s: &str) -> Result<Self, ManifestError> {
        let hex = s.strip_prefix("sha256:").unwrap_or(s);

        if hex.len() != 64 {
            return Err(ManifestError::InvalidChecksum(format!(
                "expected 64 hex characters, got {} in '{s}'",
                hex.len()
            )));
        }

        if !hex.chars().all(|c| c.is_ascii_hexdigit()) {
            return Err(ManifestError::InvalidChecksum(format!(
                "contains non-hex characters in '{s}'"
            )));
        }

        Ok(Self(hex.to_lowercase()))
    }

    /// Compute the SHA256 digest of `data`.
    pub fn compute(data: &[u8]) -> Self {
        Self(hex::encode(Sha256::digest(data)))
    }

    /// Get the digest as a string slice
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl<'de> Deserialize<'de> for Sha256Digest {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        Self::parse(&s).map_err(serde::de::Error::custom)
    }
}

impl std::str::FromStr for Sha256Digest {
    type Err = ManifestError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl std::fmt::Display for Sha256Digest {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl AsRef<str> for Sha256Digest {
    fn as_ref(&self) -> &str {
        &self.0
    }
}
