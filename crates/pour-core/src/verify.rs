//! Gate-before-mutate verification of downloaded artifacts.
//!
//! [`VerifiedArtifact`] can only be built by [`verify`], so the installer
//! never sees bytes whose checksum and platform were not checked.

use std::fmt;
use std::sync::Arc;

use bytes::Bytes;
use pour_schema::{Manifest, OsVersion, Sha256Digest};

use crate::error::{Error, Result};

/// Artifact bytes that match their manifest and suit the host.
#[derive(Clone)]
pub struct VerifiedArtifact {
    manifest: Arc<Manifest>,
    bytes: Bytes,
    digest: Sha256Digest,
}

impl fmt::Debug for VerifiedArtifact {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("VerifiedArtifact")
            .field("name", &self.manifest.name)
            .field("version", &self.manifest.version)
            .field("digest", &self.digest)
            .field("len", &self.bytes.len())
            .finish()
    }
}

impl VerifiedArtifact {
    /// The manifest the bytes were checked against.
    pub fn manifest(&self) -> &Arc<Manifest> {
        &self.manifest
    }

    /// The verified bytes.
    pub fn bytes(&self) -> &Bytes {
        &self.bytes
    }

    /// Digest computed from the bytes (always equal to the manifest checksum).
    pub fn digest(&self) -> &Sha256Digest {
        &self.digest
    }
}

/// Check `bytes` against `manifest` for `host`.
///
/// Integrity is checked first, then the OS constraint. Nothing is mutated.
///
/// # Errors
///
/// Returns [`Error::IntegrityMismatch`] if the SHA256 of `bytes` differs from
/// the manifest checksum, and [`Error::UnsupportedPlatform`] if `host` is
/// older than the manifest's minimum OS.
pub fn verify(bytes: Bytes, manifest: Arc<Manifest>, host: &OsVersion) -> Result<VerifiedArtifact> {
    let digest = Sha256Digest::compute(&bytes);
    if digest != manifest.checksum {
        tracing::warn!(
            "Checksum mismatch for {} {}: expected {}, got {}",
            manifest.name,
            manifest.version,
            manifest.checksum,
            digest
        );
        return Err(Error::IntegrityMismatch {
            expected: manifest.checksum.clone(),
            actual: digest,
        });
    }

    if !manifest.os_constraint.is_satisfied_by(host) {
        return Err(Error::unsupported(Some(host), &manifest.os_constraint));
    }

    Ok(VerifiedArtifact {
        manifest,
        bytes,
        digest,
    })
}
