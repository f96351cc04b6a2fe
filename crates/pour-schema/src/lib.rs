//! Manifest model and persisted format shared by every pour crate.
//!
//! A manifest is the immutable record of one installable release of a
//! macOS application: where to download it, what its bytes must hash to,
//! which host OS it needs and what to delete on a full cleanup.

pub mod hash;
pub mod manifest;
pub mod platform;
pub mod template;
pub mod types;
pub mod version;

// Re-exports
pub use hash::Sha256Digest;
pub use manifest::{Manifest, ManifestError};
pub use platform::{OsConstraint, OsVersion};
pub use template::{VERSION_TOKEN, render_url, validate_template};
pub use types::{ArtifactKind, Livecheck, PackageName};
pub use version::Version;
