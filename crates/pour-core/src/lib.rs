//! Core of pour: manifest store, artifact verification, the installer state
//! machine and update checks.
//!
//! The pipeline for one package is fetch -> [`verify::verify`] ->
//! [`install::Installer`]. Verification is pure and is the only way to obtain
//! a [`verify::VerifiedArtifact`], which is what the installer accepts.

pub mod config;
pub mod error;
pub mod host;
pub mod install;
pub mod io;
pub mod lock;
/// Filesystem locations under the pour home directory.
pub mod paths;
pub mod registry;
pub mod reporter;
pub mod store;
pub mod update;
pub mod verify;

pub use config::Settings;
pub use error::{Error, Result};
pub use install::{InstallPhase, InstalledState, Installer, StateStore, UninstallReport};
pub use lock::PackageLock;
pub use paths::*;
pub use registry::Registry;
pub use reporter::{NullReporter, Reporter};
pub use store::{IngestOutcome, ManifestRecord, ManifestStore};
pub use update::{UpdateStatus, check_for_update};
pub use verify::{VerifiedArtifact, verify};

/// User Agent string for core operations
pub const USER_AGENT: &str = concat!("pour/", env!("CARGO_PKG_VERSION"));
