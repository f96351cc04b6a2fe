//! pour - manifest driven application installer
#![allow(missing_docs)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::doc_markdown)]
//!
//! Installs macOS application bundles described by versioned manifests.
//!
//! # Architecture
//!
//! - **Gate before mutate**: artifacts are fetched, then verified into a
//!   `VerifiedArtifact`; only that type reaches the installer.
//! - **Actor Pattern**: Database access is serialized through `DbHandle` for thread safety.
//! - **Per-package locking**: install, upgrade and uninstall of one package never overlap.
//!
//! # Directory Layout
//!
//! ```text
//! ~/.pour/
//! ├── registry/     # <name>/<version>.toml manifests
//! ├── tmp/          # extraction staging
//! ├── config.toml   # optional settings
//! └── state.db      # SQLite database
//! ```

pub mod cmd;
pub mod ops;
pub mod store;
pub mod ui;

pub use crate::store::DbHandle;
pub use pour_core::USER_AGENT;

use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Debug, Parser)]
#[command(name = "pour")]
#[command(author, version, about = "pour - install macOS apps from versioned manifests")]
pub struct Cli {
    /// Suppress non-essential output
    #[arg(short, long, global = true)]
    pub quiet: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Validate a manifest file and add it to the registry
    Ingest {
        /// Path to the manifest (TOML)
        manifest: PathBuf,
    },
    /// Install a package
    Install {
        /// Package name
        package: String,
        /// Install this version instead of the latest
        #[arg(long)]
        version: Option<String>,
    },
    /// Upgrade an installed package to the latest version
    Upgrade {
        /// Package name
        package: String,
    },
    /// Remove an installed package
    Uninstall {
        /// Package name
        package: String,
        /// Also delete the package's caches, preferences and saved state
        #[arg(long)]
        full_zap: bool,
    },
    /// Check whether a newer version is available
    CheckUpdate {
        /// Package name
        package: String,
    },
    /// List installed packages
    List,
    /// Show package info
    Info {
        /// Package name
        package: String,
    },
}

/// Process exit code for a failed command.
///
/// Core errors map to their own code; anything else exits with 1.
///
/// ```
/// use pour_cli::exit_code;
///
/// let err = anyhow::Error::from(pour_core::Error::NotFound("xamrock".into()));
/// assert_eq!(exit_code(&err), 11);
/// assert_eq!(exit_code(&anyhow::anyhow!("boom")), 1);
/// ```
pub fn exit_code(err: &anyhow::Error) -> u8 {
    err.chain()
        .find_map(|e| e.downcast_ref::<pour_core::Error>())
        .map_or(1, pour_core::Error::exit_code)
}
