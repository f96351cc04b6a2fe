//! Installed-state record and the store the installer persists it through.

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::{Mutex, PoisonError};

use async_trait::async_trait;
use pour_schema::{Manifest, PackageName, Sha256Digest, Version};

use crate::error::Result;

/// What is currently installed for one package on this host.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InstalledState {
    /// Package name.
    pub name: PackageName,
    /// Installed version.
    pub version: Version,
    /// Checksum of the artifact the bundle came from.
    pub checksum: Sha256Digest,
    /// Where the application bundle lives.
    pub install_path: PathBuf,
    /// Unix timestamp of the install or last upgrade.
    pub installed_at: i64,
}

impl InstalledState {
    /// State for `manifest` placed at `install_path`, stamped now.
    pub fn new(manifest: &Manifest, install_path: PathBuf) -> Self {
        Self {
            name: manifest.name.clone(),
            version: manifest.version.clone(),
            checksum: manifest.checksum.clone(),
            install_path,
            installed_at: chrono::Utc::now().timestamp(),
        }
    }
}

/// Persistence for [`InstalledState`], supplied by the caller.
#[async_trait]
pub trait StateStore: Send + Sync + 'static {
    /// Current state of `name`, if installed.
    ///
    /// # Errors
    ///
    /// Returns [`crate::Error::State`] if the backing store fails.
    async fn get(&self, name: &PackageName) -> Result<Option<InstalledState>>;

    /// Record (or replace) the state of one package.
    ///
    /// # Errors
    ///
    /// Returns [`crate::Error::State`] if the backing store fails.
    async fn put(&self, state: InstalledState) -> Result<()>;

    /// Forget `name`.
    ///
    /// # Errors
    ///
    /// Returns [`crate::Error::State`] if the backing store fails.
    async fn remove(&self, name: &PackageName) -> Result<()>;

    /// Every installed package, sorted by name.
    ///
    /// # Errors
    ///
    /// Returns [`crate::Error::State`] if the backing store fails.
    async fn list(&self) -> Result<Vec<InstalledState>>;
}

/// Process-local state store.
#[derive(Debug, Default)]
pub struct MemoryStateStore {
    states: Mutex<HashMap<PackageName, InstalledState>>,
}

impl MemoryStateStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl StateStore for MemoryStateStore {
    async fn get(&self, name: &PackageName) -> Result<Option<InstalledState>> {
        let states = self.states.lock().unwrap_or_else(PoisonError::into_inner);
        Ok(states.get(name).cloned())
    }

    async fn put(&self, state: InstalledState) -> Result<()> {
        let mut states = self.states.lock().unwrap_or_else(PoisonError::into_inner);
        states.insert(state.name.clone(), state);
        Ok(())
    }

    async fn remove(&self, name: &PackageName) -> Result<()> {
        let mut states = self.states.lock().unwrap_or_else(PoisonError::into_inner);
        states.remove(name);
        Ok(())
    }

    async fn list(&self) -> Result<Vec<InstalledState>> {
        let states = self.states.lock().unwrap_or_else(PoisonError::into_inner);
        let mut all: Vec<InstalledState> = states.values().cloned().collect();
        all.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(all)
    }
}
