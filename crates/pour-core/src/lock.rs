//! Cross-process package locks.
//!
//! The per-package mutexes of [`crate::Installer`] and the per-name locks of
//! [`crate::ManifestStore`] only serialize work inside one process. A
//! [`PackageLock`] is an exclusive `flock` on a file, so two `pour`
//! processes touching the same package take turns.

use std::fs::{self, File, OpenOptions};
use std::path::{Path, PathBuf};

use fs2::FileExt;
use pour_schema::PackageName;

use crate::error::{Error, Result};

/// Exclusive lock on one lock file, released on drop.
#[derive(Debug)]
pub struct PackageLock {
    file: File,
    path: PathBuf,
}

impl PackageLock {
    /// Block until the lock at `path` is held, creating the file if needed.
    ///
    /// # Errors
    ///
    /// Returns an IO error if the lock file cannot be opened or locked.
    pub fn acquire(path: &Path) -> Result<Self> {
        let file = open(path)?;
        file.lock_exclusive()?;
        tracing::debug!("Acquired lock {}", path.display());
        Ok(Self {
            file,
            path: path.to_path_buf(),
        })
    }

    /// Take the lock at `path` only if nobody holds it.
    ///
    /// # Errors
    ///
    /// Returns an IO error if the lock file cannot be opened, or locking
    /// fails for a reason other than contention.
    pub fn try_acquire(path: &Path) -> Result<Option<Self>> {
        let file = open(path)?;
        match file.try_lock_exclusive() {
            Ok(()) => Ok(Some(Self {
                file,
                path: path.to_path_buf(),
            })),
            Err(e) if e.kind() == fs2::lock_contended_error().kind() => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    /// Lock `<dir>/<name>.lock` for the install lifecycle of `name`.
    ///
    /// Runs on the blocking pool so a long wait does not stall the runtime.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NotFound`] for a name that cannot be a package, and
    /// the errors of [`PackageLock::acquire`].
    pub async fn for_package(dir: &Path, name: &PackageName) -> Result<Self> {
        if !name.is_path_safe() {
            return Err(Error::NotFound(name.to_string()));
        }
        let path = dir.join(format!("{name}.lock"));
        tokio::task::spawn_blocking(move || Self::acquire(&path))
            .await
            .map_err(|e| Error::Io(std::io::Error::other(e)))?
    }

    /// The lock file.
    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Drop for PackageLock {
    fn drop(&mut self) {
        if let Err(e) = FileExt::unlock(&self.file) {
            tracing::debug!("Failed to release lock {}: {e}", self.path.display());
        }
    }
}

fn open(path: &Path) -> std::io::Result<File> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    OpenOptions::new()
        .read(true)
        .write(true)
        .create(true)
        .truncate(false)
        .open(path)
}
