//! Filesystem accessor used by the installer.
//!
//! The installer never touches the filesystem directly; it goes through a
//! [`FilesystemAccessor`] so tests can inject failures.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use pour_schema::ArtifactKind;
use walkdir::WalkDir;

use crate::error::{Error, Result};
use crate::io::{dmg, extract};

/// Filesystem operations the installer relies on.
///
/// All methods are blocking; the installer calls them from the blocking pool.
pub trait FilesystemAccessor: Send + Sync + 'static {
    /// Unpack `bytes` into a fresh staging directory and return it.
    ///
    /// # Errors
    ///
    /// Returns [`Error::ExtractionError`] if the artifact is malformed.
    fn extract(&self, bytes: &[u8], kind: ArtifactKind) -> Result<PathBuf>;

    /// Copy a file or directory tree to `dest`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Io`] on any copy failure.
    fn copy(&self, src: &Path, dest: &Path) -> Result<()>;

    /// Move `from` to `to` on the same volume.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Io`] if the rename fails.
    fn rename(&self, from: &Path, to: &Path) -> Result<()>;

    /// Remove a file or directory tree. A missing path is already removed.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Io`] if the path exists and cannot be removed.
    fn remove(&self, path: &Path) -> Result<()>;

    /// Whether anything (including a dangling symlink) exists at `path`.
    fn exists(&self, path: &Path) -> bool {
        fs::symlink_metadata(path).is_ok()
    }

    /// Find the bundle named `target` inside an extracted tree.
    ///
    /// The shallowest match wins, so nested helper apps are never picked.
    ///
    /// # Errors
    ///
    /// Returns [`Error::ExtractionError`] if no entry is named `target`.
    fn locate(&self, root: &Path, target: &str) -> Result<PathBuf> {
        WalkDir::new(root)
            .min_depth(1)
            .max_depth(4)
            .sort_by_file_name()
            .into_iter()
            .filter_map(std::result::Result::ok)
            .filter(|e| e.file_name() == target)
            .min_by_key(walkdir::DirEntry::depth)
            .map(walkdir::DirEntry::into_path)
            .ok_or_else(|| {
                Error::ExtractionError(format!("{target} not found in unpacked artifact"))
            })
    }
}

/// The real filesystem, staging extractions under one directory.
#[derive(Debug, Clone)]
pub struct LocalFilesystem {
    staging: PathBuf,
}

impl LocalFilesystem {
    /// Stage extractions under `staging` (created on demand).
    pub fn new(staging: impl Into<PathBuf>) -> Self {
        Self {
            staging: staging.into(),
        }
    }

    fn unpack(&self, bytes: &[u8], kind: ArtifactKind, dir: &Path) -> Result<()> {
        match kind {
            ArtifactKind::Archive => extract::extract_zip(bytes, dir)
                .map(|_| ())
                .map_err(|e| Error::ExtractionError(e.to_string())),
            ArtifactKind::DiskImage => {
                let image = dir.join("artifact.dmg");
                fs::write(&image, bytes)?;
                let contents = dir.join("contents");
                {
                    let mount = dmg::attach(&image)?;
                    copy_volume(&mount.path, &contents)?;
                }
                fs::remove_file(&image)?;
                Ok(())
            }
        }
    }
}

impl FilesystemAccessor for LocalFilesystem {
    fn extract(&self, bytes: &[u8], kind: ArtifactKind) -> Result<PathBuf> {
        fs::create_dir_all(&self.staging)?;
        let dir = tempfile::Builder::new()
            .prefix("extract-")
            .tempdir_in(&self.staging)?
            .keep();

        tracing::debug!("Unpacking {} into {}", kind, dir.display());
        if let Err(e) = self.unpack(bytes, kind, &dir) {
            let _ = fs::remove_dir_all(&dir);
            return Err(e);
        }
        Ok(dir)
    }

    fn copy(&self, src: &Path, dest: &Path) -> Result<()> {
        copy_tree(src, dest).map_err(Error::from)
    }

    fn rename(&self, from: &Path, to: &Path) -> Result<()> {
        if let Some(parent) = to.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::rename(from, to).map_err(Error::from)
    }

    fn remove(&self, path: &Path) -> Result<()> {
        match fs::symlink_metadata(path) {
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
            Ok(meta) if meta.is_dir() => fs::remove_dir_all(path).map_err(Error::from),
            Ok(_) => fs::remove_file(path).map_err(Error::from),
        }
    }
}

/// Copy everything on a mounted volume except the `/Applications` shortcut
/// most installer images carry.
fn copy_volume(volume: &Path, dest: &Path) -> Result<()> {
    fs::create_dir_all(dest)?;
    for entry in fs::read_dir(volume)? {
        let entry = entry?;
        if entry.file_type()?.is_symlink() {
            continue;
        }
        copy_tree(&entry.path(), &dest.join(entry.file_name()))?;
    }
    Ok(())
}

/// Recursive copy preserving symlinks (bundles rely on relative framework links).
fn copy_tree(src: &Path, dest: &Path) -> io::Result<()> {
    if let Some(parent) = dest.parent() {
        fs::create_dir_all(parent)?;
    }

    for entry in WalkDir::new(src) {
        let entry = entry.map_err(io::Error::other)?;
        let relative = entry
            .path()
            .strip_prefix(src)
            .map_err(io::Error::other)?;
        let target = if relative.as_os_str().is_empty() {
            dest.to_path_buf()
        } else {
            dest.join(relative)
        };

        let file_type = entry.file_type();
        if file_type.is_dir() {
            fs::create_dir_all(&target)?;
        } else if file_type.is_symlink() {
            let link = fs::read_link(entry.path())?;
            extract::create_symlink(&link, &target)?;
        } else {
            fs::copy(entry.path(), &target)?;
        }
    }
    Ok(())
}
