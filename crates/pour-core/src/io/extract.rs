//! Zip extraction for `archive` artifacts.
//!
//! macOS release zips carry unix modes and symlinks (framework `Versions/Current`
//! links inside app bundles), both of which are restored.

use std::fs::{self, File};
use std::io::{self, Cursor, Read};
use std::path::{Path, PathBuf};

use thiserror::Error;
use zip::ZipArchive;

/// `S_IFMT` / `S_IFLNK` bits of a unix mode.
const FILE_TYPE_MASK: u32 = 0o170_000;
const SYMLINK_TYPE: u32 = 0o120_000;

/// Errors from unpacking an archive.
#[derive(Error, Debug)]
pub enum ExtractError {
    /// Writing the unpacked files failed.
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    /// The archive itself is malformed or unsafe.
    #[error("Archive error: {0}")]
    Archive(String),
}

/// Unpack zip `bytes` into `dest_dir`, returning every file path written.
///
/// # Errors
///
/// Returns [`ExtractError::Archive`] for corrupt archives and entries whose
/// path escapes `dest_dir`, and [`ExtractError::Io`] for write failures.
pub fn extract_zip(bytes: &[u8], dest_dir: &Path) -> Result<Vec<PathBuf>, ExtractError> {
    let mut archive =
        ZipArchive::new(Cursor::new(bytes)).map_err(|e| ExtractError::Archive(e.to_string()))?;

    fs::create_dir_all(dest_dir)?;
    let mut written = Vec::new();

    for i in 0..archive.len() {
        let mut entry = archive
            .by_index(i)
            .map_err(|e| ExtractError::Archive(e.to_string()))?;

        let Some(relative_path) = entry.enclosed_name() else {
            return Err(ExtractError::Archive(format!(
                "Invalid path in archive: {}",
                entry.name()
            )));
        };

        // Finder metadata, never part of the bundle
        if relative_path.starts_with("__MACOSX") {
            continue;
        }

        let absolute_path = dest_dir.join(&relative_path);

        if entry.is_dir() {
            fs::create_dir_all(&absolute_path)?;
            continue;
        }

        if let Some(parent) = absolute_path.parent() {
            fs::create_dir_all(parent)?;
        }

        let mode = entry.unix_mode();
        if mode.is_some_and(|m| m & FILE_TYPE_MASK == SYMLINK_TYPE) {
            let mut target = String::new();
            entry.read_to_string(&mut target)?;
            create_symlink(Path::new(&target), &absolute_path)?;
        } else {
            let mut outfile = File::create(&absolute_path)?;
            io::copy(&mut entry, &mut outfile)?;
            #[cfg(unix)]
            if let Some(mode) = mode {
                use std::os::unix::fs::PermissionsExt;
                fs::set_permissions(&absolute_path, fs::Permissions::from_mode(mode & 0o7777))?;
            }
        }

        written.push(absolute_path);
    }

    Ok(written)
}

#[cfg(unix)]
pub(crate) fn create_symlink(target: &Path, link: &Path) -> io::Result<()> {
    std::os::unix::fs::symlink(target, link)
}

#[cfg(not(unix))]
pub(crate) fn create_symlink(target: &Path, link: &Path) -> io::Result<()> {
    Err(io::Error::other(format!(
        "cannot create symlink {} -> {} on this platform",
        link.display(),
        target.display()
    )))
}
