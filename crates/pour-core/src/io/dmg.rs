//! DMG handling via hdiutil

use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};

use crate::error::{Error, Result};

/// A mounted disk image. Dropping it detaches the volume.
#[derive(Debug)]
pub struct MountPoint {
    /// Where the volume is mounted (under `/Volumes`).
    pub path: PathBuf,
}

impl Drop for MountPoint {
    fn drop(&mut self) {
        if let Err(e) = detach(&self.path) {
            tracing::warn!("{e}");
        }
    }
}

/// Attach a DMG read-only without showing it in Finder.
///
/// # Errors
///
/// Returns [`Error::ExtractionError`] if `hdiutil` is unavailable, fails, or
/// reports no mount point.
pub fn attach(dmg_path: &Path) -> Result<MountPoint> {
    let output = Command::new("hdiutil")
        .arg("attach")
        .arg("-nobrowse")
        .arg("-readonly")
        .arg("-noautoopen")
        .arg(dmg_path)
        .output()
        .map_err(|e| Error::ExtractionError(format!("Failed to execute hdiutil: {e}")))?;

    if !output.status.success() {
        return Err(Error::ExtractionError(format!(
            "hdiutil attach failed: {}",
            String::from_utf8_lossy(&output.stderr).trim()
        )));
    }

    let stdout = String::from_utf8_lossy(&output.stdout);
    mount_point_from(&stdout)
        .map(|path| MountPoint { path })
        .ok_or_else(|| Error::ExtractionError("No mount point in hdiutil output".to_string()))
}

/// Detach a volume, retrying while it is busy.
///
/// # Errors
///
/// Returns [`Error::ExtractionError`] if the volume is still attached after
/// three attempts.
pub fn detach(mount_point: &Path) -> Result<()> {
    for _ in 0..3 {
        let status = Command::new("hdiutil")
            .arg("detach")
            .arg(mount_point)
            .arg("-force")
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .status();

        if status.is_ok_and(|s| s.success()) {
            return Ok(());
        }
        std::thread::sleep(std::time::Duration::from_millis(500));
    }

    Err(Error::ExtractionError(format!(
        "Failed to detach {}",
        mount_point.display()
    )))
}

/// `hdiutil attach` prints `/dev/diskXsY <TYPE> <MOUNTPOINT>` lines.
fn mount_point_from(stdout: &str) -> Option<PathBuf> {
    stdout.lines().find_map(|line| {
        line.find("/Volumes/")
            .map(|idx| PathBuf::from(line[idx..].trim()))
    })
}
