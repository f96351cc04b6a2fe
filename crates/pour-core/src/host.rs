//! Host OS detection.

use pour_schema::OsVersion;

use crate::config::Settings;
use crate::error::{Error, Result};

/// Determine the host OS version, honouring the `host_os` override.
///
/// # Errors
///
/// Returns [`Error::Config`] if the override is not a valid version, and
/// [`Error::UnsupportedPlatform`] when the version cannot be detected (any
/// host other than macOS without an override).
pub fn host_os_version(settings: &Settings) -> Result<OsVersion> {
    if let Some(host) = &settings.host_os {
        return OsVersion::parse(host)
            .map_err(|e| Error::Config(format!("host_os override: {e}")));
    }
    detect()
}

#[cfg(target_os = "macos")]
fn detect() -> Result<OsVersion> {
    let output = std::process::Command::new("sw_vers")
        .arg("-productVersion")
        .output()
        .map_err(|e| Error::Io(std::io::Error::other(format!("Failed to execute sw_vers: {e}"))))?;

    if !output.status.success() {
        return Err(unknown_host());
    }

    let stdout = String::from_utf8_lossy(&output.stdout);
    tracing::debug!("sw_vers reported {}", stdout.trim());
    OsVersion::parse(stdout.trim()).map_err(|_| unknown_host())
}

#[cfg(not(target_os = "macos"))]
fn detect() -> Result<OsVersion> {
    Err(unknown_host())
}

fn unknown_host() -> Error {
    Error::UnsupportedPlatform {
        host: "unknown".to_string(),
        required: "macOS (set POUR_HOST_OS to override)".to_string(),
    }
}
