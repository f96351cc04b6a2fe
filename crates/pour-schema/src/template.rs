//! Download URL templates.
//!
//! A manifest stores its download location with the release version left as
//! a `{{version}}` placeholder, so the same template text can be checked once
//! at ingest time and rendered for any version later.

use crate::manifest::ManifestError;
use crate::version::Version;

/// Placeholder substituted with the release version.
pub const VERSION_TOKEN: &str = "{{version}}";

const ALLOWED_SCHEMES: &[&str] = &["https://", "http://", "file://"];

/// Check that `template` is a usable download template.
///
/// # Errors
///
/// Returns [`ManifestError::InvalidTemplate`] unless the template uses an
/// `http`, `https` or `file` scheme and contains [`VERSION_TOKEN`] exactly
/// once.
pub fn validate_template(template: &str) -> Result<(), ManifestError> {
    if !ALLOWED_SCHEMES.iter().any(|s| template.starts_with(s)) {
        return Err(ManifestError::InvalidTemplate(format!(
            "unsupported scheme in '{template}'"
        )));
    }

    match template.matches(VERSION_TOKEN).count() {
        1 => Ok(()),
        0 => Err(ManifestError::InvalidTemplate(format!(
            "missing {VERSION_TOKEN} in '{template}'"
        ))),
        n => Err(ManifestError::InvalidTemplate(format!(
            "{VERSION_TOKEN} appears {n} times in '{template}'"
        ))),
    }
}

/// Substitute `version` into `template`.
pub fn render_url(template: &str, version: &Version) -> String {
    template.replace(VERSION_TOKEN, version.as_str())
}
