//! User settings.
//!
//! Settings come from `~/.pour/config.toml` when it exists, then from
//! `POUR_*` environment variables, which win. Every field has a default, so
//! an empty or missing file is valid.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Runtime settings for fetch, extraction and install placement.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// Where application bundles are placed. Defaults to `~/Applications`.
    pub applications_dir: Option<PathBuf>,
    /// Time budget for downloading one artifact.
    pub fetch_timeout_secs: u64,
    /// Time budget for unpacking one artifact.
    pub extract_timeout_secs: u64,
    /// Host OS version to assume instead of asking the system.
    pub host_os: Option<String>,
    /// Base URL of the GitHub REST API.
    pub github_api: String,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            applications_dir: None,
            fetch_timeout_secs: 300,
            extract_timeout_secs: 600,
            host_os: None,
            github_api: "https://api.github.com".to_string(),
        }
    }
}

impl Settings {
    /// Load settings from `path` (if present) and the process environment.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] if the file exists but is not valid TOML or
    /// an environment override does not parse.
    pub fn load(path: &Path) -> Result<Self> {
        let settings = if path.exists() {
            let content = std::fs::read_to_string(path)?;
            Self::parse(&content)?
        } else {
            Self::default()
        };
        settings.with_overrides(|key| std::env::var(key).ok())
    }

    /// Parse settings from TOML text.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] for malformed TOML.
    pub fn parse(content: &str) -> Result<Self> {
        toml::from_str(content).map_err(|e| Error::Config(e.to_string()))
    }

    /// Apply `POUR_*` overrides looked up through `lookup`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] if a timeout override is not a number.
    pub fn with_overrides<F>(mut self, lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(dir) = lookup("POUR_APPLICATIONS_DIR") {
            self.applications_dir = Some(PathBuf::from(dir));
        }
        if let Some(host) = lookup("POUR_HOST_OS") {
            self.host_os = Some(host);
        }
        if let Some(api) = lookup("POUR_GITHUB_API") {
            self.github_api = api;
        }
        if let Some(secs) = lookup("POUR_FETCH_TIMEOUT") {
            self.fetch_timeout_secs = parse_secs("POUR_FETCH_TIMEOUT", &secs)?;
        }
        if let Some(secs) = lookup("POUR_EXTRACT_TIMEOUT") {
            self.extract_timeout_secs = parse_secs("POUR_EXTRACT_TIMEOUT", &secs)?;
        }
        Ok(self)
    }

    /// Resolved applications directory.
    pub fn applications_dir(&self) -> PathBuf {
        self.applications_dir.clone().unwrap_or_else(|| {
            dirs::home_dir().map_or_else(|| PathBuf::from("/Applications"), |h| h.join("Applications"))
        })
    }

    /// Fetch time budget.
    pub fn fetch_timeout(&self) -> Duration {
        Duration::from_secs(self.fetch_timeout_secs)
    }

    /// Extraction time budget.
    pub fn extract_timeout(&self) -> Duration {
        Duration::from_secs(self.extract_timeout_secs)
    }
}

fn parse_secs(key: &str, value: &str) -> Result<u64> {
    value
        .trim()
        .parse()
        .map_err(|_| Error::Config(format!("{key} must be a number of seconds, got '{value}'")))
}
