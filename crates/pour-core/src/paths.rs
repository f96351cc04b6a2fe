use dirs::home_dir;
use std::path::{Path, PathBuf};

/// Returns the primary data directory, or None if the user's home cannot be resolved.
pub fn try_pour_home() -> Option<PathBuf> {
    if let Ok(val) = std::env::var("POUR_HOME") {
        return Some(PathBuf::from(val));
    }
    home_dir().map(|h| h.join(".pour"))
}

/// Returns the pour home directory (`~/.pour`), falling back to `./.pour`
/// when no home directory can be determined.
pub fn pour_home() -> PathBuf {
    try_pour_home().unwrap_or_else(|| PathBuf::from(".pour"))
}

/// `SQLite` state database: ~/.pour/state.db
pub fn db_path() -> PathBuf {
    pour_home().join("state.db")
}

/// Ingested manifests: ~/.pour/registry
pub fn registry_dir() -> PathBuf {
    pour_home().join("registry")
}

/// Settings file: ~/.pour/config.toml
pub fn config_path() -> PathBuf {
    pour_home().join("config.toml")
}

/// Staging area for extraction: ~/.pour/tmp
pub fn tmp_path() -> PathBuf {
    pour_home().join("tmp")
}

/// Per-package lock files for install, upgrade and uninstall: ~/.pour/locks
pub fn locks_dir() -> PathBuf {
    pour_home().join("locks")
}

/// Expand a leading `~` in a cleanup path template against `home`.
pub fn expand_home(template: &str, home: &Path) -> PathBuf {
    if template == "~" {
        home.to_path_buf()
    } else if let Some(rest) = template.strip_prefix("~/") {
        home.join(rest)
    } else {
        PathBuf::from(template)
    }
}
