//! On-disk manifest registry.
//!
//! Layout: `<root>/<name>/<version>.toml`, one manifest per file. The
//! registry is loaded into a [`ManifestStore`] at startup. Ingest is
//! serialized per package across processes by a lock file in the package
//! directory, and a recorded release file is never overwritten.

use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use pour_schema::Manifest;

use crate::error::Result;
use crate::lock::PackageLock;
use crate::store::{IngestOutcome, ManifestStore};

const LOCK_FILE: &str = ".lock";

/// A [`ManifestStore`] backed by a directory of TOML manifests.
#[derive(Debug)]
pub struct Registry {
    root: PathBuf,
    store: Arc<ManifestStore>,
}

impl Registry {
    /// Load every manifest under `root`, creating the directory if needed.
    ///
    /// # Errors
    ///
    /// Returns an error if the directory cannot be created or read, a file
    /// is not a valid manifest, or two files disagree on a release checksum.
    pub fn open(root: &Path) -> Result<Self> {
        std::fs::create_dir_all(root)?;
        let store = ManifestStore::new();

        for entry in walkdir::WalkDir::new(root)
            .min_depth(2)
            .max_depth(2)
            .sort_by_file_name()
        {
            let entry = entry.map_err(std::io::Error::other)?;
            let path = entry.path();
            if !entry.file_type().is_file() || path.extension().is_none_or(|e| e != "toml") {
                continue;
            }
            let manifest = Manifest::from_file(path)?;
            store.ingest(manifest)?;
        }

        tracing::debug!(
            "Loaded registry at {} ({} packages)",
            root.display(),
            store.names().len()
        );

        Ok(Self {
            root: root.to_path_buf(),
            store: Arc::new(store),
        })
    }

    /// The in-memory view of the registry.
    pub fn store(&self) -> &Arc<ManifestStore> {
        &self.store
    }

    /// Persist a release and record it in memory.
    ///
    /// Holds `<root>/<name>/.lock` for the whole call, so registry handles in
    /// other processes ingesting the same package take turns. A release file
    /// already on disk is authoritative even if this handle has not loaded it.
    /// The file is written before the in-memory store is updated and never
    /// replaces an existing file.
    ///
    /// # Errors
    ///
    /// Returns the errors of [`ManifestStore::ingest`], or an IO error if the
    /// lock cannot be taken or the manifest file cannot be written.
    pub fn ingest(&self, manifest: Manifest) -> Result<IngestOutcome> {
        manifest.validate()?;
        let dir = self.root.join(manifest.name.as_str());
        let _lock = PackageLock::acquire(&dir.join(LOCK_FILE))?;

        let path = dir.join(format!("{}.toml", manifest.version));
        if path.exists() {
            let recorded = Manifest::from_file(&path)?;
            tracing::debug!("{} {} already on disk", recorded.name, recorded.version);
            self.store.ingest(recorded)?;
            return self.store.ingest(manifest);
        }

        self.store.admits(&manifest)?;
        write_new(&dir, &path, &manifest.to_toml()?)?;
        self.store.ingest(manifest)
    }
}

fn write_new(dir: &Path, path: &Path, content: &str) -> std::io::Result<()> {
    let mut file = tempfile::NamedTempFile::new_in(dir)?;
    file.write_all(content.as_bytes())?;
    file.as_file().sync_all()?;
    file.persist_noclobber(path).map_err(|e| e.error)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;
    use crate::store::tests::manifest;
    use pour_schema::{PackageName, Version};
    use tempfile::TempDir;

    #[test]
    fn ingested_manifests_survive_reopen() {
        let dir = TempDir::new().unwrap();
        {
            let registry = Registry::open(dir.path()).unwrap();
            registry.ingest(manifest("xamrock", "0.1.13", b"c1")).unwrap();
            registry.ingest(manifest("xamrock", "0.1.14", b"c2")).unwrap();
        }

        assert!(dir.path().join("xamrock").join("0.1.13.toml").exists());

        let reopened = Registry::open(dir.path()).unwrap();
        let name = PackageName::new("xamrock");
        let latest = reopened.store().latest(&name).unwrap();
        assert_eq!(latest.version, Version::parse("0.1.14").unwrap());
        assert_eq!(*latest, manifest("xamrock", "0.1.14", b"c2"));
    }

    #[test]
    fn conflicting_ingest_does_not_touch_disk() {
        let dir = TempDir::new().unwrap();
        let registry = Registry::open(dir.path()).unwrap();
        registry.ingest(manifest("xamrock", "0.1.13", b"c1")).unwrap();

        let file = dir.path().join("xamrock").join("0.1.13.toml");
        let before = std::fs::read_to_string(&file).unwrap();

        let err = registry
            .ingest(manifest("xamrock", "0.1.13", b"other"))
            .unwrap_err();
        assert!(matches!(err, Error::DuplicateVersionConflict { .. }));
        assert_eq!(std::fs::read_to_string(&file).unwrap(), before);
    }

    #[test]
    fn recorded_checksum_survives_a_second_handle() {
        let dir = TempDir::new().unwrap();
        let first = Registry::open(dir.path()).unwrap();
        let second = Registry::open(dir.path()).unwrap();

        first.ingest(manifest("xamrock", "0.1.13", b"c1")).unwrap();
        let err = second
            .ingest(manifest("xamrock", "0.1.13", b"tampered"))
            .unwrap_err();
        assert!(matches!(err, Error::DuplicateVersionConflict { .. }));

        // the second handle now knows the release it was missing
        assert_eq!(
            second.ingest(manifest("xamrock", "0.1.13", b"c1")).unwrap(),
            IngestOutcome::Unchanged
        );

        let reopened = Registry::open(dir.path()).unwrap();
        let recorded = reopened
            .store()
            .by_version(&PackageName::new("xamrock"), &Version::parse("0.1.13").unwrap())
            .unwrap();
        assert_eq!(*recorded, manifest("xamrock", "0.1.13", b"c1"));
    }

    #[test]
    fn racing_handles_record_one_checksum() {
        let dir = TempDir::new().unwrap();
        let outcomes: Vec<_> = std::thread::scope(|scope| {
            let handles: Vec<_> = [b"left".as_slice(), b"right".as_slice()]
                .into_iter()
                .map(|content| {
                    let root = dir.path();
                    scope.spawn(move || {
                        Registry::open(root)
                            .unwrap()
                            .ingest(manifest("xamrock", "0.1.13", content))
                    })
                })
                .collect();
            handles.into_iter().map(|h| h.join().unwrap()).collect()
        });

        assert_eq!(outcomes.iter().filter(|o| o.is_ok()).count(), 1);
        assert!(outcomes.iter().any(|o| matches!(o, Err(Error::DuplicateVersionConflict { .. }))));

        let entries: Vec<_> = std::fs::read_dir(dir.path().join("xamrock"))
            .unwrap()
            .map(|e| e.unwrap().file_name())
            .filter(|n| n.to_string_lossy().ends_with(".toml"))
            .collect();
        assert_eq!(entries.len(), 1);
        assert!(Registry::open(dir.path()).is_ok());
    }

    #[test]
    fn failed_write_leaves_store_unchanged() {
        let dir = TempDir::new().unwrap();
        let registry = Registry::open(dir.path()).unwrap();
        // a plain file where the package directory belongs
        std::fs::write(dir.path().join("xamrock"), "not a directory").unwrap();

        assert!(registry.ingest(manifest("xamrock", "0.1.13", b"c1")).is_err());
        assert!(registry.store().releases(&PackageName::new("xamrock")).is_empty());
    }

    #[test]
    fn unsafe_names_never_reach_disk() {
        let dir = TempDir::new().unwrap();
        let root = dir.path().join("registry");
        let registry = Registry::open(&root).unwrap();

        for name in ["acme/../../escaped", "acme/tool"] {
            let err = registry.ingest(manifest(name, "1.0", b"x")).unwrap_err();
            assert!(matches!(err, Error::InvalidManifest(_)), "{name}: {err}");
        }
        assert!(!dir.path().join("escaped").exists());
        assert!(!root.join("acme").exists());
        assert!(registry.store().names().is_empty());
    }

    #[test]
    fn unrelated_files_are_ignored() {
        let dir = TempDir::new().unwrap();
        std::fs::create_dir_all(dir.path().join("xamrock")).unwrap();
        std::fs::write(dir.path().join("xamrock").join("notes.txt"), "hi").unwrap();
        std::fs::write(dir.path().join("README"), "top level").unwrap();

        let registry = Registry::open(dir.path()).unwrap();
        assert!(registry.store().names().is_empty());
    }
}
