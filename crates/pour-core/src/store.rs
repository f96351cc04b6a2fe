//! In-memory manifest store.
//!
//! Holds every known release of every package, keyed by name and version.
//! Each package name has its own lock: lookups take it shared, `ingest`
//! takes it exclusively, so ingests of different packages never contend.
//! Releases are never removed; older ones are only marked superseded.

use std::collections::{BTreeMap, HashMap};
use std::sync::{Arc, PoisonError, RwLock};

use pour_schema::{Manifest, PackageName, Version};

use crate::error::{Error, Result};

/// Result of a successful [`ManifestStore::ingest`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IngestOutcome {
    /// A new release was recorded.
    Inserted,
    /// The identical release was already recorded; nothing changed.
    Unchanged,
}

/// One stored release and whether a newer one exists.
#[derive(Debug, Clone)]
pub struct ManifestRecord {
    /// The immutable manifest.
    pub manifest: Arc<Manifest>,
    /// True once a newer version of the same package has been ingested.
    pub superseded: bool,
}

#[derive(Debug, Default)]
struct Releases {
    by_version: BTreeMap<Version, ManifestRecord>,
}

impl Releases {
    fn mark_superseded(&mut self) {
        let latest = self.by_version.keys().next_back().cloned();
        for (version, record) in &mut self.by_version {
            record.superseded = Some(version) != latest.as_ref();
        }
    }
}

/// Thread-safe store of manifests keyed by `(name, version)`.
#[derive(Debug, Default)]
pub struct ManifestStore {
    packages: RwLock<HashMap<PackageName, Arc<RwLock<Releases>>>>,
}

impl ManifestStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a release.
    ///
    /// Re-ingesting a release with the checksum already on record is a
    /// no-op. Every other version of the same package becomes superseded
    /// by the maximum version.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidManifest`] if the manifest fails validation and
    /// [`Error::DuplicateVersionConflict`] if the version is already recorded
    /// with a different checksum. The store is unchanged in both cases.
    pub fn ingest(&self, manifest: Manifest) -> Result<IngestOutcome> {
        manifest.validate()?;

        let slot = self.slot_or_insert(&manifest.name);
        let mut releases = slot.write().unwrap_or_else(PoisonError::into_inner);

        if let Some(existing) = releases.by_version.get(&manifest.version) {
            check_checksum(&existing.manifest, &manifest)?;
            tracing::debug!(
                "{} {} already recorded, skipping",
                manifest.name,
                manifest.version
            );
            return Ok(IngestOutcome::Unchanged);
        }

        tracing::info!("Recorded {} {}", manifest.name, manifest.version);
        releases.by_version.insert(
            manifest.version.clone(),
            ManifestRecord {
                manifest: Arc::new(manifest),
                superseded: false,
            },
        );
        releases.mark_superseded();

        Ok(IngestOutcome::Inserted)
    }

    /// Whether `manifest` could be ingested without a checksum conflict.
    ///
    /// # Errors
    ///
    /// Returns [`Error::DuplicateVersionConflict`] if its version is recorded
    /// with a different checksum.
    pub fn admits(&self, manifest: &Manifest) -> Result<()> {
        match self.by_version(&manifest.name, &manifest.version) {
            Ok(existing) => check_checksum(&existing, manifest),
            Err(_) => Ok(()),
        }
    }

    /// The release with the highest version for `name`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NotFound`] if no release of `name` is recorded.
    pub fn latest(&self, name: &PackageName) -> Result<Arc<Manifest>> {
        let slot = self.slot(name)?;
        let releases = slot.read().unwrap_or_else(PoisonError::into_inner);
        releases
            .by_version
            .values()
            .next_back()
            .map(|record| Arc::clone(&record.manifest))
            .ok_or_else(|| Error::NotFound(name.to_string()))
    }

    /// The release of `name` at exactly `version`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NotFound`] if that release is not recorded.
    pub fn by_version(&self, name: &PackageName, version: &Version) -> Result<Arc<Manifest>> {
        self.record(name, version).map(|record| record.manifest)
    }

    /// The stored record (manifest plus superseded flag) of one release.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NotFound`] if that release is not recorded.
    pub fn record(&self, name: &PackageName, version: &Version) -> Result<ManifestRecord> {
        let slot = self.slot(name)?;
        let releases = slot.read().unwrap_or_else(PoisonError::into_inner);
        releases
            .by_version
            .get(version)
            .cloned()
            .ok_or_else(|| Error::NotFound(format!("{name} {version}")))
    }

    /// Every release of `name`, oldest first.
    pub fn releases(&self, name: &PackageName) -> Vec<ManifestRecord> {
        self.slot(name)
            .map(|slot| {
                let releases = slot.read().unwrap_or_else(PoisonError::into_inner);
                releases.by_version.values().cloned().collect()
            })
            .unwrap_or_default()
    }

    /// Names of every package with at least one release, sorted.
    pub fn names(&self) -> Vec<PackageName> {
        let packages = self.packages.read().unwrap_or_else(PoisonError::into_inner);
        let mut names: Vec<PackageName> = packages.keys().cloned().collect();
        names.sort();
        names
    }

    fn slot(&self, name: &PackageName) -> Result<Arc<RwLock<Releases>>> {
        let packages = self.packages.read().unwrap_or_else(PoisonError::into_inner);
        packages
            .get(name)
            .cloned()
            .ok_or_else(|| Error::NotFound(name.to_string()))
    }

    fn slot_or_insert(&self, name: &PackageName) -> Arc<RwLock<Releases>> {
        if let Ok(slot) = self.slot(name) {
            return slot;
        }
        let mut packages = self.packages.write().unwrap_or_else(PoisonError::into_inner);
        Arc::clone(packages.entry(name.clone()).or_default())
    }
}

fn check_checksum(recorded: &Manifest, offered: &Manifest) -> Result<()> {
    if recorded.checksum == offered.checksum {
        return Ok(());
    }
    Err(Error::DuplicateVersionConflict {
        name: offered.name.clone(),
        version: offered.version.clone(),
        recorded: recorded.checksum.clone(),
        offered: offered.checksum.clone(),
    })
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use pour_schema::{ArtifactKind, Livecheck, OsConstraint, Sha256Digest};

    pub(crate) fn manifest(name: &str, version: &str, content: &[u8]) -> Manifest {
        Manifest {
            name: PackageName::new(name),
            version: Version::parse(version).unwrap(),
            checksum: Sha256Digest::compute(content),
            url_template: format!("https://example.com/{name}/{{{{version}}}}/{name}.zip"),
            os_constraint: OsConstraint::parse(">= :sonoma").unwrap(),
            artifact_kind: ArtifactKind::Archive,
            install_target: "Xamrock.app".to_string(),
            cleanup_paths: vec!["~/Library/Caches/com.example.xamrock".to_string()],
            description: None,
            homepage: None,
            livecheck: Livecheck::Registry,
        }
    }

    fn v(s: &str) -> Version {
        Version::parse(s).unwrap()
    }

    #[test]
    fn latest_is_the_maximum_version() {
        let store = ManifestStore::new();
        store.ingest(manifest("xamrock", "0.1.14", b"c2")).unwrap();
        store.ingest(manifest("xamrock", "0.1.13", b"c1")).unwrap();

        let name = PackageName::new("xamrock");
        assert_eq!(store.latest(&name).unwrap().version, v("0.1.14"));
    }

    #[test]
    fn older_release_stays_queryable_after_newer_ingest() {
        let store = ManifestStore::new();
        store.ingest(manifest("xamrock", "0.1.13", b"c1")).unwrap();
        store.ingest(manifest("xamrock", "0.1.14", b"c2")).unwrap();

        let name = PackageName::new("xamrock");
        assert_eq!(store.latest(&name).unwrap().version, v("0.1.14"));

        let old = store.record(&name, &v("0.1.13")).unwrap();
        assert_eq!(old.manifest.checksum, Sha256Digest::compute(b"c1"));
        assert!(old.superseded);
        assert!(!store.record(&name, &v("0.1.14")).unwrap().superseded);
    }

    #[test]
    fn identical_reingest_is_a_no_op() {
        let store = ManifestStore::new();
        let m = manifest("xamrock", "0.1.13", b"c1");
        assert_eq!(store.ingest(m.clone()).unwrap(), IngestOutcome::Inserted);
        assert_eq!(store.ingest(m).unwrap(), IngestOutcome::Unchanged);
        assert_eq!(store.releases(&PackageName::new("xamrock")).len(), 1);
    }

    #[test]
    fn checksum_drift_is_rejected_and_store_unchanged() {
        let store = ManifestStore::new();
        store.ingest(manifest("xamrock", "0.1.13", b"c1")).unwrap();

        let err = store
            .ingest(manifest("xamrock", "0.1.13", b"tampered"))
            .unwrap_err();
        assert!(matches!(err, Error::DuplicateVersionConflict { .. }));

        let name = PackageName::new("xamrock");
        let kept = store.by_version(&name, &v("0.1.13")).unwrap();
        assert_eq!(kept.checksum, Sha256Digest::compute(b"c1"));
        assert_eq!(store.releases(&name).len(), 1);
    }

    #[test]
    fn padded_versions_are_the_same_release() {
        let store = ManifestStore::new();
        store.ingest(manifest("xamrock", "1.2", b"c1")).unwrap();
        let err = store.ingest(manifest("xamrock", "1.2.0", b"c2")).unwrap_err();
        assert!(matches!(err, Error::DuplicateVersionConflict { .. }));
    }

    #[test]
    fn missing_lookups_are_not_found() {
        let store = ManifestStore::new();
        let name = PackageName::new("ghost");
        assert!(matches!(store.latest(&name), Err(Error::NotFound(_))));

        store.ingest(manifest("ghost", "1.0", b"c")).unwrap();
        assert!(matches!(
            store.by_version(&name, &v("2.0")),
            Err(Error::NotFound(_))
        ));
    }

    #[test]
    fn invalid_manifest_is_rejected() {
        let store = ManifestStore::new();
        let mut m = manifest("xamrock", "1.0", b"c");
        m.install_target = String::new();
        assert!(matches!(store.ingest(m), Err(Error::InvalidManifest(_))));
        assert!(store.names().is_empty());
    }

    #[test]
    fn concurrent_ingest_across_names() {
        let store = Arc::new(ManifestStore::new());
        let handles: Vec<_> = (0..8)
            .map(|i| {
                let store = Arc::clone(&store);
                std::thread::spawn(move || {
                    for patch in 0..20 {
                        let version = format!("1.0.{patch}");
                        let content = format!("{i}-{patch}");
                        store
                            .ingest(manifest(&format!("pkg{i}"), &version, content.as_bytes()))
                            .unwrap();
                    }
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }

        assert_eq!(store.names().len(), 8);
        for name in store.names() {
            assert_eq!(store.latest(&name).unwrap().version, v("1.0.19"));
            assert_eq!(store.releases(&name).len(), 20);
        }
    }
}
