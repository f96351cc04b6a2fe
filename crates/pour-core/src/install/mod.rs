//! Installer state machine.
//!
//! Per package: `Absent -> Installing -> Installed -> Uninstalling -> Absent`,
//! and `Installed -> Upgrading -> Installed`. Operations on the same package
//! are serialized by a per-package async lock held for their whole duration.
//! Only [`VerifiedArtifact`]s are accepted, so nothing reaches the filesystem
//! before its checksum and platform were checked.

mod state;

pub use state::{InstalledState, MemoryStateStore, StateStore};

use std::collections::HashMap;
use std::fmt;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use pour_schema::{Manifest, PackageName, Version};
use tokio::sync::Mutex as AsyncMutex;

use crate::error::{Error, Result};
use crate::io::fs::FilesystemAccessor;
use crate::paths::expand_home;
use crate::verify::VerifiedArtifact;

/// Where a package is in its install lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum InstallPhase {
    /// Nothing installed.
    Absent,
    /// An install is in progress.
    Installing,
    /// A bundle is installed and recorded.
    Installed,
    /// An upgrade is in progress.
    Upgrading,
    /// An uninstall is in progress.
    Uninstalling,
}

impl fmt::Display for InstallPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Absent => "absent",
            Self::Installing => "installing",
            Self::Installed => "installed",
            Self::Upgrading => "upgrading",
            Self::Uninstalling => "uninstalling",
        };
        f.write_str(s)
    }
}

/// Outcome of a successful uninstall.
#[derive(Debug)]
pub struct UninstallReport {
    /// Package that was removed.
    pub name: PackageName,
    /// Version that was installed.
    pub version: Version,
    /// The removed application bundle.
    pub bundle: PathBuf,
    /// Cleanup paths that are gone (including ones that never existed).
    pub cleaned: Vec<PathBuf>,
    /// [`Error::PartialCleanupFailure`] when some cleanup paths were skipped.
    pub warning: Option<Error>,
}

type Phases = Arc<Mutex<HashMap<PackageName, InstallPhase>>>;

/// Marks a package as mid-operation until dropped.
struct PhaseGuard {
    phases: Phases,
    name: PackageName,
}

impl PhaseGuard {
    fn enter(phases: &Phases, name: &PackageName, phase: InstallPhase) -> Self {
        phases
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(name.clone(), phase);
        tracing::debug!("{name}: {phase}");
        Self {
            phases: Arc::clone(phases),
            name: name.clone(),
        }
    }
}

impl Drop for PhaseGuard {
    fn drop(&mut self) {
        self.phases
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(&self.name);
    }
}

/// Places, upgrades and removes application bundles.
pub struct Installer<F, S> {
    fs: Arc<F>,
    state: Arc<S>,
    applications_dir: PathBuf,
    home: Option<PathBuf>,
    extract_timeout: Duration,
    locks: Mutex<HashMap<PackageName, Arc<AsyncMutex<()>>>>,
    phases: Phases,
}

impl<F, S> fmt::Debug for Installer<F, S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Installer")
            .field("applications_dir", &self.applications_dir)
            .field("home", &self.home)
            .field("extract_timeout", &self.extract_timeout)
            .finish_non_exhaustive()
    }
}

impl<F: FilesystemAccessor, S: StateStore> Installer<F, S> {
    /// Create an installer placing bundles in `applications_dir`.
    pub fn new(fs: Arc<F>, state: Arc<S>, applications_dir: impl Into<PathBuf>) -> Self {
        Self {
            fs,
            state,
            applications_dir: applications_dir.into(),
            home: dirs::home_dir(),
            extract_timeout: Duration::from_secs(600),
            locks: Mutex::new(HashMap::new()),
            phases: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    /// Expand `~` in cleanup paths against `home`.
    pub fn with_home(mut self, home: impl Into<PathBuf>) -> Self {
        self.home = Some(home.into());
        self
    }

    /// Bound every extraction by `timeout`.
    pub fn with_extract_timeout(mut self, timeout: Duration) -> Self {
        self.extract_timeout = timeout;
        self
    }

    /// Directory bundles are placed in.
    pub fn applications_dir(&self) -> &Path {
        &self.applications_dir
    }

    /// Recorded state of `name`.
    ///
    /// # Errors
    ///
    /// Returns the state store's error.
    pub async fn installed(&self, name: &PackageName) -> Result<Option<InstalledState>> {
        self.state.get(name).await
    }

    /// Current lifecycle phase of `name`.
    ///
    /// # Errors
    ///
    /// Returns the state store's error.
    pub async fn phase(&self, name: &PackageName) -> Result<InstallPhase> {
        let transient = self
            .phases
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(name)
            .copied();
        if let Some(phase) = transient {
            return Ok(phase);
        }
        Ok(if self.state.get(name).await?.is_some() {
            InstallPhase::Installed
        } else {
            InstallPhase::Absent
        })
    }

    /// Install a verified artifact into the applications directory.
    ///
    /// # Errors
    ///
    /// - [`Error::AlreadyInstalled`] if the package is not absent
    /// - [`Error::ExtractionError`] if the artifact cannot be unpacked or does
    ///   not contain the install target
    /// - [`Error::TransportTimeout`] if extraction exceeds its budget
    /// - [`Error::Io`] if the destination is occupied or the copy fails
    ///
    /// On any error the recorded state is unchanged and no bundle is left at
    /// the destination.
    pub async fn install(&self, artifact: &VerifiedArtifact) -> Result<InstalledState> {
        let manifest = Arc::clone(artifact.manifest());
        let lock = self.lock_for(&manifest.name);
        let _held = lock.lock().await;

        if self.state.get(&manifest.name).await?.is_some() {
            return Err(Error::AlreadyInstalled(manifest.name.clone()));
        }
        let _phase = PhaseGuard::enter(&self.phases, &manifest.name, InstallPhase::Installing);

        let dest = self.applications_dir.join(&manifest.install_target);
        if self.fs.exists(&dest) {
            return Err(Error::Io(io::Error::new(
                io::ErrorKind::AlreadyExists,
                format!("{} exists and is not managed by pour", dest.display()),
            )));
        }

        let staging = self.extract(artifact).await?;
        let placed = self.place(&staging, &manifest.install_target, &dest).await;
        self.discard(staging).await;
        placed?;

        let state = InstalledState::new(&manifest, dest.clone());
        if let Err(e) = self.state.put(state.clone()).await {
            self.discard(dest).await;
            return Err(e);
        }

        tracing::info!(
            "Installed {} {} at {}",
            manifest.name,
            manifest.version,
            state.install_path.display()
        );
        Ok(state)
    }

    /// Replace the installed bundle with a verified artifact.
    ///
    /// The new bundle is staged next to the destination and swapped in; the
    /// superseded bundle is deleted only after the new state is recorded.
    /// Cleanup paths and user data are never touched.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NotInstalled`] if the package is absent, plus the
    /// errors of [`Installer::install`]. On error the previous bundle and
    /// state are restored.
    pub async fn upgrade(&self, artifact: &VerifiedArtifact) -> Result<InstalledState> {
        let manifest = Arc::clone(artifact.manifest());
        let lock = self.lock_for(&manifest.name);
        let _held = lock.lock().await;

        let Some(current) = self.state.get(&manifest.name).await? else {
            return Err(Error::NotInstalled(manifest.name.clone()));
        };
        let _phase = PhaseGuard::enter(&self.phases, &manifest.name, InstallPhase::Upgrading);

        let dest = self.applications_dir.join(&manifest.install_target);
        let staged = sibling(&dest, "pour-new");
        let previous = current.install_path.clone();
        let backup = sibling(&previous, "pour-old");

        let staging = self.extract(artifact).await?;
        self.discard(staged.clone()).await;
        let placed = self.place(&staging, &manifest.install_target, &staged).await;
        self.discard(staging).await;
        placed?;

        run_blocking(&self.fs, {
            let (staged, dest, previous, backup) =
                (staged.clone(), dest.clone(), previous.clone(), backup.clone());
            move |fs| swap(fs, &staged, &dest, &previous, &backup)
        })
        .await?;

        let state = InstalledState::new(&manifest, dest.clone());
        if let Err(e) = self.state.put(state.clone()).await {
            let restored = run_blocking(&self.fs, move |fs| {
                fs.remove(&dest)?;
                if fs.exists(&backup) {
                    fs.rename(&backup, &previous)?;
                }
                Ok(())
            })
            .await;
            if let Err(restore) = restored {
                tracing::warn!("Could not restore {}: {restore}", current.install_path.display());
            }
            return Err(e);
        }

        self.discard(backup).await;
        tracing::info!(
            "Upgraded {} {} -> {}",
            manifest.name,
            current.version,
            manifest.version
        );
        Ok(state)
    }

    /// Remove the installed bundle, and with `full_zap` every cleanup path.
    ///
    /// Once bundle removal has started it runs to completion even if the
    /// returned future is dropped.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NotInstalled`] if the package is absent, and the
    /// filesystem error if the bundle itself cannot be removed (the package
    /// then stays installed). Cleanup-path failures do not fail the call;
    /// they are reported in [`UninstallReport::warning`].
    pub async fn uninstall(&self, manifest: &Manifest, full_zap: bool) -> Result<UninstallReport> {
        let lock = self.lock_for(&manifest.name);
        let held = lock.lock_owned().await;

        let Some(current) = self.state.get(&manifest.name).await? else {
            return Err(Error::NotInstalled(manifest.name.clone()));
        };
        let phase = PhaseGuard::enter(&self.phases, &manifest.name, InstallPhase::Uninstalling);

        let fs = Arc::clone(&self.fs);
        let state = Arc::clone(&self.state);
        let templates = if full_zap {
            manifest.cleanup_paths.clone()
        } else {
            Vec::new()
        };
        let home = self.home.clone();

        let task = tokio::spawn(async move {
            let _held = held;
            let _phase = phase;

            let bundle = current.install_path.clone();
            run_blocking(&fs, {
                let bundle = bundle.clone();
                move |fs| fs.remove(&bundle)
            })
            .await?;
            state.remove(&current.name).await?;
            tracing::info!("Removed {} {}", current.name, current.version);

            let (cleaned, failures) =
                run_blocking(&fs, move |fs| Ok(zap(fs, &templates, home.as_deref()))).await?;

            let warning = if failures.is_empty() {
                None
            } else {
                tracing::warn!(
                    "{} cleanup path(s) for {} could not be removed",
                    failures.len(),
                    current.name
                );
                Some(Error::PartialCleanupFailure { failures })
            };

            Ok::<_, Error>(UninstallReport {
                name: current.name,
                version: current.version,
                bundle,
                cleaned,
                warning,
            })
        });

        task.await.map_err(|e| Error::Io(io::Error::other(e)))?
    }

    fn lock_for(&self, name: &PackageName) -> Arc<AsyncMutex<()>> {
        let mut locks = self.locks.lock().unwrap_or_else(PoisonError::into_inner);
        Arc::clone(locks.entry(name.clone()).or_default())
    }

    async fn extract(&self, artifact: &VerifiedArtifact) -> Result<PathBuf> {
        let bytes = artifact.bytes().clone();
        let kind = artifact.manifest().artifact_kind;
        let task = run_blocking(&self.fs, move |fs| fs.extract(&bytes, kind));

        tokio::time::timeout(self.extract_timeout, task)
            .await
            .map_err(|_| Error::TransportTimeout {
                operation: "extract",
                secs: self.extract_timeout.as_secs(),
            })?
    }

    /// Copy the bundle named `target` out of `staging` to `dest`, removing any
    /// partial copy on failure.
    async fn place(&self, staging: &Path, target: &str, dest: &Path) -> Result<()> {
        let (staging, target, dest) = (staging.to_path_buf(), target.to_string(), dest.to_path_buf());
        run_blocking(&self.fs, move |fs| {
            let bundle = fs.locate(&staging, &target)?;
            if let Err(e) = fs.copy(&bundle, &dest) {
                if let Err(cleanup) = fs.remove(&dest) {
                    tracing::warn!("Could not remove partial copy {}: {cleanup}", dest.display());
                }
                return Err(e);
            }
            Ok(())
        })
        .await
    }

    async fn discard(&self, path: PathBuf) {
        let shown = path.display().to_string();
        if let Err(e) = run_blocking(&self.fs, move |fs| fs.remove(&path)).await {
            tracing::warn!("Could not remove {shown}: {e}");
        }
    }
}

async fn run_blocking<F, T, Op>(fs: &Arc<F>, op: Op) -> Result<T>
where
    F: FilesystemAccessor,
    T: Send + 'static,
    Op: FnOnce(&F) -> Result<T> + Send + 'static,
{
    let fs = Arc::clone(fs);
    tokio::task::spawn_blocking(move || op(&fs))
        .await
        .map_err(|e| Error::Io(io::Error::other(e)))?
}

/// `Foo.app` -> `.Foo.app.<tag>` in the same directory.
fn sibling(path: &Path, tag: &str) -> PathBuf {
    let name = path
        .file_name()
        .map_or_else(String::new, |n| n.to_string_lossy().into_owned());
    path.with_file_name(format!(".{name}.{tag}"))
}

/// Move `previous` aside to `backup` and `staged` into `dest`, undoing the
/// first move if the second fails.
fn swap<F: FilesystemAccessor + ?Sized>(
    fs: &F,
    staged: &Path,
    dest: &Path,
    previous: &Path,
    backup: &Path,
) -> Result<()> {
    let had_previous = fs.exists(previous);
    if had_previous {
        let moved = fs.remove(backup).and_then(|()| fs.rename(previous, backup));
        if let Err(e) = moved {
            remove_staged(fs, staged);
            return Err(e);
        }
    }

    if let Err(e) = fs.rename(staged, dest) {
        remove_staged(fs, staged);
        if had_previous {
            if let Err(restore) = fs.rename(backup, previous) {
                tracing::warn!("Could not restore {}: {restore}", previous.display());
            }
        }
        return Err(e);
    }
    Ok(())
}

fn remove_staged<F: FilesystemAccessor + ?Sized>(fs: &F, staged: &Path) {
    if let Err(e) = fs.remove(staged) {
        tracing::warn!("Could not remove staged bundle {}: {e}", staged.display());
    }
}

/// Best-effort removal of cleanup paths. Returns what is gone and what was
/// skipped (with the reason).
fn zap<F: FilesystemAccessor + ?Sized>(
    fs: &F,
    templates: &[String],
    home: Option<&Path>,
) -> (Vec<PathBuf>, Vec<(PathBuf, String)>) {
    let mut cleaned = Vec::new();
    let mut failures = Vec::new();

    for template in templates {
        let path = match (template.starts_with('~'), home) {
            (true, None) => {
                tracing::warn!("Skipping {template}: home directory unknown");
                failures.push((PathBuf::from(template), "home directory unknown".to_string()));
                continue;
            }
            (true, Some(home)) => expand_home(template, home),
            (false, _) => PathBuf::from(template),
        };

        // Never the home directory itself or a filesystem root
        if home.is_some_and(|h| h == path) || path.parent().is_none() {
            tracing::warn!("Refusing to remove {}", path.display());
            failures.push((path, "refusing to remove this path".to_string()));
            continue;
        }

        match fs.remove(&path) {
            Ok(()) => {
                tracing::debug!("Removed {}", path.display());
                cleaned.push(path);
            }
            Err(e) => {
                tracing::warn!("Skipping cleanup path {}: {e}", path.display());
                failures.push((path, e.to_string()));
            }
        }
    }

    (cleaned, failures)
}
