//! Shared command context.
//!
//! Groups settings, the registry, the state database and the installer so
//! commands do not rebuild them piecemeal.

use std::fmt;
use std::sync::Arc;

use pour_core::install::Installer;
use pour_core::io::fetch::HttpFetcher;
use pour_core::io::fs::LocalFilesystem;
use pour_core::{Error, Registry, Settings, config_path, db_path, registry_dir, tmp_path};

use crate::DbHandle;
use crate::ui::Output;

/// The installer as wired up by the CLI.
pub type CliInstaller = Installer<LocalFilesystem, DbHandle>;

/// Groups common state used by every command that touches installs.
pub struct Context {
    pub settings: Settings,
    pub registry: Registry,
    pub db: DbHandle,
    pub installer: CliInstaller,
    pub client: reqwest::Client,
    pub fetcher: HttpFetcher,
    pub output: Output,
}

impl fmt::Debug for Context {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Context")
            .field("settings", &self.settings)
            .field("installer", &self.installer)
            .finish_non_exhaustive()
    }
}

impl Context {
    /// Load settings, open the registry and state database under the pour home.
    pub fn load(output: Output) -> pour_core::Result<Self> {
        let settings = Settings::load(&config_path())?;
        let registry = Registry::open(&registry_dir())?;
        let db = DbHandle::spawn(&db_path()).map_err(|e| Error::State(e.to_string()))?;

        let installer = Installer::new(
            Arc::new(LocalFilesystem::new(tmp_path())),
            Arc::new(db.clone()),
            settings.applications_dir(),
        )
        .with_extract_timeout(settings.extract_timeout());

        let client = reqwest::Client::builder()
            .user_agent(pour_core::USER_AGENT)
            .tcp_nodelay(true)
            .build()
            .map_err(|e| Error::FetchError(e.to_string()))?;
        let fetcher = HttpFetcher::with_client(client.clone());

        tracing::debug!("Loaded context: {settings:?}");
        Ok(Self {
            settings,
            registry,
            db,
            installer,
            client,
            fetcher,
            output,
        })
    }
}
