//! Update checks.
//!
//! [`check_for_update`] is a pure comparison. Where the upstream version comes
//! from is an [`UpdateProvider`]: the local registry, or GitHub releases.

use std::sync::Arc;

use async_trait::async_trait;
use pour_schema::{PackageName, Version};
use reqwest::Client;
use serde::Deserialize;

use crate::error::{Error, Result};
use crate::store::ManifestStore;

/// Result of comparing an installed version against upstream.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UpdateStatus {
    /// Upstream is newer.
    UpdateAvailable(Version),
    /// Installed is the newest (or newer than upstream).
    UpToDate,
}

/// Compare `installed` against `upstream`.
///
/// ```
/// use pour_core::update::{UpdateStatus, check_for_update};
/// use pour_schema::Version;
///
/// let v = |s| Version::parse(s).unwrap();
/// assert_eq!(
///     check_for_update(&v("0.1.14"), &v("0.1.15")),
///     UpdateStatus::UpdateAvailable(v("0.1.15"))
/// );
/// assert_eq!(check_for_update(&v("0.1.15"), &v("0.1.15")), UpdateStatus::UpToDate);
/// ```
pub fn check_for_update(installed: &Version, upstream: &Version) -> UpdateStatus {
    if upstream > installed {
        UpdateStatus::UpdateAvailable(upstream.clone())
    } else {
        UpdateStatus::UpToDate
    }
}

/// Source of the latest released version of a package.
#[async_trait]
pub trait UpdateProvider: Send + Sync {
    /// Latest released version of `name`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NotFound`] when the provider knows nothing about
    /// `name`, and [`Error::FetchError`] for transport failures.
    async fn latest_version(&self, name: &PackageName) -> Result<Version>;
}

/// Ask `provider` for the latest version and compare it to `installed`.
///
/// # Errors
///
/// Propagates the provider's error.
pub async fn check_with<P>(provider: &P, name: &PackageName, installed: &Version) -> Result<UpdateStatus>
where
    P: UpdateProvider + ?Sized,
{
    let upstream = provider.latest_version(name).await?;
    tracing::debug!("{name}: installed {installed}, upstream {upstream}");
    Ok(check_for_update(installed, &upstream))
}

/// Latest version from the local manifest store.
#[derive(Debug, Clone)]
pub struct RegistryProvider {
    store: Arc<ManifestStore>,
}

impl RegistryProvider {
    /// Read from `store`.
    pub fn new(store: Arc<ManifestStore>) -> Self {
        Self { store }
    }
}

#[async_trait]
impl UpdateProvider for RegistryProvider {
    async fn latest_version(&self, name: &PackageName) -> Result<Version> {
        self.store.latest(name).map(|m| m.version.clone())
    }
}

#[derive(Deserialize)]
struct LatestRelease {
    tag_name: String,
}

/// Latest release of one GitHub repository.
#[derive(Debug, Clone)]
pub struct GitHubLatestProvider {
    client: Client,
    api_base: String,
    owner: String,
    repo: String,
    token: Option<String>,
}

impl GitHubLatestProvider {
    /// Query `{api_base}/repos/{owner}/{repo}/releases/latest`.
    pub fn new(client: Client, api_base: &str, owner: &str, repo: &str) -> Self {
        Self {
            client,
            api_base: api_base.trim_end_matches('/').to_string(),
            owner: owner.to_string(),
            repo: repo.to_string(),
            token: None,
        }
    }

    /// Authenticate requests (raises the API rate limit).
    pub fn with_token(mut self, token: Option<String>) -> Self {
        self.token = token;
        self
    }
}

#[async_trait]
impl UpdateProvider for GitHubLatestProvider {
    async fn latest_version(&self, name: &PackageName) -> Result<Version> {
        let url = format!(
            "{}/repos/{}/{}/releases/latest",
            self.api_base, self.owner, self.repo
        );
        tracing::debug!("Checking {name} via {url}");

        let mut request = self
            .client
            .get(&url)
            .header(reqwest::header::ACCEPT, "application/vnd.github+json")
            .header(reqwest::header::USER_AGENT, crate::USER_AGENT);
        if let Some(token) = &self.token {
            request = request.bearer_auth(token);
        }

        let response = request
            .send()
            .await
            .map_err(|e| Error::FetchError(format!("{url}: {e}")))?;
        if response.status() == reqwest::StatusCode::NOT_FOUND {
            return Err(Error::NotFound(format!(
                "no releases for {}/{}",
                self.owner, self.repo
            )));
        }
        let release: LatestRelease = response
            .error_for_status()
            .map_err(|e| Error::FetchError(format!("{url}: {e}")))?
            .json()
            .await
            .map_err(|e| Error::FetchError(format!("{url}: {e}")))?;

        version_from_tag(&release.tag_name)
    }
}

/// `v0.1.15` / `0.1.15` -> `0.1.15`.
fn version_from_tag(tag: &str) -> Result<Version> {
    let trimmed = tag.trim();
    let bare = trimmed
        .strip_prefix('v')
        .or_else(|| trimmed.strip_prefix('V'))
        .unwrap_or(trimmed);
    Version::parse(bare).map_err(|_| Error::FetchError(format!("release tag '{tag}' is not a version")))
}
