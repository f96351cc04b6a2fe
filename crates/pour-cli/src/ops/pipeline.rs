//! Fetch -> verify, shared by install and upgrade.

use std::sync::Arc;

use pour_core::host::host_os_version;
use pour_core::io::fetch::fetch_with_timeout;
use pour_core::{Error, PackageLock, Reporter, VerifiedArtifact, locks_dir, verify};
use pour_schema::{Manifest, PackageName, Version};

use super::context::Context;
use crate::store::HistoryEvent;

/// Download the artifact for `manifest` and verify it for this host.
///
/// Fails with `UnsupportedPlatform` before downloading anything when the
/// host is already known to be too old.
pub async fn fetch_verified(ctx: &Context, manifest: Arc<Manifest>) -> pour_core::Result<VerifiedArtifact> {
    let host = host_os_version(&ctx.settings)?;
    if !manifest.os_constraint.is_satisfied_by(&host) {
        return Err(Error::unsupported(Some(&host), &manifest.os_constraint));
    }

    let url = manifest.download_url();
    ctx.output.fetching(&manifest.name, &manifest.version, &url);
    let bytes = fetch_with_timeout(&ctx.fetcher, &url, ctx.settings.fetch_timeout()).await?;

    let artifact = verify(bytes, manifest, &host)?;
    ctx.output
        .verified(&artifact.manifest().name, &artifact.manifest().version);
    Ok(artifact)
}

/// Take the cross-process lock of `name`, waiting for other `pour`
/// processes working on the same package.
pub async fn lock_package(name: &PackageName) -> pour_core::Result<PackageLock> {
    PackageLock::for_package(&locks_dir(), name).await
}

/// Append a history row. Failures are logged, never fatal.
pub async fn record(
    ctx: &Context,
    action: &str,
    name: &PackageName,
    from: Option<&Version>,
    to: Option<&Version>,
    success: bool,
) {
    let event = HistoryEvent::now(action, name, from, to, success);
    if let Err(e) = ctx.db.add_history(event).await {
        tracing::warn!("Could not record {action} of {name}: {e}");
    }
}
