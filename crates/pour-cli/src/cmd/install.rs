//! Install command

use anyhow::Result;
use pour_core::{Error, Reporter};
use pour_schema::{PackageName, Version};

use crate::ops::Context;
use crate::ops::pipeline::{fetch_verified, lock_package, record};
use crate::ui::Output;

/// Install the latest (or a pinned) version of a package
pub async fn install(package: &str, version: Option<&str>, output: Output) -> Result<()> {
    let ctx = Context::load(output)?;
    let name = PackageName::new(package);
    let _lock = lock_package(&name).await?;

    if ctx.installer.installed(&name).await?.is_some() {
        return Err(Error::AlreadyInstalled(name).into());
    }

    let store = ctx.registry.store();
    let manifest = match version {
        Some(v) => store.by_version(&name, &Version::parse(v).map_err(Error::from)?)?,
        None => store.latest(&name)?,
    };
    let version = manifest.version.clone();

    let result = async {
        let artifact = fetch_verified(&ctx, manifest).await?;
        output.installing(&name, &version);
        ctx.installer.install(&artifact).await
    }
    .await;

    match result {
        Ok(state) => {
            record(&ctx, "install", &name, None, Some(&version), true).await;
            output.done(
                &name,
                &version,
                &format!("installed to {}", state.install_path.display()),
            );
            Ok(())
        }
        Err(e) => {
            record(&ctx, "install", &name, None, Some(&version), false).await;
            output.failed(&name, &version, &e.to_string());
            Err(e.into())
        }
    }
}
