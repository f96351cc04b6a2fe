//! Check-update command

use anyhow::Result;
use pour_core::Error;
use pour_core::update::{GitHubLatestProvider, RegistryProvider, UpdateProvider, UpdateStatus, check_with};
use pour_schema::{Livecheck, Manifest, PackageName};

use crate::ops::Context;
use crate::ui::Output;

/// Compare the installed version of a package against upstream
pub async fn check_update(package: &str, output: Output) -> Result<()> {
    let ctx = Context::load(output)?;
    let name = PackageName::new(package);

    let Some(current) = ctx.installer.installed(&name).await? else {
        return Err(Error::NotInstalled(name).into());
    };
    let manifest = ctx.registry.store().latest(&name)?;
    let provider = provider_for(&ctx, &manifest);

    match check_with(provider.as_ref(), &name, &current.version).await? {
        UpdateStatus::UpdateAvailable(latest) => {
            println!("update available: {} -> {latest}", current.version);
        }
        UpdateStatus::UpToDate => println!("up to date"),
    }
    Ok(())
}

/// Provider selected by the manifest's `livecheck` strategy.
fn provider_for(ctx: &Context, manifest: &Manifest) -> Box<dyn UpdateProvider> {
    if manifest.livecheck == Livecheck::GithubLatest {
        if let Some((owner, repo)) = manifest.github_repo() {
            let token = std::env::var("GITHUB_TOKEN").ok();
            return Box::new(
                GitHubLatestProvider::new(ctx.client.clone(), &ctx.settings.github_api, owner, repo)
                    .with_token(token),
            );
        }
        tracing::warn!(
            "{} asks for GitHub livecheck but its URL is not on github.com, using the registry",
            manifest.name
        );
    }
    Box::new(RegistryProvider::new(ctx.registry.store().clone()))
}
