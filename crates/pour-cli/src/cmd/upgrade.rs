//! Upgrade command

use anyhow::Result;
use pour_core::{Error, Reporter, UpdateStatus, check_for_update};
use pour_schema::PackageName;

use crate::ops::Context;
use crate::ops::pipeline::{fetch_verified, lock_package, record};
use crate::ui::Output;

/// Upgrade an installed package to the newest registry version
pub async fn upgrade(package: &str, output: Output) -> Result<()> {
    let ctx = Context::load(output)?;
    let name = PackageName::new(package);
    let _lock = lock_package(&name).await?;

    let Some(current) = ctx.installer.installed(&name).await? else {
        return Err(Error::NotInstalled(name).into());
    };
    let latest = ctx.registry.store().latest(&name)?;

    if check_for_update(&current.version, &latest.version) == UpdateStatus::UpToDate {
        output.info(&format!("{name} {} is up to date", current.version));
        return Ok(());
    }

    let to = latest.version.clone();
    let result = async {
        let artifact = fetch_verified(&ctx, latest).await?;
        output.installing(&name, &to);
        ctx.installer.upgrade(&artifact).await
    }
    .await;

    let success = result.is_ok();
    record(&ctx, "upgrade", &name, Some(&current.version), Some(&to), success).await;

    match result {
        Ok(_) => {
            output.done(&name, &to, &format!("upgraded from {}", current.version));
            Ok(())
        }
        Err(e) => {
            output.failed(&name, &to, &e.to_string());
            Err(e.into())
        }
    }
}
