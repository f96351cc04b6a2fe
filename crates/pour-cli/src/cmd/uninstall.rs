//! Uninstall command

use anyhow::Result;
use pour_core::{Error, Reporter};
use pour_schema::PackageName;

use crate::ops::Context;
use crate::ops::pipeline::{lock_package, record};
use crate::ui::Output;

/// Remove an installed package, and with `full_zap` its user data
pub async fn uninstall(package: &str, full_zap: bool, output: Output) -> Result<()> {
    let ctx = Context::load(output)?;
    let name = PackageName::new(package);
    let _lock = lock_package(&name).await?;

    let Some(current) = ctx.installer.installed(&name).await? else {
        return Err(Error::NotInstalled(name).into());
    };

    // Cleanup paths come from the installed release, else the newest one known
    let store = ctx.registry.store();
    let manifest = store
        .by_version(&name, &current.version)
        .or_else(|_| store.latest(&name))?;

    output.removing(&name, &current.version);
    let report = match ctx.installer.uninstall(&manifest, full_zap).await {
        Ok(report) => report,
        Err(e) => {
            record(&ctx, "uninstall", &name, Some(&current.version), None, false).await;
            output.failed(&name, &current.version, &e.to_string());
            return Err(e.into());
        }
    };
    record(&ctx, "uninstall", &name, Some(&current.version), None, true).await;

    let detail = if full_zap {
        format!("removed {} and {} cleanup path(s)", report.bundle.display(), report.cleaned.len())
    } else {
        format!("removed {}", report.bundle.display())
    };
    output.done(&report.name, &report.version, &detail);

    if let Some(warning) = &report.warning {
        output.warning(&warning.to_string());
        if let Error::PartialCleanupFailure { failures } = warning {
            for (path, reason) in failures {
                output.warning(&format!("  {}: {reason}", path.display()));
            }
        }
    }
    Ok(())
}
