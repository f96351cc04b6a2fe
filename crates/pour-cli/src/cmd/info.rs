//! Info command

use anyhow::Result;
use crossterm::style::Stylize;
use pour_core::Error;
use pour_schema::PackageName;

use super::list::format_relative_time;
use crate::ops::Context;
use crate::ui::Output;

/// Show every known release of a package and its install history
pub async fn info(package: &str, output: Output) -> Result<()> {
    let ctx = Context::load(output)?;
    let name = PackageName::new(package);

    let releases = ctx.registry.store().releases(&name);
    if releases.is_empty() {
        return Err(Error::NotFound(name.to_string()).into());
    }
    let installed = ctx.installer.installed(&name).await?;

    println!("{}", name.as_str().bold());
    if let Some(latest) = releases.last() {
        let m = &latest.manifest;
        if let Some(description) = &m.description {
            println!("  {description}");
        }
        if let Some(homepage) = &m.homepage {
            println!("  Homepage: {homepage}");
        }
        println!("  Bundle: {}", m.install_target);
    }

    println!("  Versions:");
    for record in releases.iter().rev() {
        let m = &record.manifest;
        let mut tags = Vec::new();
        if !record.superseded {
            tags.push("latest");
        }
        if installed.as_ref().is_some_and(|s| s.version == m.version) {
            tags.push("installed");
        }
        println!(
            "    {:<10} {} {:<10} {} {}",
            m.version.as_str(),
            m.checksum.as_str().dark_grey(),
            m.artifact_kind.as_str(),
            m.os_constraint,
            tags.join(", ").green()
        );
    }

    let history = ctx.db.history(name.to_string()).await?;
    if !history.is_empty() {
        println!("  History:");
        for event in history {
            let versions = match (&event.version_from, &event.version_to) {
                (Some(from), Some(to)) => format!("{from} -> {to}"),
                (None, Some(v)) | (Some(v), None) => v.clone(),
                (None, None) => String::new(),
            };
            let status = if event.success { "ok" } else { "failed" };
            println!(
                "    {:<10} {:<20} {:<7} {}",
                event.action,
                versions,
                status,
                format_relative_time(event.timestamp).dark_grey()
            );
        }
    }
    Ok(())
}
