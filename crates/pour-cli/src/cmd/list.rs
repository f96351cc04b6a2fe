//! List command

use anyhow::Result;
use pour_core::StateStore;

use crate::ops::Context;
use crate::ui::Output;

/// List installed packages
pub async fn list(output: Output) -> Result<()> {
    let ctx = Context::load(output)?;
    let installed = ctx.db.list().await?;

    if installed.is_empty() {
        println!("No packages installed.");
        return Ok(());
    }

    for state in installed {
        println!(
            "{} {} ({}, installed {})",
            state.name,
            state.version,
            state.install_path.display(),
            format_relative_time(state.installed_at)
        );
    }
    Ok(())
}

/// Format a timestamp as relative time
pub(crate) fn format_relative_time(unix_timestamp: i64) -> String {
    let diff = chrono::Utc::now().timestamp() - unix_timestamp;

    if diff < 60 {
        "just now".to_string()
    } else if diff < 3600 {
        format!("{} minutes ago", diff / 60)
    } else if diff < 86400 {
        format!("{} hours ago", diff / 3600)
    } else {
        format!("{} days ago", diff / 86400)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn relative_times() {
        let now = chrono::Utc::now().timestamp();
        assert_eq!(format_relative_time(now), "just now");
        assert_eq!(format_relative_time(now - 7200), "2 hours ago");
        assert_eq!(format_relative_time(now - 3 * 86400), "3 days ago");
    }
}
