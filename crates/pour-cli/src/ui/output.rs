//! Line-oriented terminal reporter.
//!
//! Progress goes to stdout and is silenced by `--quiet`; warnings and errors
//! go to stderr and are always shown.

use crossterm::style::Stylize;
use pour_core::Reporter;
use pour_schema::{PackageName, Version};

use super::theme::Icons;

/// A cheap, copyable handle commands report through.
#[derive(Debug, Clone, Copy, Default)]
pub struct Output {
    quiet: bool,
    icons: Icons,
}

impl Output {
    pub fn new(quiet: bool) -> Self {
        Self {
            quiet,
            icons: Icons::default(),
        }
    }

    pub fn is_quiet(&self) -> bool {
        self.quiet
    }

    fn progress(&self, icon: &str, name: &PackageName, version: &Version, detail: &str) {
        if self.quiet {
            return;
        }
        println!(
            "{} {} {} {}",
            icon,
            name.as_str().cyan(),
            version.as_str(),
            detail.dark_grey()
        );
    }
}

impl Reporter for Output {
    fn fetching(&self, name: &PackageName, version: &Version, url: &str) {
        self.progress(&self.icons.active.cyan().to_string(), name, version, url);
    }

    fn verified(&self, name: &PackageName, version: &Version) {
        self.progress(&self.icons.active.cyan().to_string(), name, version, "verified");
    }

    fn installing(&self, name: &PackageName, version: &Version) {
        self.progress(&self.icons.active.cyan().to_string(), name, version, "installing");
    }

    fn removing(&self, name: &PackageName, version: &Version) {
        self.progress(&self.icons.active.red().to_string(), name, version, "removing");
    }

    fn done(&self, name: &PackageName, version: &Version, detail: &str) {
        self.progress(&self.icons.success.green().to_string(), name, version, detail);
    }

    fn failed(&self, name: &PackageName, version: &Version, reason: &str) {
        eprintln!(
            "{} {} {} {}",
            self.icons.error.red(),
            name.as_str().cyan(),
            version.as_str(),
            reason.red()
        );
    }

    fn info(&self, msg: &str) {
        if !self.quiet {
            println!("{} {}", self.icons.info.dark_grey(), msg);
        }
    }

    fn success(&self, msg: &str) {
        if !self.quiet {
            println!("{} {}", self.icons.success.green(), msg.green());
        }
    }

    fn warning(&self, msg: &str) {
        eprintln!("{} {}", self.icons.warning.yellow(), msg.yellow());
    }

    fn error(&self, msg: &str) {
        eprintln!("{} {}", self.icons.error.red(), msg.red());
    }
}
