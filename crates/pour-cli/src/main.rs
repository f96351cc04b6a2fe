//! pour CLI

use std::process::ExitCode;

use clap::Parser;
use pour_core::Reporter;
use tracing_subscriber::EnvFilter;

use pour_cli::ui::Output;
use pour_cli::{Cli, Commands, cmd, exit_code};

#[tokio::main]
async fn main() -> ExitCode {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let output = Output::new(cli.quiet);

    let result = match cli.command {
        Commands::Ingest { manifest } => cmd::ingest::ingest(&manifest, output),
        Commands::Install { package, version } => {
            cmd::install::install(&package, version.as_deref(), output).await
        }
        Commands::Upgrade { package } => cmd::upgrade::upgrade(&package, output).await,
        Commands::Uninstall { package, full_zap } => {
            cmd::uninstall::uninstall(&package, full_zap, output).await
        }
        Commands::CheckUpdate { package } => cmd::check_update::check_update(&package, output).await,
        Commands::List => cmd::list::list(output).await,
        Commands::Info { package } => cmd::info::info(&package, output).await,
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            output.error(&format!("{e:#}"));
            ExitCode::from(exit_code(&e))
        }
    }
}
