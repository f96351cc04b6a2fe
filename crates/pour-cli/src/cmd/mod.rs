//! Command implementations, one module per subcommand.

pub mod check_update;
pub mod info;
pub mod ingest;
pub mod install;
pub mod list;
pub mod uninstall;
pub mod upgrade;
