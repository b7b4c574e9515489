pub mod commands;
pub mod core;

use clap::Parser;
use tracing_subscriber::EnvFilter;

use crate::commands::Cli;

/// Entry point for the binary. Returns the process exit code.
pub fn run() -> i32 {
    let cli = Cli::parse();

    // Initialize structured logging
    let default_filter = if cli.verbose {
        "debug"
    } else {
        "info,serverpack_installer_lib=debug"
    };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter)),
        )
        .with_target(false)
        .init();

    tracing::info!("Server pack installer {} starting...", env!("CARGO_PKG_VERSION"));

    let runtime = match tokio::runtime::Builder::new_multi_thread().enable_all().build() {
        Ok(runtime) => runtime,
        Err(e) => {
            tracing::error!("Failed to start async runtime: {}", e);
            return 1;
        }
    };
    runtime.block_on(commands::execute(cli))
}
