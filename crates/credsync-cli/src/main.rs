//! credsync - resolve provider credentials into rendered secrets

mod cli;
mod commands;
mod specs;
mod watch;

use std::sync::Arc;

use clap::Parser;

use credsync_core::logging::{log_file_path, LogLevel};
use credsync_core::{log_debug, ConsoleLogger, ControllerConfig, SharedLogger};

use cli::Cli;
use commands::{console_level, execute, Context};

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let config = match ControllerConfig::load(cli.config.as_deref()) {
        Ok(config) => config,
        Err(e) => fail(&format!("failed to load config: {}", e)),
    };

    let configured = if cli.verbose {
        LogLevel::Debug
    } else {
        config.log_level().unwrap_or_else(|e| fail(&e.to_string()))
    };
    let logger: SharedLogger =
        Arc::new(ConsoleLogger::new().with_level(console_level(&cli.command, configured)));
    log_debug!(
        logger,
        "provider traffic is written to {} when CREDSYNC_DEBUG=1",
        log_file_path().display()
    );

    let ctx = match Context::connect(config, cli.fixture.as_deref(), logger).await {
        Ok(ctx) => ctx,
        Err(e) => fail(&format!("startup failed: {}", e)),
    };

    if let Err(e) = execute(cli.command, ctx).await {
        fail(&e.to_string());
    }
}

fn fail(message: &str) -> ! {
    eprintln!("credsync: {}", message);
    std::process::exit(1);
}
