//! cloudtrim CLI - Main entry point.
//!
//! Exit codes:
//! - 0: Success
//! - 1: General error
//! - 2: Invalid arguments or configuration
//! - 3: Inventory collection failure

use std::process::ExitCode;

use clap::Parser;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use cloudtrim_core::CoreError;

mod commands;

use commands::{Cli, Commands, InvalidInput};

/// CI-friendly exit codes
pub struct ExitCodes;

impl ExitCodes {
    pub const SUCCESS: u8 = 0;
    pub const GENERAL_ERROR: u8 = 1;
    pub const INVALID_ARGS: u8 = 2;
    pub const COLLECTION_FAILURE: u8 = 3;
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    init_logging(&cli);

    let result = match cli.command {
        Commands::Analyze(args) => commands::analyze::execute(args).await,
        Commands::Price(args) => commands::price::execute(args).await,
        Commands::Cache(args) => commands::cache::execute(args).await,
    };

    match result {
        Ok(()) => ExitCode::from(ExitCodes::SUCCESS),
        Err(e) => {
            let exit_code = categorize_error(&e);
            eprintln!("❌ Error: {:#}", e);
            ExitCode::from(exit_code)
        }
    }
}

/// Install the tracing subscriber. Logs go to stderr so `--json` output
/// stays machine-readable.
fn init_logging(cli: &Cli) {
    let level = if cli.verbose {
        "debug"
    } else if cli.quiet {
        "error"
    } else {
        "info"
    };
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("warn,cloudtrim={}", level)));

    let json_layer = cli
        .log_json
        .then(|| fmt::layer().json().with_writer(std::io::stderr));
    let text_layer = (!cli.log_json).then(|| {
        fmt::layer()
            .with_target(false)
            .with_writer(std::io::stderr)
    });

    let log_result = tracing_subscriber::registry()
        .with(filter)
        .with(json_layer)
        .with(text_layer)
        .try_init();

    if log_result.is_err() {
        // Logging already initialized, continue
    }
}

/// Categorize error to determine exit code
fn categorize_error(e: &anyhow::Error) -> u8 {
    for cause in e.chain() {
        if cause.downcast_ref::<InvalidInput>().is_some() {
            return ExitCodes::INVALID_ARGS;
        }
        if let Some(core) = cause.downcast_ref::<CoreError>() {
            return match core {
                CoreError::Collection(_) | CoreError::TelemetryUnavailable { .. } => {
                    ExitCodes::COLLECTION_FAILURE
                }
                CoreError::Config(_) => ExitCodes::INVALID_ARGS,
                _ => ExitCodes::GENERAL_ERROR,
            };
        }
    }
    ExitCodes::GENERAL_ERROR
}
