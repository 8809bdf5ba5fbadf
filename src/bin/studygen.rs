//! studygen CLI binary
//!
//! Reads a request as JSON, runs it through the generation pipeline and prints
//! the result JSON on stdout. Failures print an error payload on stdout and
//! exit with `4` or `5` depending on the HTTP status class, or `2` when the
//! request JSON does not decode.

use anyhow::Context;
use clap::Parser;
use std::process;
use studygen::cli::{map_error, Cli, CommandError, RunContext};
use studygen::config::{ConfigLoader, StudygenConfig};
use studygen::error::ApiError;
use studygen::error_contract::TraceId;
use studygen::logging::{init_logging, LoggingConfig};
use tracing::{error, info};

fn main() {
    let cli = Cli::parse();
    let trace_id = TraceId::from_header(cli.trace_id.as_deref());

    let config = load_config(&cli);
    let logging_config = build_logging_config(&cli, config.as_ref().ok());
    if let Err(e) = init_logging(Some(&logging_config)) {
        eprintln!("Failed to initialize logging: {}", e);
        process::exit(1);
    }

    info!(trace_id = %trace_id, "studygen starting");

    let result = config.map_err(CommandError::from).and_then(|config| {
        let context = RunContext::from_config(config, cli.fixture.as_deref(), trace_id.clone())?;
        run(&context, &cli)
    });

    match result {
        Ok(output) => println!("{}", output),
        Err(e) => {
            error!(trace_id = %trace_id, error = %e, "Command failed");
            let (payload, code) = map_error(&e, &trace_id);
            match serde_json::to_string_pretty(&payload) {
                Ok(text) => println!("{}", text),
                Err(_) => eprintln!("{}", e),
            }
            process::exit(code);
        }
    }
}

fn load_config(cli: &Cli) -> Result<StudygenConfig, ApiError> {
    let working_dir = std::env::current_dir()?;
    ConfigLoader::new(working_dir).with_file(cli.config.clone()).load()
}

fn run(context: &RunContext, cli: &Cli) -> Result<String, CommandError> {
    let runtime = build_runtime(context.config().ai.max_concurrency).map_err(|e| {
        ApiError::IoError(std::io::Error::new(
            std::io::ErrorKind::Other,
            format!("{:#}", e),
        ))
    })?;
    runtime.block_on(context.execute(&cli.command))
}

fn build_runtime(max_concurrency: usize) -> anyhow::Result<tokio::runtime::Runtime> {
    tokio::runtime::Builder::new_multi_thread()
        .worker_threads(max_concurrency.clamp(1, 8))
        .enable_all()
        .build()
        .context("failed to start async runtime")
}

/// Logging configuration from the config file, overridden by CLI flags.
fn build_logging_config(cli: &Cli, config: Option<&StudygenConfig>) -> LoggingConfig {
    let mut logging = config.map(|c| c.logging.clone()).unwrap_or_default();

    if cli.quiet {
        logging.enabled = false;
    }
    if cli.verbose {
        logging.level = "debug".to_string();
    }
    if let Some(ref level) = cli.log_level {
        logging.level = level.clone();
    }
    if let Some(ref format) = cli.log_format {
        logging.format = format.clone();
    }
    if let Some(ref output) = cli.log_output {
        logging.output = output.clone();
    }
    logging
}
