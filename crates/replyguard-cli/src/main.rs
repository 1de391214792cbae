//! ReplyGuard CLI
//!
//! Moderates draft replies against a compliance rule set before they are
//! delivered to an end user.
//!
//! Requests are JSON objects with `user_state`, `draft_reply` and optional
//! inline `rules`, read from a file or stdin. Results are written to stdout
//! as JSON; logs go to stderr.

use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::process::ExitCode;
use tracing::{info, warn};

mod commands;
mod config;

use config::{CliConfig, LogFormat};

/// Exit code for input that failed validation
const EXIT_INVALID_INPUT: u8 = 2;

#[derive(Parser, Debug)]
#[command(name = "replyguard")]
#[command(about = "Deterministic compliance moderation for outbound replies", long_about = None)]
struct Cli {
    /// Configuration file path
    #[arg(short, long, default_value = "replyguard.yaml", env = "REPLYGUARD_CONFIG")]
    config: String,

    /// Rule set file (JSON or YAML), overrides the config
    #[arg(short, long)]
    rules: Option<String>,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Moderate a complete draft reply
    Moderate {
        /// Request file; reads stdin when omitted
        input: Option<PathBuf>,
    },

    /// Moderate a draft reply fed in chunks, as if streamed
    Stream {
        /// Request file; reads stdin when omitted
        input: Option<PathBuf>,

        /// Characters per chunk
        #[arg(long)]
        chunk_size: Option<usize>,
    },
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    let config = match CliConfig::load(&cli.config, &cli) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("error: failed to load configuration: {:#}", e);
            return ExitCode::FAILURE;
        }
    };

    // Initialize tracing
    init_tracing(cli.verbose, config.log_format);

    match run(&cli, &config) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => report(&e),
    }
}

fn run(cli: &Cli, config: &CliConfig) -> Result<()> {
    match &cli.command {
        Command::Moderate { input } => {
            let mut request = commands::read_request(input.as_deref())?;
            let engine = commands::resolve_rules(&mut request, config)?;

            let result = commands::moderate(&engine, &request, &mut std::io::stdout().lock())?;
            info!(status = %result.status, rules = result.applied_rules.len(), "Reply moderated");
        }

        Command::Stream { input, .. } => {
            let mut request = commands::read_request(input.as_deref())?;
            let engine = commands::resolve_rules(&mut request, config)?;

            let result = commands::stream(
                &engine,
                &request,
                config.chunk_size,
                &mut std::io::stdout().lock(),
            )?;
            info!(status = %result.status, chunk_size = config.chunk_size, "Streamed reply moderated");
        }
    }

    Ok(())
}

/// Print an error and pick the exit code
fn report(err: &anyhow::Error) -> ExitCode {
    let violations = err
        .downcast_ref::<replyguard_core::Error>()
        .map(|e| e.violations())
        .unwrap_or_default();

    if violations.is_empty() {
        eprintln!("error: {:#}", err);
        return ExitCode::FAILURE;
    }

    warn!(violations = violations.len(), "Rejected invalid input");
    eprintln!("error: invalid input ({} violations)", violations.len());
    for violation in violations {
        eprintln!("  {}", violation);
    }

    ExitCode::from(EXIT_INVALID_INPUT)
}

/// Initialize tracing/logging on stderr
fn init_tracing(verbose: bool, format: LogFormat) {
    use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

    let filter = if verbose {
        EnvFilter::new("replyguard=debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("replyguard=info"))
    };

    let registry = tracing_subscriber::registry().with(filter);

    match format {
        LogFormat::Text => registry
            .with(fmt::layer().with_writer(std::io::stderr))
            .init(),
        LogFormat::Json => registry
            .with(fmt::layer().json().with_writer(std::io::stderr))
            .init(),
    }
}
