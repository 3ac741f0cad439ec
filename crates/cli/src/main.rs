//! ContReAct CLI: the main entry point.
//!
//! Commands:
//! - `run`: execute an experimental run from a config file
//! - `check`: validate a config and probe the backend
//! - `summarize`: summarize an event log
//! - `assess`: rate a finished run on the PEI scale
//! - `init`: print a starter config

use clap::{Parser, Subcommand};
use std::path::PathBuf;

mod commands;

#[derive(Parser)]
#[command(
    name = "contreact",
    about = "ContReAct: a task-free agent exploring in reflective cycles",
    version,
    author
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Emit diagnostic logs as JSON
    #[arg(long, global = true)]
    json_logs: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the agent for the configured number of cycles
    Run {
        /// Run configuration file
        #[arg(short, long, env = "CONTREACT_CONFIG", default_value = "contreact.toml")]
        config: PathBuf,
    },

    /// Validate configuration and check the backend and model
    Check {
        #[arg(short, long, env = "CONTREACT_CONFIG", default_value = "contreact.toml")]
        config: PathBuf,
    },

    /// Print totals and a per-cycle breakdown of an event log
    Summarize {
        /// Path to a `<run_id>.jsonl` event log
        log: PathBuf,
    },

    /// Ask an evaluator model to rate a finished run on the PEI scale
    Assess {
        /// Path to the run's event log
        #[arg(long)]
        log: PathBuf,

        /// Model that answers the assessment (e.g. llama3:latest)
        #[arg(long)]
        evaluator: String,

        /// Where to write the assessment JSON
        #[arg(long)]
        output: PathBuf,

        /// Ollama server
        #[arg(long, env = "CONTREACT_OLLAMA_HOST", default_value = "http://localhost:11434")]
        host: String,
    },

    /// Print a starter configuration to stdout
    Init,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    // Initialize tracing
    let filter = if cli.verbose { "debug" } else { "info" };
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(filter));
    let builder = tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_target(false)
        .with_writer(std::io::stderr);
    if cli.json_logs {
        builder.json().init();
    } else {
        builder.init();
    }

    match cli.command {
        Commands::Run { config } => commands::run::run(&config).await?,
        Commands::Check { config } => commands::check::run(&config).await?,
        Commands::Summarize { log } => commands::summarize::run(&log)?,
        Commands::Assess {
            log,
            evaluator,
            output,
            host,
        } => commands::assess::run(&log, &evaluator, &output, &host).await?,
        Commands::Init => commands::init::run(),
    }

    Ok(())
}
