//! Orion CLI - Command line interface for the Orion coding agent
//!
//! Clones a repository, applies an instruction with an LLM, tests the result
//! and optionally commits and opens a pull request.

mod commands;

use std::process::ExitCode;

use anyhow::Context;
use clap::{Parser, Subcommand};
use orion_core::Config;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use commands::{ClassifyArgs, ConfigArgs, MessageArgs, ResumeArgs, RunArgs, ScanArgs};

/// Orion: an AI coding agent for GitHub repositories
#[derive(Parser, Debug)]
#[command(name = "orion")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Model to use (overrides config and env)
    #[arg(long, global = true, env = "ORION_MODEL")]
    model: Option<String>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Show version information
    Version,

    /// Apply an instruction to a repository
    #[command(visible_alias = "r")]
    Run(RunArgs),

    /// Run a chat-formatted request (URL:, BRANCH:, TASK:)
    Message(MessageArgs),

    /// Continue a checkpointed session
    Resume(ResumeArgs),

    /// Classify an instruction and print the result as JSON
    Classify(ClassifyArgs),

    /// Scan a repository and print the result as JSON
    Scan(ScanArgs),

    /// Show or initialize configuration
    Config(ConfigArgs),
}

#[tokio::main]
async fn main() -> anyhow::Result<ExitCode> {
    let cli = Cli::parse();

    let default_filter = if cli.verbose { "orion=debug" } else { "orion=info" };
    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter)))
        .init();

    let config = Config::load_with_overrides(cli.model.clone(), None)
        .context("Failed to load configuration")?;

    if cli.verbose {
        tracing::info!(
            model = %config.llm.model,
            api_url = %config.llm.api_url,
            "Configuration loaded"
        );
    }

    match cli.command {
        Some(Commands::Version) => {
            println!("orion {}", env!("CARGO_PKG_VERSION"));
        }
        Some(Commands::Run(args)) => return args.execute(&config).await,
        Some(Commands::Message(args)) => return args.execute(&config).await,
        Some(Commands::Resume(args)) => return args.execute(&config).await,
        Some(Commands::Classify(args)) => args.execute()?,
        Some(Commands::Scan(args)) => args.execute()?,
        Some(Commands::Config(args)) => args.execute(&config)?,
        None => {
            println!("Orion - AI coding agent for GitHub repositories");
            println!();
            println!("Use --help for usage information");
        }
    }

    Ok(ExitCode::SUCCESS)
}
