//! AAD CLI - Command Line Front End for the Differentiation Engine
//!
//! # Commands
//!
//! - `aad scenarios` - Differentiate the reference expressions
//! - `aad demo` - Pathwise Greeks of a discounted forward
//! - `aad check` - Print the resolved configuration
//!
//! # Architecture
//!
//! As the service layer over `aad_core`, this crate owns everything the core
//! leaves to its caller: tracing subscriber setup, configuration loading and
//! output rendering.

use anyhow::Context;
use clap::{Parser, Subcommand};
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

mod commands;
mod config;
mod error;

pub use error::{CliError, Result};

use commands::OutputFormat;

/// Reverse-mode AAD on Monte Carlo random variables
#[derive(Parser)]
#[command(name = "aad")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Configuration file path
    #[arg(short, long, global = true, default_value = "aad.toml")]
    config: String,

    /// Output format
    #[arg(short, long, global = true, value_enum, default_value_t = OutputFormat::Table)]
    format: OutputFormat,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Differentiate the reference expressions and print their gradients
    Scenarios,

    /// Price a discounted forward and report delta, vega and rho
    Demo,

    /// Check the resolved configuration
    Check,
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let default_level = if cli.verbose { "debug" } else { "warn" };
    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)))
        .init();

    if cli.verbose {
        info!("Verbose mode enabled");
    }

    let config = config::CliConfig::load(&cli.config)
        .with_context(|| format!("failed to load configuration from {}", cli.config))?;

    match cli.command {
        Commands::Scenarios => commands::scenarios::run(&config.session, cli.format)?,
        Commands::Demo => commands::demo::run(&config.session, &config.demo, cli.format)?,
        Commands::Check => commands::check::run(&config, &cli.config, cli.format)?,
    }
    Ok(())
}
