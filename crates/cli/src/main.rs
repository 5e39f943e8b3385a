//! Talaria CLI
//!
//! Runs a single diagnostic prediction against the deployed Vertex AI
//! sensor model, narrating each step, and helps prepare input files.

mod commands;
mod config;
mod output;

use anyhow::Result;
use clap::{Parser, Subcommand};
use commands::{run, status, template};
use std::path::PathBuf;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Talaria Vertex AI probe
#[derive(Parser)]
#[command(name = "talaria")]
#[command(author, version, about = "Vertex AI prediction probe for the Talaria sensor model", long_about = None)]
pub struct Cli {
    /// Output format
    #[arg(long, short, global = true, default_value = "table")]
    pub format: output::OutputFormat,

    /// Enable debug logging on stderr
    #[arg(long, short, global = true)]
    pub verbose: bool,

    /// Emit logs as JSON
    #[arg(long, global = true)]
    pub log_json: bool,

    /// Configuration file (replaces ./talaria.toml)
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Defaults to `run` when omitted
    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Send one sensor window to the endpoint and interpret the result
    Run(run::RunArgs),

    /// Print a CSV input template
    Template {
        /// Write the template to a file instead of stdout
        #[arg(long, short)]
        output: Option<PathBuf>,
    },

    /// Show the resolved configuration
    Config,
}

fn init_tracing(verbose: bool, json: bool) {
    let filter = if verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"))
    };
    let registry = tracing_subscriber::registry().with(filter);

    if json {
        registry
            .with(fmt::layer().json().with_writer(std::io::stderr))
            .init();
    } else {
        registry
            .with(fmt::layer().with_writer(std::io::stderr))
            .init();
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose, cli.log_json);

    match cli.command.unwrap_or(Commands::Run(run::RunArgs::default())) {
        Commands::Run(args) => {
            let settings = config::Settings::load(cli.config.as_deref())?;
            run::run_probe(&settings, args, cli.format).await?;
        }
        Commands::Template { output } => {
            template::write_template(output.as_deref())?;
        }
        Commands::Config => {
            let settings = config::Settings::load(cli.config.as_deref())?;
            status::show_config(&settings, cli.format)?;
        }
    }

    Ok(())
}
