//! Mise - recipe content generation for food catalogs
//!
//! Main entry point for the Mise CLI.

use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand};

mod app;
mod commands;

use commands::{config, knowledge, product, run, status};

// ─────────────────────────────────────────────────────────────────────────────
// CLI Structure
// ─────────────────────────────────────────────────────────────────────────────

/// Mise - generate recipes, step photos and recipe pages for catalog products
#[derive(Parser)]
#[command(name = "mise")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Output as JSON (for scripting)
    #[arg(long, global = true)]
    pub json: bool,

    /// Directory holding config.toml and logs
    #[arg(long, global = true, env = "MISE_CONFIG_DIR")]
    pub config_dir: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Manage catalog products
    Product(product::ProductArgs),

    /// Generate recipes for one or more products
    Run(run::RunArgs),

    /// Show the status of a recipe run
    Status(status::StatusArgs),

    /// Manage the recipe knowledge base
    Knowledge(knowledge::KnowledgeArgs),

    /// Configuration management
    Config(config::ConfigArgs),
}

// ─────────────────────────────────────────────────────────────────────────────
// Main
// ─────────────────────────────────────────────────────────────────────────────

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Console (human-readable, stderr) + daily JSON file
    let filter = if cli.verbose {
        "mise=debug,mise_pipeline=debug,mise_llm=debug,mise_store=debug,mise_config=debug,info"
    } else {
        "mise=info,mise_pipeline=info,mise_llm=warn,mise_store=warn,mise_config=warn,warn"
    };

    let log_dir = cli
        .config_dir
        .clone()
        .or_else(mise_config::user_config_dir)
        .map(|d| d.join("logs"))
        .unwrap_or_else(|| PathBuf::from("logs"));
    let file_appender = tracing_appender::rolling::daily(&log_dir, "mise.log");
    let (non_blocking, _guard) = tracing_appender::non_blocking(file_appender);

    use tracing_subscriber::prelude::*;
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::fmt::layer()
                .with_target(true)
                .with_writer(std::io::stderr)
                .with_filter(tracing_subscriber::EnvFilter::new(filter)),
        )
        .with(
            tracing_subscriber::fmt::layer()
                .json()
                .with_writer(non_blocking)
                .with_filter(tracing_subscriber::EnvFilter::new(
                    "mise=trace,mise_pipeline=trace,mise_llm=trace,mise_store=debug,mise_config=debug,info",
                )),
        )
        .init();

    let ctx = commands::Context {
        json_output: cli.json,
        verbose: cli.verbose,
        config_dir: cli.config_dir,
    };

    match cli.command {
        Commands::Product(args) => product::run(args, &ctx).await,
        Commands::Run(args) => run::run(args, &ctx).await,
        Commands::Status(args) => status::run(args, &ctx).await,
        Commands::Knowledge(args) => knowledge::run(args, &ctx).await,
        Commands::Config(args) => config::run(args, &ctx).await,
    }
}
