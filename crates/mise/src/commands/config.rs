//! Config command - configuration inspection.

use anyhow::Result;
use clap::{Args, Subcommand};
use mise_config::{Backend, SecretSource};

use super::Context;
use crate::app;

/// Arguments for the config command.
#[derive(Args, Debug)]
pub struct ConfigArgs {
    #[command(subcommand)]
    pub command: ConfigCommand,
}

#[derive(Subcommand, Debug)]
pub enum ConfigCommand {
    /// Show the resolved configuration
    Show,

    /// Show which config files are loaded and their precedence
    Which,
}

/// Run the config command.
pub async fn run(args: ConfigArgs, ctx: &Context) -> Result<()> {
    match args.command {
        ConfigCommand::Show => cmd_show(ctx),
        ConfigCommand::Which => cmd_which(ctx),
    }
}

fn cmd_show(ctx: &Context) -> Result<()> {
    let loaded = app::load_config(ctx)?;
    let config = &loaded.config;

    if ctx.json_output {
        let value = serde_json::json!({
            "llm": redacted(config.llm()),
            "image": config.image(),
            "pipeline": config.pipeline(),
            "storage": {
                "database": config.storage().database_path(),
                "media_root": config.storage().media_root(),
            },
            "worker": config.worker(),
            "sources": loaded.loaded_from(),
            "warnings": loaded.warnings,
        });
        println!("{}", serde_json::to_string_pretty(&value)?);
        return Ok(());
    }

    println!("# Mise Configuration\n");

    let sources = loaded.loaded_from();
    if sources.is_empty() {
        println!("No config files loaded (using defaults)\n");
    } else {
        println!("Config files:");
        for source in &sources {
            println!("  {}", source.display());
        }
        println!();
    }

    let llm = config.llm();
    println!("Text generation:");
    println!("  backend: {}", llm.backend);
    println!("  model:   {}", llm.model);
    println!("  key:     {}", key_status(&llm.backend, llm.api_key.as_deref()));
    println!();

    let image = config.image();
    println!("Image generation:");
    println!("  model:        {}", image.model);
    println!("  aspect ratio: {}", image.aspect_ratio);
    println!();

    let pipeline = config.pipeline();
    println!("Pipeline:");
    println!(
        "  image attempts: {} (backoff unit {}s)",
        pipeline.image_attempts, pipeline.image_backoff_secs
    );
    println!("  history turns:  {}", pipeline.history_turns);
    println!("  knowledge docs: {}", pipeline.knowledge_results);
    println!();

    let storage = config.storage();
    let worker = config.worker();
    println!("Storage:");
    println!("  database:   {}", storage.database_path().display());
    println!("  media root: {}", storage.media_root().display());
    println!();
    println!("Worker:");
    println!("  concurrency: {}", worker.concurrency);
    println!("  queue:       {}", worker.queue_capacity);
    println!();

    if !loaded.warnings.is_empty() {
        println!("Warnings:");
        for w in &loaded.warnings {
            println!("  ⚠ {}", w);
        }
        println!();
    }

    if ctx.verbose {
        println!("---\nRaw config:\n");
        if let Ok(toml_str) = config.to_toml() {
            println!("{}", toml_str);
        }
    }

    Ok(())
}

fn cmd_which(ctx: &Context) -> Result<()> {
    let loaded = app::load_config(ctx)?;

    println!("Config file search order (later overrides earlier):\n");
    for source in &loaded.sources {
        let status = if source.loaded {
            "✓ loaded"
        } else {
            "· not found"
        };
        println!("  {} {}", status, source.path.display());
    }
    println!();
    println!("API keys are read from GEMINI_API_KEY or GOOGLE_API_KEY.");

    Ok(())
}

fn redacted(mut llm: mise_config::LlmConfig) -> mise_config::LlmConfig {
    if llm.api_key.is_some() {
        llm.api_key = Some("********".to_string());
    }
    llm
}

fn key_status(backend: &Backend, config_value: Option<&str>) -> String {
    if !backend.requires_api_key() {
        return "not required".to_string();
    }
    match mise_config::resolve_api_key(backend, config_value) {
        Some(secret) => match secret.source {
            SecretSource::EnvVar(var) => format!("✓ from {var}"),
            SecretSource::ConfigFile => "⚠ plaintext in config file".to_string(),
        },
        None => format!("✗ missing (set {})", backend.env_vars().join(" or ")),
    }
}
