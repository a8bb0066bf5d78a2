//! Knowledge command - reference recipes for the chef agent.

use std::path::PathBuf;

use anyhow::{Context as _, Result, bail};
use clap::{Args, Subcommand};
use console::{Style, style};
use mise_store::KnowledgeBase;

use super::{Context, truncate};
use crate::app;

/// Arguments for the knowledge command.
#[derive(Args, Debug)]
pub struct KnowledgeArgs {
    #[command(subcommand)]
    pub command: KnowledgeCommand,
}

#[derive(Subcommand, Debug)]
pub enum KnowledgeCommand {
    /// Add a reference recipe
    Add {
        /// Document title
        #[arg(long)]
        title: String,

        /// Document text
        #[arg(long, conflicts_with = "file")]
        body: Option<String>,

        /// Read the document text from a file
        #[arg(long)]
        file: Option<PathBuf>,

        /// Where the document came from
        #[arg(long)]
        source: Option<String>,
    },

    /// Search reference recipes
    Search {
        /// Search query
        query: String,

        /// Maximum results
        #[arg(short, long, default_value = "5")]
        limit: usize,
    },
}

/// Run the knowledge command.
pub async fn run(args: KnowledgeArgs, ctx: &Context) -> Result<()> {
    let loaded = app::load_config(ctx)?;
    let store = app::open_store(&loaded.config)?;
    let dim = Style::new().dim();

    match args.command {
        KnowledgeCommand::Add {
            title,
            body,
            file,
            source,
        } => {
            let body = match (body, file) {
                (Some(body), _) => body,
                (None, Some(path)) => std::fs::read_to_string(&path)
                    .with_context(|| format!("failed to read {}", path.display()))?,
                (None, None) => bail!("either --body or --file is required"),
            };
            let doc = store.add_document(&title, &body, source.as_deref())?;

            if ctx.json_output {
                println!("{}", serde_json::to_string_pretty(&doc)?);
            } else {
                let green = Style::new().green();
                println!(
                    "{} Document added: {} {}",
                    green.apply_to("✓"),
                    doc.title,
                    dim.apply_to(format!("(id {})", doc.id))
                );
            }
        }
        KnowledgeCommand::Search { query, limit } => {
            let docs = store.search(&query, limit)?;
            if ctx.json_output {
                println!("{}", serde_json::to_string_pretty(&docs)?);
                return Ok(());
            }

            println!("{}", style("Knowledge Search").bold());
            println!("{}", dim.apply_to("─".repeat(50)));
            if docs.is_empty() {
                println!("{}", dim.apply_to(format!("No documents match \"{query}\"")));
            }
            for doc in &docs {
                println!("{} {}", dim.apply_to(format!("[{}]", doc.id)), doc.title);
                println!("    {}", truncate(&doc.body, 70));
            }
        }
    }

    Ok(())
}
