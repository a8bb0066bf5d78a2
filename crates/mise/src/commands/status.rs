//! Status command - inspect a recipe run.

use anyhow::Result;
use clap::Args;
use console::{Style, style};
use mise_types::{RunId, RunStatus, TaskState};
use serde_json::json;

use super::{Context, truncate};
use crate::app;

/// Arguments for the status command.
#[derive(Args, Debug)]
pub struct StatusArgs {
    /// Recipe run ID
    pub run_id: RunId,
}

/// Run the status command.
pub async fn run(args: StatusArgs, ctx: &Context) -> Result<()> {
    let loaded = app::load_config(ctx)?;
    let store = app::open_store(&loaded.config)?;

    let run = store.get_run(args.run_id)?;
    let ingredients = run.ingredients()?;
    let steps = run.steps()?;
    let images = store.list_images(run.id)?;
    let tasks = store.stage_tasks(run.id)?;

    if ctx.json_output {
        let value = json!({
            "run": run,
            "ingredients": ingredients,
            "steps": steps,
            "images": images,
            "stages": tasks,
        });
        println!("{}", serde_json::to_string_pretty(&value)?);
        return Ok(());
    }

    let dim = Style::new().dim();
    let status_style = match run.status {
        RunStatus::Done => Style::new().green(),
        RunStatus::Error => Style::new().red(),
        _ => Style::new().yellow(),
    };

    println!("{}", style(format!("Run {}", run.id)).bold());
    println!("{}", dim.apply_to("─".repeat(50)));
    println!("  Product:     {}", run.product_id);
    println!("  Status:      {}", status_style.apply_to(run.status));
    println!("  Ingredients: {}", ingredients.len());
    println!("  Steps:       {}", steps.len());
    println!("  Images:      {}", images.len());
    println!(
        "  Page:        {}",
        match &run.html {
            Some(html) => format!("{} bytes", html.len()),
            None => "-".to_string(),
        }
    );
    println!("  Updated:     {}", run.updated_at.format("%Y-%m-%d %H:%M:%S"));

    if !tasks.is_empty() {
        println!();
        println!("{}", style("Stages").bold());
        for task in &tasks {
            let marker = match task.state {
                TaskState::Done => Style::new().green().apply_to("✓"),
                TaskState::Error => Style::new().red().apply_to("✗"),
                TaskState::Running => Style::new().yellow().apply_to("…"),
            };
            match &task.error {
                Some(error) => println!("  {marker} {:<8} {}", task.stage, truncate(error, 60)),
                None => println!("  {marker} {}", task.stage),
            }
        }
    }

    if ctx.verbose && !steps.is_empty() {
        println!();
        println!("{}", style("Steps").bold());
        for (i, step) in steps.iter().enumerate() {
            let image = images
                .iter()
                .find(|img| img.step_index == i)
                .map(|img| img.path.display().to_string())
                .unwrap_or_else(|| "no image".to_string());
            println!("  {}. {}", i + 1, truncate(step, 60));
            println!("     {}", dim.apply_to(image));
        }
    } else if !images.is_empty() {
        println!();
        for image in &images {
            println!("  {}", dim.apply_to(image.path.display()));
        }
    }

    Ok(())
}
