//! Run command - generate recipes for catalog products.

use anyhow::{Result, bail};
use clap::Args;
use console::Style;
use mise_types::{ProductId, RunOutcome};
use tokio::task::JoinSet;

use super::Context;
use crate::app;

/// Arguments for the run command.
#[derive(Args, Debug)]
pub struct RunArgs {
    /// Products to generate recipes for, one run each
    #[arg(required = true)]
    pub product_ids: Vec<ProductId>,

    /// What the recipe should be (overrides the product description)
    #[arg(short, long)]
    pub description: Option<String>,
}

/// Run the run command.
pub async fn run(args: RunArgs, ctx: &Context) -> Result<()> {
    let loaded = app::load_config(ctx)?;
    let store = app::open_store(&loaded.config)?;
    let pipeline = app::pipeline(&loaded.config, store)?;
    let dim = Style::new().dim();

    // A rejected submission stops further submissions, but runs already
    // queued are still drained before the error is returned.
    let mut submit_error = None;
    let mut waiting = JoinSet::new();
    for product_id in args.product_ids {
        let submission = match pipeline
            .submit(product_id, args.description.clone())
            .await
        {
            Ok(submission) => submission,
            Err(e) => {
                submit_error = Some(
                    anyhow::Error::from(e)
                        .context(format!("failed to submit product {product_id}")),
                );
                break;
            }
        };
        if !ctx.json_output {
            println!(
                "{}",
                dim.apply_to(format!(
                    "Run {} queued for product {product_id}",
                    submission.run.id
                ))
            );
        }
        waiting.spawn(submission.wait());
    }

    let mut failed = 0;
    while let Some(joined) = waiting.join_next().await {
        let outcome = match joined {
            Ok(outcome) => outcome,
            Err(e) => {
                tracing::error!(error = %e, "run task did not finish");
                failed += 1;
                continue;
            }
        };
        if !outcome.is_done() {
            failed += 1;
        }
        if let Err(e) = print_outcome(&outcome, ctx) {
            tracing::warn!(run_id = outcome.run_id(), error = %e, "cannot print outcome");
        }
    }
    pipeline.shutdown().await;

    if let Some(e) = submit_error {
        return Err(e);
    }
    if failed > 0 {
        bail!("{failed} run(s) failed");
    }
    Ok(())
}

fn print_outcome(outcome: &RunOutcome, ctx: &Context) -> Result<()> {
    if ctx.json_output {
        println!("{}", serde_json::to_string(outcome)?);
        return Ok(());
    }

    match outcome {
        RunOutcome::Done {
            run_id,
            steps,
            images,
        } => {
            let green = Style::new().green();
            println!(
                "{} Run {run_id} done: {steps} steps, {images} images",
                green.apply_to("✓")
            );
        }
        RunOutcome::Error { run_id, error } => {
            let red = Style::new().red();
            eprintln!("{} Run {run_id} failed: {error}", red.apply_to("✗"));
        }
    }
    Ok(())
}
