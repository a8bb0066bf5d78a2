//! Product command - catalog management.

use std::path::PathBuf;

use anyhow::Result;
use clap::{Args, Subcommand};
use console::{Style, style};
use mise_types::NewProduct;

use super::Context;
use crate::app;

/// Arguments for the product command.
#[derive(Args, Debug)]
pub struct ProductArgs {
    #[command(subcommand)]
    pub command: ProductCommand,
}

#[derive(Subcommand, Debug)]
pub enum ProductCommand {
    /// Add a product to the catalog
    Add {
        /// Product name
        #[arg(long)]
        name: String,

        /// Brand shown next to the name
        #[arg(long)]
        brand: Option<String>,

        /// Product type (e.g. dairy, flour)
        #[arg(long)]
        category: Option<String>,

        /// Free-text description
        #[arg(long)]
        description: Option<String>,

        /// Product photo, listed first in the recipe page carousel
        #[arg(long)]
        image: Option<PathBuf>,
    },

    /// List catalog products
    List,
}

/// Run the product command.
pub async fn run(args: ProductArgs, ctx: &Context) -> Result<()> {
    let loaded = app::load_config(ctx)?;
    let store = app::open_store(&loaded.config)?;
    let dim = Style::new().dim();

    match args.command {
        ProductCommand::Add {
            name,
            brand,
            category,
            description,
            image,
        } => {
            let mut new = NewProduct::new(name);
            if let Some(brand) = brand {
                new = new.with_brand(brand);
            }
            if let Some(category) = category {
                new = new.with_category(category);
            }
            if let Some(description) = description {
                new = new.with_description(description);
            }
            if let Some(image) = image {
                new = new.with_reference_image(image);
            }

            let product = store.create_product(&new)?;
            if ctx.json_output {
                println!("{}", serde_json::to_string_pretty(&product)?);
            } else {
                let green = Style::new().green();
                println!(
                    "{} Product added: {} {}",
                    green.apply_to("✓"),
                    product.display_name(),
                    dim.apply_to(format!("(id {})", product.id))
                );
            }
        }
        ProductCommand::List => {
            let products = store.list_products()?;
            if ctx.json_output {
                println!("{}", serde_json::to_string_pretty(&products)?);
                return Ok(());
            }

            println!("{}", style("Products").bold());
            println!("{}", dim.apply_to("─".repeat(50)));
            if products.is_empty() {
                println!("{}", dim.apply_to("No products found"));
            }
            for product in &products {
                let category = product.category.as_deref().unwrap_or("-");
                println!(
                    "{} {:<32} {}",
                    dim.apply_to(format!("[{:>4}]", product.id)),
                    product.display_name(),
                    dim.apply_to(category)
                );
            }
        }
    }

    Ok(())
}
