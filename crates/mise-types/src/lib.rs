//! Shared types for the Mise recipe pipeline.
//!
//! Everything here is plain data: products read from the catalog, the
//! recipe-run record that the pipeline mutates, the recipe draft produced by
//! the chef agent, per-step image records and the outcome value returned by
//! an orchestrated run.

pub mod image;
pub mod outcome;
pub mod product;
pub mod recipe;
pub mod run;

use chrono::{DateTime, Utc};

pub use image::GeneratedImage;
pub use outcome::RunOutcome;
pub use product::{NewProduct, Product};
pub use recipe::{Ingredient, RecipeDraft};
pub use run::{ParseStatusError, RecipeRun, RunStatus, Stage, StageTask, TaskState};

/// Identifier of a catalog product.
pub type ProductId = i64;

/// Identifier of a recipe run.
pub type RunId = i64;

/// Timestamp type used across all records.
pub type Timestamp = DateTime<Utc>;

/// Current UTC time.
pub fn now() -> Timestamp {
    Utc::now()
}
