//! Persistence seam consumed by the pipeline.
//!
//! ```text
//! RecipeRepository (trait)   - products, runs, images, stage log
//!     └── RecipeStore        - SQLite implementation
//! ```

use std::path::Path;

use mise_types::{
    GeneratedImage, Ingredient, Product, ProductId, RecipeRun, RunId, RunStatus, Stage,
    StageTask,
};

use crate::{RecipeStore, Result};

/// Operations the orchestrator needs from the relational store.
pub trait RecipeRepository: Send + Sync {
    fn get_product(&self, id: ProductId) -> Result<Product>;

    /// Create a `pending` run. Fails with `NotFound` for an unknown product.
    fn create_run(&self, product_id: ProductId) -> Result<RecipeRun>;

    fn get_run(&self, id: RunId) -> Result<RecipeRun>;

    /// Persist a new status and refresh `updated_at`.
    ///
    /// Rejects transitions that would move the lifecycle backwards.
    fn set_status(&self, id: RunId, status: RunStatus) -> Result<RecipeRun>;

    fn save_artifacts(
        &self,
        id: RunId,
        ingredients: &[Ingredient],
        steps: &[String],
    ) -> Result<RecipeRun>;

    fn save_html(&self, id: RunId, html: &str) -> Result<RecipeRun>;

    /// Upsert the image record of one step.
    fn record_image(
        &self,
        run_id: RunId,
        step_index: usize,
        path: &Path,
        prompt_meta: Option<&str>,
        seed: Option<&str>,
    ) -> Result<GeneratedImage>;

    fn list_images(&self, run_id: RunId) -> Result<Vec<GeneratedImage>>;

    fn start_stage(&self, run_id: RunId, stage: Stage) -> Result<()>;

    fn finish_stage(&self, run_id: RunId, stage: Stage, error: Option<&str>) -> Result<()>;

    fn stage_tasks(&self, run_id: RunId) -> Result<Vec<StageTask>>;
}

impl RecipeRepository for RecipeStore {
    fn get_product(&self, id: ProductId) -> Result<Product> {
        RecipeStore::get_product(self, id)
    }

    fn create_run(&self, product_id: ProductId) -> Result<RecipeRun> {
        RecipeStore::create_run(self, product_id)
    }

    fn get_run(&self, id: RunId) -> Result<RecipeRun> {
        RecipeStore::get_run(self, id)
    }

    fn set_status(&self, id: RunId, status: RunStatus) -> Result<RecipeRun> {
        RecipeStore::set_status(self, id, status)
    }

    fn save_artifacts(
        &self,
        id: RunId,
        ingredients: &[Ingredient],
        steps: &[String],
    ) -> Result<RecipeRun> {
        RecipeStore::save_artifacts(self, id, ingredients, steps)
    }

    fn save_html(&self, id: RunId, html: &str) -> Result<RecipeRun> {
        RecipeStore::save_html(self, id, html)
    }

    fn record_image(
        &self,
        run_id: RunId,
        step_index: usize,
        path: &Path,
        prompt_meta: Option<&str>,
        seed: Option<&str>,
    ) -> Result<GeneratedImage> {
        RecipeStore::record_image(self, run_id, step_index, path, prompt_meta, seed)
    }

    fn list_images(&self, run_id: RunId) -> Result<Vec<GeneratedImage>> {
        RecipeStore::list_images(self, run_id)
    }

    fn start_stage(&self, run_id: RunId, stage: Stage) -> Result<()> {
        RecipeStore::start_stage(self, run_id, stage)
    }

    fn finish_stage(&self, run_id: RunId, stage: Stage, error: Option<&str>) -> Result<()> {
        RecipeStore::finish_stage(self, run_id, stage, error)
    }

    fn stage_tasks(&self, run_id: RunId) -> Result<Vec<StageTask>> {
        RecipeStore::stage_tasks(self, run_id)
    }
}
