//! Shared fixtures for pipeline integration tests.
#![allow(dead_code)]

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use mise_llm::MockBackend;
use mise_pipeline::{Orchestrator, RetryPolicy};
use mise_store::{MediaStore, RecipeRepository, RecipeStore, Result, StoreError};
use mise_types::{
    GeneratedImage, Ingredient, NewProduct, Product, ProductId, RecipeRun, RunId, RunStatus,
    Stage, StageTask,
};
use parking_lot::Mutex;
use tempfile::TempDir;

/// Repository that records every status change and can be told to fail
/// persisting the final page.
pub struct RecordingRepository {
    pub inner: RecipeStore,
    statuses: Mutex<Vec<(RunId, RunStatus)>>,
    fail_html: bool,
}

impl RecordingRepository {
    pub fn new() -> Self {
        Self {
            inner: RecipeStore::open_in_memory().unwrap(),
            statuses: Mutex::new(Vec::new()),
            fail_html: false,
        }
    }

    pub fn failing_html() -> Self {
        Self {
            fail_html: true,
            ..Self::new()
        }
    }

    /// Statuses successfully written for `run_id`, in order.
    pub fn statuses(&self, run_id: RunId) -> Vec<RunStatus> {
        self.statuses
            .lock()
            .iter()
            .filter(|(id, _)| *id == run_id)
            .map(|(_, status)| *status)
            .collect()
    }
}

impl RecipeRepository for RecordingRepository {
    fn get_product(&self, id: ProductId) -> Result<Product> {
        self.inner.get_product(id)
    }

    fn create_run(&self, product_id: ProductId) -> Result<RecipeRun> {
        self.inner.create_run(product_id)
    }

    fn get_run(&self, id: RunId) -> Result<RecipeRun> {
        self.inner.get_run(id)
    }

    fn set_status(&self, id: RunId, status: RunStatus) -> Result<RecipeRun> {
        let run = self.inner.set_status(id, status)?;
        self.statuses.lock().push((id, status));
        Ok(run)
    }

    fn save_artifacts(
        &self,
        id: RunId,
        ingredients: &[Ingredient],
        steps: &[String],
    ) -> Result<RecipeRun> {
        self.inner.save_artifacts(id, ingredients, steps)
    }

    fn save_html(&self, id: RunId, html: &str) -> Result<RecipeRun> {
        if self.fail_html {
            return Err(StoreError::Io(std::io::Error::other("disk full")));
        }
        self.inner.save_html(id, html)
    }

    fn record_image(
        &self,
        run_id: RunId,
        step_index: usize,
        path: &Path,
        prompt_meta: Option<&str>,
        seed: Option<&str>,
    ) -> Result<GeneratedImage> {
        self.inner
            .record_image(run_id, step_index, path, prompt_meta, seed)
    }

    fn list_images(&self, run_id: RunId) -> Result<Vec<GeneratedImage>> {
        self.inner.list_images(run_id)
    }

    fn start_stage(&self, run_id: RunId, stage: Stage) -> Result<()> {
        self.inner.start_stage(run_id, stage)
    }

    fn finish_stage(&self, run_id: RunId, stage: Stage, error: Option<&str>) -> Result<()> {
        self.inner.finish_stage(run_id, stage, error)
    }

    fn stage_tasks(&self, run_id: RunId) -> Result<Vec<StageTask>> {
        self.inner.stage_tasks(run_id)
    }
}

pub struct Fixture {
    pub media_dir: TempDir,
    pub repo: Arc<RecordingRepository>,
    pub product: Product,
}

impl Fixture {
    pub fn new() -> Self {
        Self::with_repository(RecordingRepository::new())
    }

    pub fn with_repository(repo: RecordingRepository) -> Self {
        let product = repo
            .inner
            .create_product(
                &NewProduct::new("Condensed Milk")
                    .with_brand("Acme")
                    .with_category("dairy")
                    .with_reference_image("catalog/condensed-milk.png"),
            )
            .unwrap();
        Self {
            media_dir: TempDir::new().unwrap(),
            repo: Arc::new(repo),
            product,
        }
    }

    pub fn new_run(&self) -> RecipeRun {
        self.repo.create_run(self.product.id).unwrap()
    }

    pub fn orchestrator(&self, text: Arc<MockBackend>, image: Arc<MockBackend>) -> Orchestrator {
        Orchestrator::builder()
            .with_repository(self.repo.clone())
            .with_media(MediaStore::new(self.media_dir.path()))
            .with_text_backend(text)
            .with_image_backend(image)
            .with_retry(RetryPolicy::new(3, Duration::from_secs(5)))
            .build()
            .unwrap()
    }
}

/// A chef reply wrapped in a json fence.
pub fn recipe_reply(steps: &[&str]) -> String {
    let body = serde_json::json!({
        "ingredients": [
            {"name": "Condensed Milk Acme", "quantity": "1", "unit": "can"},
            {"name": "Cocoa powder", "quantity": 2, "unit": "tbsp"}
        ],
        "steps": steps,
    });
    format!("Here you go!\n```json\n{body}\n```")
}

pub const PAGE: &str = "```html\n<html><body>carousel</body></html>\n```";
