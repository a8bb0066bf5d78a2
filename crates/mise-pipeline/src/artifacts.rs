//! Persistence of everything a run produces.

use std::sync::Arc;

use mise_store::{MediaStore, RecipeRepository};
use mise_types::{GeneratedImage, RecipeDraft, RecipeRun, RunId};

use crate::error::{PipelineError, Result};

/// Writes recipe lists, step images and the final page for a run.
///
/// Every write replaces what an earlier attempt left behind: a step has at
/// most one image file and one image record.
#[derive(Clone)]
pub struct ArtifactStore {
    repo: Arc<dyn RecipeRepository>,
    media: MediaStore,
}

impl ArtifactStore {
    pub fn new(repo: Arc<dyn RecipeRepository>, media: MediaStore) -> Self {
        Self { repo, media }
    }

    pub fn save_recipe(&self, run_id: RunId, draft: &RecipeDraft) -> Result<RecipeRun> {
        self.repo
            .save_artifacts(run_id, &draft.ingredients, &draft.steps)
            .map_err(|e| PipelineError::for_run(run_id, e))
    }

    /// Write the image file, then upsert its record.
    pub fn save_image(
        &self,
        run_id: RunId,
        step_index: usize,
        bytes: &[u8],
        prompt: &str,
    ) -> Result<GeneratedImage> {
        let path = self.media.save_image(run_id, step_index, bytes)?;
        let image = self
            .repo
            .record_image(run_id, step_index, &path, Some(prompt), None)?;
        Ok(image)
    }

    pub fn save_html(&self, run_id: RunId, html: &str) -> Result<RecipeRun> {
        self.repo
            .save_html(run_id, html)
            .map_err(|e| PipelineError::for_run(run_id, e))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mise_store::RecipeStore;
    use mise_types::{Ingredient, NewProduct};
    use tempfile::TempDir;

    fn setup() -> (TempDir, Arc<RecipeStore>, ArtifactStore, RunId) {
        let dir = TempDir::new().unwrap();
        let store = Arc::new(RecipeStore::open_in_memory().unwrap());
        let product = store.create_product(&NewProduct::new("Flour")).unwrap();
        let run = store.create_run(product.id).unwrap();
        let artifacts = ArtifactStore::new(store.clone(), MediaStore::new(dir.path()));
        (dir, store, artifacts, run.id)
    }

    #[test]
    fn test_save_recipe() {
        let (_dir, _store, artifacts, run_id) = setup();
        let draft = RecipeDraft {
            ingredients: vec![Ingredient::new("Flour", "200", "g")],
            steps: vec!["Sift".to_string()],
        };
        let run = artifacts.save_recipe(run_id, &draft).unwrap();
        assert_eq!(run.ingredients().unwrap(), draft.ingredients);
        assert_eq!(run.steps().unwrap(), draft.steps);
    }

    #[test]
    fn test_save_image_twice_keeps_one_file_and_record() {
        let (dir, store, artifacts, run_id) = setup();

        artifacts.save_image(run_id, 0, b"first", "p1").unwrap();
        let image = artifacts.save_image(run_id, 0, b"second", "p2").unwrap();

        assert_eq!(image.prompt_meta.as_deref(), Some("p2"));
        let records = store.list_images(run_id).unwrap();
        assert_eq!(records.len(), 1);

        let files: Vec<_> = std::fs::read_dir(dir.path().join(format!("media/recipes/{run_id}")))
            .unwrap()
            .collect();
        assert_eq!(files.len(), 1);
        assert_eq!(
            std::fs::read(dir.path().join(&records[0].path)).unwrap(),
            b"second"
        );
    }

    #[test]
    fn test_save_html_unknown_run() {
        let (_dir, _store, artifacts, _) = setup();
        assert!(matches!(
            artifacts.save_html(404, "<html/>"),
            Err(PipelineError::RunNotFound(404))
        ));
    }
}
