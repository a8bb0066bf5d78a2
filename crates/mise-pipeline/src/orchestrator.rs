//! Sequences one recipe run through its three stages.
//!
//! ```text
//! pending ─► generating_recipe ─► generating_images ─► generating_html ─► done
//!                  │                     │                    │
//!                  └─────────────────────┴────────────────────┴──► error
//! ```
//!
//! A missing image never fails a run: a step whose attempts are exhausted
//! is left without an image and the run continues. Any other failure marks
//! the run `error` and is reported in the returned [`RunOutcome`].

use std::path::{Path, PathBuf};
use std::sync::Arc;

use mise_llm::{SessionMemory, SharedBackend};
use mise_store::{KnowledgeBase, MediaStore, RecipeRepository};
use mise_types::{Product, RecipeDraft, RecipeRun, RunId, RunOutcome, RunStatus, Stage};
use tracing::Instrument;

use crate::agents::{ChefAgent, LayoutAgent, PhotographerAgent};
use crate::artifacts::ArtifactStore;
use crate::error::{PipelineError, Result};
use crate::prompt;
use crate::retry::RetryPolicy;
use crate::tracker::StatusTracker;

/// Session token shared by every agent call of one run.
pub fn session_token(run_id: RunId) -> String {
    let nonce = uuid::Uuid::new_v4().simple().to_string();
    format!("recipe_{run_id}_{}", &nonce[..8])
}

/// URL under which a stored file is served, rooted at `/`.
pub fn media_url(path: &Path) -> String {
    let path = path.to_string_lossy().replace('\\', "/");
    format!("/{}", path.trim_start_matches('/'))
}

/// Failure of a run, tagged with the stage that was in progress.
struct StageFailure {
    stage: Option<Stage>,
    error: PipelineError,
}

trait InStage<T> {
    fn in_stage(self, stage: Stage) -> std::result::Result<T, StageFailure>;
}

impl<T> InStage<T> for Result<T> {
    fn in_stage(self, stage: Stage) -> std::result::Result<T, StageFailure> {
        self.map_err(|error| StageFailure {
            stage: Some(stage),
            error,
        })
    }
}

pub struct Orchestrator {
    repo: Arc<dyn RecipeRepository>,
    tracker: StatusTracker,
    artifacts: ArtifactStore,
    chef: ChefAgent,
    photographer: PhotographerAgent,
    layout: LayoutAgent,
    memory: Arc<SessionMemory>,
    retry: RetryPolicy,
}

impl Orchestrator {
    pub fn builder() -> OrchestratorBuilder {
        OrchestratorBuilder::new()
    }

    pub fn repository(&self) -> &Arc<dyn RecipeRepository> {
        &self.repo
    }

    pub fn retry_policy(&self) -> RetryPolicy {
        self.retry
    }

    /// Run every stage for `run_id` and report how it ended.
    ///
    /// An unknown or already finished run is reported as an error outcome
    /// without touching the store. This never returns early with a panic or an `Err`: all
    /// failures end up in the outcome.
    pub async fn execute(
        &self,
        run_id: RunId,
        product: &Product,
        description: Option<&str>,
    ) -> RunOutcome {
        let run = match self.repo.get_run(run_id) {
            Ok(run) => run,
            Err(e) => {
                let error = PipelineError::for_run(run_id, e);
                tracing::warn!(run_id, error = %error, "cannot execute run");
                return RunOutcome::failed(run_id, error.to_string());
            }
        };
        if run.status.is_terminal() {
            tracing::warn!(run_id, status = %run.status, "run already finished");
            return RunOutcome::failed(
                run_id,
                format!("recipe run {run_id} already finished ({})", run.status),
            );
        }
        if run.product_id != product.id {
            tracing::warn!(
                run_id,
                run_product = run.product_id,
                product_id = product.id,
                "run belongs to a different product"
            );
        }

        let session_id = session_token(run_id);
        let span = tracing::info_span!("run", run_id, session_id = %session_id);

        let result = self
            .run_stages(&run, product, description, &session_id)
            .instrument(span)
            .await;
        self.memory.forget(&session_id);

        match result {
            Ok((steps, images)) => {
                tracing::info!(run_id, steps, images, "run complete");
                RunOutcome::Done {
                    run_id,
                    steps,
                    images,
                }
            }
            Err(failure) => {
                let message = failure.error.to_string();
                tracing::error!(
                    run_id,
                    stage = failure.stage.map(|s| s.as_str()),
                    error = %message,
                    "run failed"
                );
                self.tracker.fail(run_id, failure.stage, &message);
                RunOutcome::failed(run_id, message)
            }
        }
    }

    /// Returns the number of steps and of images produced.
    async fn run_stages(
        &self,
        run: &RecipeRun,
        product: &Product,
        description: Option<&str>,
        session_id: &str,
    ) -> std::result::Result<(usize, usize), StageFailure> {
        let draft = self
            .recipe_stage(run.id, product, description, session_id)
            .await
            .in_stage(Stage::Recipe)?;

        let images = self
            .image_stage(run.id, product, &draft, session_id)
            .await
            .in_stage(Stage::Images)?;
        let produced = images.iter().flatten().count();

        self.html_stage(run.id, product, &draft, &images, session_id)
            .await
            .in_stage(Stage::Html)?;

        self.tracker
            .set_status(run.id, RunStatus::Done)
            .map_err(|error| StageFailure { stage: None, error })?;

        Ok((draft.steps.len(), produced))
    }

    async fn recipe_stage(
        &self,
        run_id: RunId,
        product: &Product,
        description: Option<&str>,
        session_id: &str,
    ) -> Result<RecipeDraft> {
        self.tracker.begin(run_id, Stage::Recipe)?;

        let prompt = prompt::build_recipe_prompt(product, description)?;
        let topic = product.display_name();
        let draft = self
            .chef
            .generate_recipe(&prompt, session_id, Some(&topic))
            .await?;
        if draft.is_empty() {
            tracing::warn!(run_id, "recipe has no ingredients and no steps");
        }
        self.artifacts.save_recipe(run_id, &draft)?;

        self.tracker.complete(run_id, Stage::Recipe)?;
        Ok(draft)
    }

    /// Generate one image per step, in step order. Returns one entry per
    /// step: the stored relative path, or `None` when the step got no image.
    async fn image_stage(
        &self,
        run_id: RunId,
        product: &Product,
        draft: &RecipeDraft,
        session_id: &str,
    ) -> Result<Vec<Option<PathBuf>>> {
        self.tracker.begin(run_id, Stage::Images)?;

        let total = draft.steps.len();
        let mut stored = Vec::with_capacity(total);
        for (step_index, step) in draft.steps.iter().enumerate() {
            let prompt = prompt::build_image_prompt(step, step_index, total, product)?;
            let prompt = prompt.as_str();

            let generated = self
                .retry
                .run(|attempt| {
                    tracing::debug!(run_id, step_index, attempt, "generating step image");
                    // The product photo is never sent as a reference image
                    self.photographer.generate_image(prompt, session_id, None)
                })
                .await;

            let path = match generated {
                Ok(Some(bytes)) => {
                    let image = self
                        .artifacts
                        .save_image(run_id, step_index, &bytes, prompt)?;
                    Some(image.path)
                }
                Ok(None) => {
                    tracing::warn!(run_id, step_index, "backend returned no image for step");
                    None
                }
                Err(e) => {
                    tracing::error!(run_id, step_index, error = %e, "giving up on step image");
                    None
                }
            };
            stored.push(path);
        }

        self.tracker.complete(run_id, Stage::Images)?;
        Ok(stored)
    }

    async fn html_stage(
        &self,
        run_id: RunId,
        product: &Product,
        draft: &RecipeDraft,
        images: &[Option<PathBuf>],
        session_id: &str,
    ) -> Result<()> {
        self.tracker.begin(run_id, Stage::Html)?;

        let product_image = product.reference_image.as_deref().map(media_url);
        let step_images: Vec<Option<String>> = images
            .iter()
            .map(|path| path.as_deref().map(media_url))
            .collect();

        let prompt = prompt::build_html_prompt(
            product,
            &draft.ingredients,
            &draft.steps,
            product_image.as_deref(),
            &step_images,
        )?;
        let html = self.layout.generate_html(&prompt, session_id).await?;
        if html.is_empty() {
            tracing::warn!(run_id, "layout agent returned an empty page");
        }
        self.artifacts.save_html(run_id, &html)?;

        self.tracker.complete(run_id, Stage::Html)?;
        Ok(())
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Builder
// ─────────────────────────────────────────────────────────────────────────────

/// Assembles an [`Orchestrator`] from its collaborators.
pub struct OrchestratorBuilder {
    repo: Option<Arc<dyn RecipeRepository>>,
    media: Option<MediaStore>,
    text_backend: Option<SharedBackend>,
    image_backend: Option<SharedBackend>,
    knowledge: Option<Arc<dyn KnowledgeBase>>,
    knowledge_results: usize,
    history_turns: usize,
    retry: RetryPolicy,
}

impl OrchestratorBuilder {
    pub fn new() -> Self {
        Self {
            repo: None,
            media: None,
            text_backend: None,
            image_backend: None,
            knowledge: None,
            knowledge_results: 5,
            history_turns: 3,
            retry: RetryPolicy::default(),
        }
    }

    pub fn with_repository(mut self, repo: Arc<dyn RecipeRepository>) -> Self {
        self.repo = Some(repo);
        self
    }

    pub fn with_media(mut self, media: MediaStore) -> Self {
        self.media = Some(media);
        self
    }

    /// Backend for the chef and layout agents.
    pub fn with_text_backend(mut self, backend: SharedBackend) -> Self {
        self.text_backend = Some(backend);
        self
    }

    /// Backend for the photographer. Defaults to the text backend.
    pub fn with_image_backend(mut self, backend: SharedBackend) -> Self {
        self.image_backend = Some(backend);
        self
    }

    pub fn with_knowledge(mut self, knowledge: Arc<dyn KnowledgeBase>, results: usize) -> Self {
        self.knowledge = Some(knowledge);
        self.knowledge_results = results;
        self
    }

    /// Exchanges replayed to each agent call within a run.
    pub fn with_history_turns(mut self, turns: usize) -> Self {
        self.history_turns = turns;
        self
    }

    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    pub fn build(self) -> Result<Orchestrator> {
        let repo = self
            .repo
            .ok_or_else(|| PipelineError::InvalidInput("a repository is required".to_string()))?;
        let media = self
            .media
            .ok_or_else(|| PipelineError::InvalidInput("a media store is required".to_string()))?;
        let text_backend = self.text_backend.ok_or_else(|| {
            PipelineError::InvalidInput("a text backend is required".to_string())
        })?;
        let image_backend = self.image_backend.unwrap_or_else(|| text_backend.clone());

        let memory = Arc::new(SessionMemory::new(self.history_turns));
        let mut chef = ChefAgent::new(text_backend.clone(), memory.clone());
        if let Some(knowledge) = self.knowledge {
            chef = chef.with_knowledge(knowledge, self.knowledge_results);
        }

        Ok(Orchestrator {
            tracker: StatusTracker::new(repo.clone()),
            artifacts: ArtifactStore::new(repo.clone(), media),
            chef,
            photographer: PhotographerAgent::new(image_backend, memory.clone()),
            layout: LayoutAgent::new(text_backend, memory.clone()),
            memory,
            retry: self.retry,
            repo,
        })
    }
}

impl Default for OrchestratorBuilder {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mise_llm::MockBackend;
    use mise_store::RecipeStore;

    #[test]
    fn test_session_token_format() {
        let token = session_token(12);
        assert!(token.starts_with("recipe_12_"));
        assert_eq!(token.len(), "recipe_12_".len() + 8);
        assert_ne!(token, session_token(12));
    }

    #[test]
    fn test_media_url() {
        assert_eq!(
            media_url(Path::new("media/recipes/1/step_0.png")),
            "/media/recipes/1/step_0.png"
        );
        assert_eq!(media_url(Path::new("/catalog/a.png")), "/catalog/a.png");
    }

    #[test]
    fn test_builder_requires_collaborators() {
        assert!(Orchestrator::builder().build().is_err());

        let store = Arc::new(RecipeStore::open_in_memory().unwrap());
        let missing_backend = Orchestrator::builder()
            .with_repository(store.clone())
            .with_media(MediaStore::new("."))
            .build();
        assert!(missing_backend.is_err());

        let orchestrator = Orchestrator::builder()
            .with_repository(store)
            .with_media(MediaStore::new("."))
            .with_text_backend(Arc::new(MockBackend::new()))
            .build()
            .unwrap();
        assert_eq!(orchestrator.retry_policy(), RetryPolicy::default());
    }
}
