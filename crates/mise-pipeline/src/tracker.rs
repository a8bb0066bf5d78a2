//! Run status transitions and the per-stage task log.

use std::sync::Arc;

use mise_store::RecipeRepository;
use mise_types::{RecipeRun, RunId, RunStatus, Stage};

use crate::error::{PipelineError, Result};

/// Moves runs through their lifecycle.
///
/// Every transition is persisted before the work of the new stage begins,
/// so observers always see the stage currently in progress.
#[derive(Clone)]
pub struct StatusTracker {
    repo: Arc<dyn RecipeRepository>,
}

impl StatusTracker {
    pub fn new(repo: Arc<dyn RecipeRepository>) -> Self {
        Self { repo }
    }

    pub fn set_status(&self, run_id: RunId, status: RunStatus) -> Result<RecipeRun> {
        let run = self
            .repo
            .set_status(run_id, status)
            .map_err(|e| PipelineError::for_run(run_id, e))?;
        tracing::info!(run_id, status = %status, "run status changed");
        Ok(run)
    }

    /// Enter `stage`: persist its status and open its task entry.
    pub fn begin(&self, run_id: RunId, stage: Stage) -> Result<()> {
        self.set_status(run_id, stage.status())?;
        self.repo.start_stage(run_id, stage)?;
        Ok(())
    }

    /// Close the task entry of a stage that completed.
    pub fn complete(&self, run_id: RunId, stage: Stage) -> Result<()> {
        self.repo.finish_stage(run_id, stage, None)?;
        tracing::debug!(run_id, stage = %stage, "stage complete");
        Ok(())
    }

    /// Best-effort failure bookkeeping: mark the run `error` and record the
    /// message on the stage. Problems here are logged, never returned.
    pub fn fail(&self, run_id: RunId, stage: Option<Stage>, message: &str) {
        if let Err(e) = self.set_status(run_id, RunStatus::Error) {
            tracing::warn!(run_id, error = %e, "could not mark run as failed");
        }
        let Some(stage) = stage else {
            return;
        };
        if let Err(e) = self.repo.finish_stage(run_id, stage, Some(message)) {
            tracing::warn!(run_id, stage = %stage, error = %e, "could not record stage failure");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mise_store::RecipeStore;
    use mise_types::{NewProduct, TaskState};

    fn setup() -> (Arc<RecipeStore>, StatusTracker, RunId) {
        let store = Arc::new(RecipeStore::open_in_memory().unwrap());
        let product = store.create_product(&NewProduct::new("Flour")).unwrap();
        let run = store.create_run(product.id).unwrap();
        let tracker = StatusTracker::new(store.clone());
        (store, tracker, run.id)
    }

    #[test]
    fn test_begin_and_complete_stage() {
        let (store, tracker, run_id) = setup();

        tracker.begin(run_id, Stage::Recipe).unwrap();
        assert_eq!(
            store.get_run(run_id).unwrap().status,
            RunStatus::GeneratingRecipe
        );
        tracker.complete(run_id, Stage::Recipe).unwrap();

        let tasks = store.stage_tasks(run_id).unwrap();
        assert_eq!(tasks.len(), 1);
        assert_eq!(tasks[0].state, TaskState::Done);
    }

    #[test]
    fn test_backwards_transition_rejected() {
        let (_store, tracker, run_id) = setup();
        tracker.begin(run_id, Stage::Images).unwrap();
        assert!(tracker.begin(run_id, Stage::Recipe).is_err());
    }

    #[test]
    fn test_unknown_run() {
        let (_store, tracker, _) = setup();
        assert!(matches!(
            tracker.set_status(999, RunStatus::GeneratingRecipe),
            Err(PipelineError::RunNotFound(999))
        ));
    }

    #[test]
    fn test_fail_records_error() {
        let (store, tracker, run_id) = setup();
        tracker.begin(run_id, Stage::Recipe).unwrap();
        tracker.fail(run_id, Some(Stage::Recipe), "backend down");

        assert_eq!(store.get_run(run_id).unwrap().status, RunStatus::Error);
        let tasks = store.stage_tasks(run_id).unwrap();
        assert_eq!(tasks[0].state, TaskState::Error);
        assert_eq!(tasks[0].error.as_deref(), Some("backend down"));

        // A second failure report is harmless
        tracker.fail(run_id, None, "again");
    }
}
