//! Error types for the recipe pipeline.

use mise_llm::LlmError;
use mise_store::StoreError;
use mise_types::{ProductId, RunId};
use thiserror::Error;

/// Result type for pipeline operations.
pub type Result<T> = std::result::Result<T, PipelineError>;

#[derive(Debug, Error)]
pub enum PipelineError {
    /// The recipe run does not exist.
    #[error("recipe run {0} not found")]
    RunNotFound(RunId),

    /// The catalog product does not exist.
    #[error("product {0} not found")]
    ProductNotFound(ProductId),

    /// The generative backend failed.
    #[error(transparent)]
    Llm(#[from] LlmError),

    /// Persistence failed.
    #[error(transparent)]
    Store(#[from] StoreError),

    /// Input that no prompt can be built from.
    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// The worker pool no longer accepts jobs.
    #[error("worker queue is closed")]
    QueueClosed,
}

impl PipelineError {
    /// Map a store `NotFound` for a run onto [`PipelineError::RunNotFound`].
    pub(crate) fn for_run(run_id: RunId, err: StoreError) -> Self {
        match err {
            StoreError::NotFound { entity, .. } if entity == "recipe run" => {
                Self::RunNotFound(run_id)
            }
            other => Self::Store(other),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_run_not_found_message() {
        let err = PipelineError::RunNotFound(42);
        assert_eq!(err.to_string(), "recipe run 42 not found");
    }

    #[test]
    fn test_store_not_found_maps_to_run_not_found() {
        let store_err = StoreError::NotFound {
            entity: "recipe run",
            id: "5".to_string(),
        };
        assert!(matches!(
            PipelineError::for_run(5, store_err),
            PipelineError::RunNotFound(5)
        ));

        let other = StoreError::Migration("boom".to_string());
        assert!(matches!(
            PipelineError::for_run(5, other),
            PipelineError::Store(_)
        ));
    }
}
