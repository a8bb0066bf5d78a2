//! Per-step image records.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::{RunId, Timestamp};

/// Image generated for one preparation step of a run.
///
/// There is at most one record per `(run_id, step_index)`; regenerating a
/// step replaces it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GeneratedImage {
    pub run_id: RunId,
    /// 0-based position of the step in the run's step list.
    pub step_index: usize,
    /// Path relative to the media root, e.g. `media/recipes/7/step_0.png`.
    pub path: PathBuf,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub prompt_meta: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub seed: Option<String>,
    pub created_at: Timestamp,
}

impl GeneratedImage {
    /// Conventional relative path of a step image.
    pub fn relative_path(run_id: RunId, step_index: usize) -> PathBuf {
        PathBuf::from(format!("media/recipes/{run_id}/step_{step_index}.png"))
    }
}
