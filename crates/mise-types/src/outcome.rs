//! Result value of an orchestrated run.

use serde::{Deserialize, Serialize};

use crate::RunId;

/// Structured result of one run. Failures are values, never panics.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum RunOutcome {
    /// The run reached `done`.
    Done {
        run_id: RunId,
        steps: usize,
        images: usize,
    },
    /// The run could not be executed or ended in `error`.
    Error { run_id: RunId, error: String },
}

impl RunOutcome {
    pub fn failed(run_id: RunId, error: impl Into<String>) -> Self {
        Self::Error {
            run_id,
            error: error.into(),
        }
    }

    pub fn run_id(&self) -> RunId {
        match self {
            Self::Done { run_id, .. } | Self::Error { run_id, .. } => *run_id,
        }
    }

    pub fn is_done(&self) -> bool {
        matches!(self, Self::Done { .. })
    }

    pub fn error(&self) -> Option<&str> {
        match self {
            Self::Error { error, .. } => Some(error),
            Self::Done { .. } => None,
        }
    }
}
