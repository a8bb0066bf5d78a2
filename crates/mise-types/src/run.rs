//! Recipe-run record and its lifecycle.

use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::recipe::Ingredient;
use crate::{ProductId, RunId, Timestamp};

// ─────────────────────────────────────────────────────────────────────────────
// Run Status
// ─────────────────────────────────────────────────────────────────────────────

/// Lifecycle status of a recipe run.
///
/// Active states advance strictly forward:
/// `pending → generating_recipe → generating_images → generating_html → done`.
/// `error` is absorbing and reachable from every non-terminal state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RunStatus {
    Pending,
    GeneratingRecipe,
    GeneratingImages,
    GeneratingHtml,
    Done,
    Error,
}

impl RunStatus {
    /// All statuses in lifecycle order (`error` last).
    pub const ALL: [RunStatus; 6] = [
        RunStatus::Pending,
        RunStatus::GeneratingRecipe,
        RunStatus::GeneratingImages,
        RunStatus::GeneratingHtml,
        RunStatus::Done,
        RunStatus::Error,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::GeneratingRecipe => "generating_recipe",
            Self::GeneratingImages => "generating_images",
            Self::GeneratingHtml => "generating_html",
            Self::Done => "done",
            Self::Error => "error",
        }
    }

    /// Position in the forward sequence. `None` for `error`.
    fn rank(&self) -> Option<u8> {
        match self {
            Self::Pending => Some(0),
            Self::GeneratingRecipe => Some(1),
            Self::GeneratingImages => Some(2),
            Self::GeneratingHtml => Some(3),
            Self::Done => Some(4),
            Self::Error => None,
        }
    }

    /// Returns true for `done` and `error`.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Done | Self::Error)
    }

    /// Whether moving from `self` to `next` keeps the lifecycle monotonic.
    ///
    /// Forward moves may skip intermediate states; staying put or moving back
    /// is rejected, as is leaving a terminal state.
    pub fn can_transition_to(&self, next: RunStatus) -> bool {
        if self.is_terminal() {
            return false;
        }
        match (self.rank(), next.rank()) {
            (_, None) => true,
            (Some(current), Some(target)) => target > current,
            (None, Some(_)) => false,
        }
    }
}

impl std::fmt::Display for RunStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error returned when parsing an unknown status string.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown run status '{0}'")]
pub struct ParseStatusError(pub String);

impl FromStr for RunStatus {
    type Err = ParseStatusError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        RunStatus::ALL
            .iter()
            .copied()
            .find(|status| status.as_str() == s)
            .ok_or_else(|| ParseStatusError(s.to_string()))
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Stages
// ─────────────────────────────────────────────────────────────────────────────

/// One of the three sequential sub-phases of a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    Recipe,
    Images,
    Html,
}

impl Stage {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Recipe => "recipe",
            Self::Images => "images",
            Self::Html => "html",
        }
    }

    /// The run status that is active while this stage executes.
    pub fn status(&self) -> RunStatus {
        match self {
            Self::Recipe => RunStatus::GeneratingRecipe,
            Self::Images => RunStatus::GeneratingImages,
            Self::Html => RunStatus::GeneratingHtml,
        }
    }
}

impl std::fmt::Display for Stage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Stage {
    type Err = ParseStatusError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "recipe" => Ok(Self::Recipe),
            "images" => Ok(Self::Images),
            "html" => Ok(Self::Html),
            other => Err(ParseStatusError(other.to_string())),
        }
    }
}

/// State of a single stage task.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskState {
    Running,
    Done,
    Error,
}

impl TaskState {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Running => "running",
            Self::Done => "done",
            Self::Error => "error",
        }
    }
}

impl FromStr for TaskState {
    type Err = ParseStatusError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "running" => Ok(Self::Running),
            "done" => Ok(Self::Done),
            "error" => Ok(Self::Error),
            other => Err(ParseStatusError(other.to_string())),
        }
    }
}

/// Log entry for one stage of one run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StageTask {
    pub run_id: RunId,
    pub stage: Stage,
    pub state: TaskState,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

// ─────────────────────────────────────────────────────────────────────────────
// Recipe Run
// ─────────────────────────────────────────────────────────────────────────────

/// The central mutable record of one pipeline execution.
///
/// Ingredients and steps are kept in their serialized JSON form, exactly as
/// they are stored; use [`RecipeRun::ingredients`] and [`RecipeRun::steps`]
/// to decode them.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RecipeRun {
    pub id: RunId,
    pub product_id: ProductId,
    pub status: RunStatus,
    pub ingredients_json: Option<String>,
    pub steps_json: Option<String>,
    pub html: Option<String>,
    pub publish_link: Option<String>,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

impl RecipeRun {
    /// Decoded ingredient list (empty until the recipe stage has run).
    pub fn ingredients(&self) -> serde_json::Result<Vec<Ingredient>> {
        match self.ingredients_json.as_deref() {
            Some(json) => serde_json::from_str(json),
            None => Ok(Vec::new()),
        }
    }

    /// Decoded step list (empty until the recipe stage has run).
    pub fn steps(&self) -> serde_json::Result<Vec<String>> {
        match self.steps_json.as_deref() {
            Some(json) => serde_json::from_str(json),
            None => Ok(Vec::new()),
        }
    }
}
