//! Recipe generation pipeline for Mise.
//!
//! A run turns one catalog product into a published recipe in three stages:
//!
//! 1. **Recipe**: the chef agent writes ingredients and ordered steps.
//! 2. **Images**: the photographer agent produces one image per step, each
//!    step retried under a [`RetryPolicy`].
//! 3. **HTML**: the layout agent assembles a page with an image carousel.
//!
//! [`Orchestrator::execute`] drives a single run; [`Pipeline`] creates runs
//! and executes them on a bounded [`WorkerPool`].

pub mod agents;
pub mod artifacts;
pub mod error;
pub mod extract;
pub mod orchestrator;
pub mod prompt;
pub mod retry;
pub mod tracker;
pub mod worker;

pub use agents::{ChefAgent, LayoutAgent, PhotographerAgent};
pub use artifacts::ArtifactStore;
pub use error::{PipelineError, Result};
pub use extract::extract_fenced;
pub use orchestrator::{Orchestrator, OrchestratorBuilder, media_url, session_token};
pub use prompt::{build_html_prompt, build_image_prompt, build_recipe_prompt};
pub use retry::RetryPolicy;
pub use tracker::StatusTracker;
pub use worker::{Pipeline, RunJob, Submission, WorkerPool};
