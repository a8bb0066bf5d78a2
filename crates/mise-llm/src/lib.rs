//! Generative model backends for the Mise recipe pipeline.
//!
//! The core abstraction is the [`GenerativeBackend`] trait: one request in,
//! one normalized [`AgentResponse`] (text plus decoded images) out. The
//! pipeline agents only ever talk to this trait.
//!
//! ```text
//! ┌───────────────────────────────────────┐
//! │  GenerativeBackend trait              │
//! │  - run(AgentRequest) -> AgentResponse │
//! └───────────────────────────────────────┘
//!                    │
//!          ┌─────────┴─────────┐
//!          ▼                   ▼
//!     ┌─────────┐        ┌──────────┐
//!     │ Gemini  │        │   Mock   │
//!     └─────────┘        └──────────┘
//! ```

pub mod backend;
pub mod error;
pub mod gemini;
pub mod memory;
pub mod types;

pub use backend::{GenerativeBackend, MockBackend, SharedBackend, with_retry};
pub use error::{LlmError, RateLimitInfo, Result};
pub use gemini::{GeminiBackend, GeminiConfig};
pub use memory::SessionMemory;
pub use types::{AgentRequest, AgentResponse, Modality, Turn};
