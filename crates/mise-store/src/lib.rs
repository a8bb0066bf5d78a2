//! SQLite persistence and media storage for the Mise recipe pipeline.
//!
//! - [`RecipeStore`]: products, recipe runs, per-step image records, the
//!   stage task log and knowledge documents, in one SQLite database with
//!   embedded migrations.
//! - [`RecipeRepository`]: the trait the pipeline is written against.
//! - [`MediaStore`]: image files under the media root.
//! - [`KnowledgeBase`]: keyword retrieval over stored documents.

pub mod error;
pub mod knowledge;
pub mod media;
pub mod repository;
pub mod store;

pub use error::{Result, StoreError};
pub use knowledge::{KnowledgeBase, KnowledgeDocument, query_terms};
pub use media::MediaStore;
pub use repository::RecipeRepository;
pub use store::RecipeStore;
