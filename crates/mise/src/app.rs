//! Wiring from configuration to store, backends and pipeline.

use std::sync::Arc;

use anyhow::{Context as _, Result};
use mise_config::{Backend, LoadedConfig, MiseConfig};
use mise_llm::{AgentResponse, GeminiBackend, GeminiConfig, MockBackend, SharedBackend};
use mise_pipeline::{Orchestrator, Pipeline, RetryPolicy};
use mise_store::{MediaStore, RecipeStore};

use crate::commands::Context;

/// Load and validate configuration, printing any warnings.
pub fn load_config(ctx: &Context) -> Result<LoadedConfig> {
    let loaded = mise_config::load_config_with_options(None, ctx.config_dir.as_deref())
        .context("failed to load configuration")?;
    for warning in &loaded.warnings {
        tracing::warn!("{warning}");
    }
    Ok(loaded)
}

pub fn open_store(config: &MiseConfig) -> Result<Arc<RecipeStore>> {
    let path = config.storage().database_path();
    let store = RecipeStore::open(&path)
        .with_context(|| format!("failed to open database {}", path.display()))?;
    tracing::debug!(path = %path.display(), "database opened");
    Ok(Arc::new(store))
}

/// Build the text and image backends named by the configuration.
pub fn backends(config: &MiseConfig) -> Result<(SharedBackend, SharedBackend)> {
    let llm = config.llm();
    let image = config.image();

    match llm.backend {
        Backend::Gemini => {
            let key = mise_config::require_api_key(&llm.backend, llm.api_key.as_deref())?;
            tracing::debug!(source = %key.source, "resolved API key");
            let timeout = llm.timeout();
            let backoff = llm.retry_backoff();

            let text_config = GeminiConfig::new(key.value.clone(), llm.model.clone())
                .with_base_url(llm.base_url.clone())
                .with_timeout(timeout)
                .with_retries(llm.retry_max, backoff)
                .with_name("gemini-text");
            let image_config = GeminiConfig::new(key.value, image.model)
                .with_base_url(llm.base_url)
                .with_aspect_ratio(image.aspect_ratio)
                .with_timeout(timeout)
                .with_retries(llm.retry_max, backoff)
                .with_name("gemini-image");

            let text: SharedBackend = Arc::new(GeminiBackend::new(text_config)?);
            let image: SharedBackend = Arc::new(GeminiBackend::new(image_config)?);
            Ok((text, image))
        }
        Backend::Mock => Ok(mock_backends()),
    }
}

const MOCK_RECIPE: &str = r#"```json
{"ingredients": [{"name": "Sample product", "quantity": "1", "unit": "unit"}],
 "steps": ["Prepare the sample product.", "Serve."]}
```
```html
<!DOCTYPE html><html><body><h1>Sample recipe</h1></body></html>
```"#;

/// 1x1 transparent PNG.
const MOCK_IMAGE: &[u8] = &[
    0x89, 0x50, 0x4e, 0x47, 0x0d, 0x0a, 0x1a, 0x0a, 0x00, 0x00, 0x00, 0x0d, 0x49, 0x48, 0x44,
    0x52, 0x00, 0x00, 0x00, 0x01, 0x00, 0x00, 0x00, 0x01, 0x08, 0x06, 0x00, 0x00, 0x00, 0x1f,
    0x15, 0xc4, 0x89, 0x00, 0x00, 0x00, 0x0d, 0x49, 0x44, 0x41, 0x54, 0x78, 0x9c, 0x63, 0x00,
    0x01, 0x00, 0x00, 0x05, 0x00, 0x01, 0x0d, 0x0a, 0x2d, 0xb4, 0x00, 0x00, 0x00, 0x00, 0x49,
    0x45, 0x4e, 0x44, 0xae, 0x42, 0x60, 0x82,
];

/// Offline backends: every text call answers with a sample recipe that also
/// carries a sample page, every image call with a tiny PNG.
fn mock_backends() -> (SharedBackend, SharedBackend) {
    let text: SharedBackend = Arc::new(
        MockBackend::new()
            .with_name("mock-text")
            .with_fallback(AgentResponse::text(MOCK_RECIPE)),
    );
    let image: SharedBackend = Arc::new(
        MockBackend::new()
            .with_name("mock-image")
            .with_fallback(AgentResponse::image(MOCK_IMAGE.to_vec())),
    );
    (text, image)
}

/// Assemble the worker pipeline over `store`.
pub fn pipeline(config: &MiseConfig, store: Arc<RecipeStore>) -> Result<Pipeline> {
    let (text, image) = backends(config)?;
    let settings = config.pipeline();
    let worker = config.worker();

    let orchestrator = Orchestrator::builder()
        .with_repository(store.clone())
        .with_knowledge(store, settings.knowledge_results)
        .with_media(MediaStore::new(config.storage().media_root()))
        .with_text_backend(text)
        .with_image_backend(image)
        .with_history_turns(settings.history_turns)
        .with_retry(RetryPolicy::new(
            settings.image_attempts,
            settings.image_backoff(),
        ))
        .build()?;

    Ok(Pipeline::new(
        Arc::new(orchestrator),
        worker.concurrency,
        worker.queue_capacity,
    ))
}
