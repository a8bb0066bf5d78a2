//! Generative backend trait and implementations.
//!
//! A backend is an opaque "prompt in, content out" capability. The pipeline
//! agents build [`AgentRequest`]s and never see provider wire formats.

use std::collections::VecDeque;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;

use crate::error::{LlmError, Result};
use crate::types::{AgentRequest, AgentResponse};

// ─────────────────────────────────────────────────────────────────────────────
// Shared Retry Logic
// ─────────────────────────────────────────────────────────────────────────────

/// Execute an async operation with exponential backoff retry.
///
/// Retries only on transient errors (network failures, rate limits). A rate
/// limit that carries a retry-after hint waits for that long instead of the
/// current backoff. Non-retryable errors are returned immediately.
pub async fn with_retry<F, Fut, T>(
    max_retries: u32,
    initial_backoff: Duration,
    backend_name: &str,
    mut f: F,
) -> Result<T>
where
    F: FnMut() -> Fut,
    Fut: std::future::Future<Output = Result<T>>,
{
    let mut backoff = initial_backoff;
    let mut attempt = 0;

    loop {
        match f().await {
            Ok(result) => return Ok(result),
            Err(e) if !e.is_retryable() || attempt >= max_retries => return Err(e),
            Err(e) => {
                let wait = e.retry_after().unwrap_or(backoff);
                attempt += 1;
                tracing::warn!(
                    backend = backend_name,
                    attempt,
                    max_retries,
                    backoff_ms = wait.as_millis() as u64,
                    error = %e,
                    "Request failed, retrying"
                );
                tokio::time::sleep(wait).await;
                backoff *= 2;
            }
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Backend Trait
// ─────────────────────────────────────────────────────────────────────────────

/// Trait for generative model providers.
#[async_trait]
pub trait GenerativeBackend: Send + Sync {
    /// Run one request and return the normalized response.
    async fn run(&self, request: AgentRequest) -> Result<AgentResponse>;

    /// Get the name of this backend.
    fn name(&self) -> &str;

    /// Check if the backend is available and properly configured.
    async fn health_check(&self) -> Result<()> {
        Ok(())
    }
}

/// A backend that can be shared across threads.
pub type SharedBackend = Arc<dyn GenerativeBackend>;

// ─────────────────────────────────────────────────────────────────────────────
// Mock Backend
// ─────────────────────────────────────────────────────────────────────────────

/// A scripted backend for tests and dry runs.
///
/// Replies are returned in the order they were queued; a queued error is
/// returned as the result of that call. Once the script is exhausted every
/// call fails with [`LlmError::Backend`], unless a fallback reply was set.
#[derive(Debug, Default)]
pub struct MockBackend {
    name: String,
    replies: Mutex<VecDeque<Result<AgentResponse>>>,
    fallback: Option<AgentResponse>,
    request_log: Mutex<Vec<AgentRequest>>,
}

impl MockBackend {
    pub fn new() -> Self {
        Self {
            name: "mock".to_string(),
            ..Default::default()
        }
    }

    /// Create a mock backend with a single text reply.
    pub fn with_text(text: impl Into<String>) -> Self {
        Self::new().then_text(text)
    }

    /// Queue a text reply.
    pub fn then_text(self, text: impl Into<String>) -> Self {
        self.then_reply(AgentResponse::text(text))
    }

    /// Queue an image reply.
    pub fn then_image(self, bytes: Vec<u8>) -> Self {
        self.then_reply(AgentResponse::image(bytes))
    }

    pub fn then_reply(self, reply: AgentResponse) -> Self {
        self.replies.lock().push_back(Ok(reply));
        self
    }

    /// Queue a failing call.
    pub fn then_error(self, error: LlmError) -> Self {
        self.replies.lock().push_back(Err(error));
        self
    }

    /// Reply used once the script is exhausted.
    pub fn with_fallback(mut self, reply: AgentResponse) -> Self {
        self.fallback = Some(reply);
        self
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    /// Get all requests that were made to this backend.
    pub fn requests(&self) -> Vec<AgentRequest> {
        self.request_log.lock().clone()
    }

    /// Get the number of requests made.
    pub fn request_count(&self) -> usize {
        self.request_log.lock().len()
    }
}

#[async_trait]
impl GenerativeBackend for MockBackend {
    async fn run(&self, request: AgentRequest) -> Result<AgentResponse> {
        self.request_log.lock().push(request);

        match self.replies.lock().pop_front() {
            Some(reply) => reply,
            None => self.fallback.clone().ok_or_else(|| {
                LlmError::Backend("MockBackend: no more responses available".to_string())
            }),
        }
    }

    fn name(&self) -> &str {
        &self.name
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
