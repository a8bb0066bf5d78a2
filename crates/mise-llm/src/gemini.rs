//! Google Gemini backend.
//!
//! Talks to the `generateContent` REST endpoint. The same backend type serves
//! the text agents and the image agent; image requests ask for the `IMAGE`
//! response modality and decode `inlineData` parts from base64.

use std::path::Path;
use std::time::Duration;

use async_trait::async_trait;
use base64::Engine;
use base64::engine::general_purpose::STANDARD as BASE64;
use reqwest::{Client, Response};
use serde::{Deserialize, Serialize};

use crate::backend::{GenerativeBackend, with_retry};
use crate::error::{LlmError, RateLimitInfo, Result};
use crate::types::{AgentRequest, AgentResponse, Modality};

/// Default Gemini API base URL.
pub const DEFAULT_GEMINI_BASE: &str = "https://generativelanguage.googleapis.com/v1beta";

const DEFAULT_TIMEOUT_SECS: u64 = 300;

// ─────────────────────────────────────────────────────────────────────────────
// Configuration
// ─────────────────────────────────────────────────────────────────────────────

/// Configuration for the Gemini backend.
#[derive(Debug, Clone)]
pub struct GeminiConfig {
    pub api_key: String,
    pub base_url: String,
    pub model: String,
    /// Aspect ratio requested for image output.
    pub aspect_ratio: Option<String>,
    pub timeout: Duration,
    /// Maximum retries for transient errors.
    pub max_retries: u32,
    /// Initial backoff duration for retries.
    pub retry_backoff: Duration,
    pub name: String,
}

impl GeminiConfig {
    pub fn new(api_key: impl Into<String>, model: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            base_url: DEFAULT_GEMINI_BASE.to_string(),
            model: model.into(),
            aspect_ratio: None,
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
            max_retries: 3,
            retry_backoff: Duration::from_millis(500),
            name: "gemini".to_string(),
        }
    }

    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = url.into();
        self
    }

    pub fn with_aspect_ratio(mut self, ratio: impl Into<String>) -> Self {
        self.aspect_ratio = Some(ratio.into());
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_retries(mut self, max_retries: u32, backoff: Duration) -> Self {
        self.max_retries = max_retries;
        self.retry_backoff = backoff;
        self
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Gemini Backend
// ─────────────────────────────────────────────────────────────────────────────

pub struct GeminiBackend {
    client: Client,
    config: GeminiConfig,
}

impl GeminiBackend {
    pub fn new(config: GeminiConfig) -> Result<Self> {
        if config.api_key.trim().is_empty() {
            return Err(LlmError::Config("Gemini API key is empty".to_string()));
        }
        let client = Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| LlmError::Internal(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self { client, config })
    }

    fn generate_url(&self) -> String {
        format!(
            "{}/models/{}:generateContent",
            self.config.base_url.trim_end_matches('/'),
            self.config.model
        )
    }

    /// Convert an agent request into the Gemini wire format.
    async fn to_gemini_request(&self, request: &AgentRequest) -> Result<GenerateRequest> {
        let mut contents = Vec::with_capacity(request.history.len() * 2 + 1);
        for turn in &request.history {
            contents.push(Content::text("user", &turn.prompt));
            contents.push(Content::text("model", &turn.response));
        }

        let mut parts = vec![Part::Text {
            text: request.prompt.clone(),
        }];
        if let Some(path) = &request.reference_image {
            parts.push(inline_image(path).await?);
        }
        contents.push(Content {
            role: "user".to_string(),
            parts,
        });

        let generation_config = match request.modality {
            Modality::Text => None,
            Modality::Image => Some(GenerationConfig {
                response_modalities: vec!["TEXT".to_string(), "IMAGE".to_string()],
                image_config: self.config.aspect_ratio.clone().map(|aspect_ratio| ImageConfig {
                    aspect_ratio,
                }),
            }),
        };

        Ok(GenerateRequest {
            system_instruction: request.system.as_ref().map(|s| Content {
                role: "system".to_string(),
                parts: vec![Part::Text { text: s.clone() }],
            }),
            contents,
            generation_config,
        })
    }

    async fn handle_response(response: Response) -> Result<AgentResponse> {
        if !response.status().is_success() {
            return Err(Self::handle_error_response(response).await);
        }

        let body = response.text().await?;
        let parsed: GenerateResponse = serde_json::from_str(&body)?;
        parsed.into_agent_response()
    }

    async fn handle_error_response(response: Response) -> LlmError {
        let status = response.status();
        let retry_after = response
            .headers()
            .get(reqwest::header::RETRY_AFTER)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string);
        let body = response.text().await.unwrap_or_default();
        let message = serde_json::from_str::<ErrorResponse>(&body)
            .map(|e| e.error.message)
            .unwrap_or_else(|_| format!("HTTP {}: {}", status, body));

        match status.as_u16() {
            400 => LlmError::InvalidRequest(message),
            401 | 403 => LlmError::Auth(message),
            429 => LlmError::RateLimit(RateLimitInfo::parse(&message, retry_after.as_deref())),
            500..=599 => LlmError::Backend(format!("Server error: {}", message)),
            _ => LlmError::Backend(message),
        }
    }
}

#[async_trait]
impl GenerativeBackend for GeminiBackend {
    async fn run(&self, request: AgentRequest) -> Result<AgentResponse> {
        let body = self.to_gemini_request(&request).await?;

        tracing::debug!(
            backend = %self.config.name,
            model = %self.config.model,
            session_id = request.session_id.as_deref().unwrap_or(""),
            history = request.history.len(),
            modality = ?request.modality,
            "Sending Gemini request"
        );

        with_retry(
            self.config.max_retries,
            self.config.retry_backoff,
            &self.config.name,
            || async {
                let response = self
                    .client
                    .post(self.generate_url())
                    .header("x-goog-api-key", &self.config.api_key)
                    .json(&body)
                    .send()
                    .await?;

                Self::handle_response(response).await
            },
        )
        .await
    }

    fn name(&self) -> &str {
        &self.config.name
    }

    async fn health_check(&self) -> Result<()> {
        match self.run(AgentRequest::new("ping")).await {
            Ok(_) => Ok(()),
            // Rate limit means reachable
            Err(LlmError::RateLimit(_)) => Ok(()),
            Err(e) => Err(e),
        }
    }
}

/// Read a reference image and wrap it as an inline part.
async fn inline_image(path: &Path) -> Result<Part> {
    let bytes = tokio::fs::read(path).await.map_err(|e| {
        LlmError::InvalidRequest(format!(
            "cannot read reference image {}: {}",
            path.display(),
            e
        ))
    })?;
    Ok(Part::InlineData {
        inline_data: InlineData {
            mime_type: mime_for(path).to_string(),
            data: BASE64.encode(bytes),
        },
    })
}

fn mime_for(path: &Path) -> &'static str {
    match path
        .extension()
        .and_then(|e| e.to_str())
        .map(str::to_ascii_lowercase)
        .as_deref()
    {
        Some("jpg" | "jpeg") => "image/jpeg",
        Some("webp") => "image/webp",
        Some("gif") => "image/gif",
        _ => "image/png",
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Wire Types
// ─────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerateRequest {
    #[serde(skip_serializing_if = "Option::is_none")]
    system_instruction: Option<Content>,
    contents: Vec<Content>,
    #[serde(skip_serializing_if = "Option::is_none")]
    generation_config: Option<GenerationConfig>,
}

#[derive(Debug, Serialize, Deserialize)]
struct Content {
    #[serde(default)]
    role: String,
    #[serde(default)]
    parts: Vec<Part>,
}

impl Content {
    fn text(role: &str, text: &str) -> Self {
        Self {
            role: role.to_string(),
            parts: vec![Part::Text {
                text: text.to_string(),
            }],
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(untagged)]
enum Part {
    Text {
        text: String,
    },
    InlineData {
        #[serde(rename = "inlineData")]
        inline_data: InlineData,
    },
    Other(serde_json::Value),
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct InlineData {
    mime_type: String,
    data: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerationConfig {
    response_modalities: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    image_config: Option<ImageConfig>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct ImageConfig {
    aspect_ratio: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GenerateResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
    #[serde(default)]
    prompt_feedback: Option<PromptFeedback>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Candidate {
    #[serde(default)]
    content: Option<Content>,
    #[serde(default)]
    finish_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PromptFeedback {
    #[serde(default)]
    block_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ErrorResponse {
    error: ErrorBody,
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    message: String,
}

impl GenerateResponse {
    fn into_agent_response(self) -> Result<AgentResponse> {
        if let Some(reason) = self.prompt_feedback.and_then(|f| f.block_reason) {
            return Err(LlmError::Backend(format!("prompt blocked: {}", reason)));
        }

        let candidate = self
            .candidates
            .into_iter()
            .next()
            .ok_or_else(|| LlmError::Backend("response contained no candidates".to_string()))?;

        let mut response = AgentResponse::default();
        let parts = candidate.content.map(|c| c.parts).unwrap_or_default();
        for part in parts {
            match part {
                Part::Text { text } => response.content.push_str(&text),
                Part::InlineData { inline_data } => {
                    let bytes = BASE64.decode(inline_data.data.as_bytes()).map_err(|e| {
                        LlmError::Serialization(format!("invalid inline image data: {}", e))
                    })?;
                    response.images.push(bytes);
                }
                Part::Other(_) => {}
            }
        }

        if response.content.is_empty() && response.images.is_empty() {
            let reason = candidate.finish_reason.unwrap_or_else(|| "unknown".to_string());
            return Err(LlmError::Backend(format!(
                "empty response (finish reason: {})",
                reason
            )));
        }

        Ok(response)
    }
}
