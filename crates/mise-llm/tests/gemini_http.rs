//! Gemini backend against a local HTTP server.

use std::time::Duration;

use base64::Engine;
use base64::engine::general_purpose::STANDARD as BASE64;
use mise_llm::{AgentRequest, GeminiBackend, GeminiConfig, GenerativeBackend, LlmError, Modality};
use serde_json::json;
use wiremock::matchers::{header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

const MODEL_PATH: &str = "/models/test-model:generateContent";

fn backend(server: &MockServer) -> GeminiBackend {
    GeminiBackend::new(
        GeminiConfig::new("test-key", "test-model")
            .with_base_url(server.uri())
            .with_retries(2, Duration::from_millis(1)),
    )
    .unwrap()
}

#[tokio::test]
async fn test_text_generation() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path(MODEL_PATH))
        .and(header("x-goog-api-key", "test-key"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "candidates": [{"content": {"role": "model", "parts": [{"text": "{\"steps\": []}"}]}}]
        })))
        .expect(1)
        .mount(&server)
        .await;

    let response = backend(&server)
        .run(AgentRequest::new("Write a recipe").with_session("recipe_1_deadbeef"))
        .await
        .unwrap();
    assert_eq!(response.content, "{\"steps\": []}");
    assert!(response.images.is_empty());
}

#[tokio::test]
async fn test_image_generation() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path(MODEL_PATH))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "candidates": [{"content": {"parts": [
                {"inlineData": {"mimeType": "image/png", "data": BASE64.encode(b"PNGDATA")}}
            ]}}]
        })))
        .mount(&server)
        .await;

    let response = backend(&server)
        .run(AgentRequest::new("Photograph it").with_modality(Modality::Image))
        .await
        .unwrap();
    assert_eq!(response.first_image(), Some(&b"PNGDATA"[..]));
}

#[tokio::test]
async fn test_auth_failure_is_not_retried() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path(MODEL_PATH))
        .respond_with(ResponseTemplate::new(403).set_body_json(json!({
            "error": {"code": 403, "message": "API key not valid", "status": "PERMISSION_DENIED"}
        })))
        .expect(1)
        .mount(&server)
        .await;

    let err = backend(&server).run(AgentRequest::new("hi")).await.unwrap_err();
    assert!(matches!(err, LlmError::Auth(ref msg) if msg.contains("API key not valid")));
}

#[tokio::test]
async fn test_rate_limit_is_retried_then_surfaced() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path(MODEL_PATH))
        .respond_with(ResponseTemplate::new(429).set_body_json(json!({
            "error": {"code": 429, "message": "quota exhausted", "status": "RESOURCE_EXHAUSTED"}
        })))
        // One call plus two retries
        .expect(3)
        .mount(&server)
        .await;

    let err = backend(&server).run(AgentRequest::new("hi")).await.unwrap_err();
    assert!(err.is_retryable());
    assert!(err.to_string().contains("quota exhausted"));
}

#[tokio::test]
async fn test_server_error_is_backend_error() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path(MODEL_PATH))
        .respond_with(ResponseTemplate::new(500).set_body_string("upstream exploded"))
        .mount(&server)
        .await;

    let err = backend(&server).run(AgentRequest::new("hi")).await.unwrap_err();
    assert!(matches!(err, LlmError::Backend(ref msg) if msg.contains("upstream exploded")));
}
