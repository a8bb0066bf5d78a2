//! Request and response types shared by all backends.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// What the caller expects back from the model.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Modality {
    #[default]
    Text,
    /// Text and inline image data.
    Image,
}

/// One earlier prompt/response exchange replayed for continuity.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Turn {
    pub prompt: String,
    pub response: String,
}

impl Turn {
    pub fn new(prompt: impl Into<String>, response: impl Into<String>) -> Self {
        Self {
            prompt: prompt.into(),
            response: response.into(),
        }
    }
}

/// A single invocation of a generative agent.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AgentRequest {
    pub prompt: String,
    /// Opaque token shared by every call of one run.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub session_id: Option<String>,
    /// Fixed instructions for the agent issuing the call.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub system: Option<String>,
    /// Earlier turns of the same session, oldest first.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub history: Vec<Turn>,
    /// Image sent alongside the prompt to bias the output. Passed per call.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reference_image: Option<PathBuf>,
    #[serde(default)]
    pub modality: Modality,
}

impl AgentRequest {
    pub fn new(prompt: impl Into<String>) -> Self {
        Self {
            prompt: prompt.into(),
            ..Default::default()
        }
    }

    pub fn with_session(mut self, session_id: impl Into<String>) -> Self {
        self.session_id = Some(session_id.into());
        self
    }

    pub fn with_system(mut self, system: impl Into<String>) -> Self {
        self.system = Some(system.into());
        self
    }

    pub fn with_history(mut self, history: Vec<Turn>) -> Self {
        self.history = history;
        self
    }

    pub fn with_reference_image(mut self, path: Option<PathBuf>) -> Self {
        self.reference_image = path;
        self
    }

    pub fn with_modality(mut self, modality: Modality) -> Self {
        self.modality = modality;
        self
    }
}

/// Normalized model output: concatenated text plus any decoded images.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AgentResponse {
    pub content: String,
    pub images: Vec<Vec<u8>>,
}

impl AgentResponse {
    pub fn text(content: impl Into<String>) -> Self {
        Self {
            content: content.into(),
            images: Vec::new(),
        }
    }

    pub fn image(bytes: Vec<u8>) -> Self {
        Self {
            content: String::new(),
            images: vec![bytes],
        }
    }

    /// First non-empty image, if any.
    pub fn first_image(&self) -> Option<&[u8]> {
        self.images
            .iter()
            .find(|bytes| !bytes.is_empty())
            .map(Vec::as_slice)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request_builder() {
        let request = AgentRequest::new("Write a recipe")
            .with_session("recipe_1_abcd1234")
            .with_system("You are a chef")
            .with_history(vec![Turn::new("hi", "hello")])
            .with_modality(Modality::Image);

        assert_eq!(request.prompt, "Write a recipe");
        assert_eq!(request.session_id.as_deref(), Some("recipe_1_abcd1234"));
        assert_eq!(request.history.len(), 1);
        assert!(request.reference_image.is_none());
        assert_eq!(request.modality, Modality::Image);
    }

    #[test]
    fn test_first_image_skips_empty() {
        let response = AgentResponse {
            content: String::new(),
            images: vec![Vec::new(), vec![1, 2, 3]],
        };
        assert_eq!(response.first_image(), Some(&[1u8, 2, 3][..]));
        assert!(AgentResponse::text("no images").first_image().is_none());
    }
}
