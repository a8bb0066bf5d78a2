//! The three generative agents: chef, photographer and layout.
//!
//! Each agent is a fixed set of instructions bound to a backend. All three
//! share one [`SessionMemory`], so within a run the photographer and layout
//! agents see the exchanges that came before them.

use std::path::Path;
use std::sync::Arc;

use mise_llm::{AgentRequest, AgentResponse, Modality, SessionMemory, SharedBackend};
use mise_store::KnowledgeBase;
use mise_types::RecipeDraft;

use crate::error::Result;
use crate::extract::extract_fenced;
use crate::prompt::with_reference_material;

// ─────────────────────────────────────────────────────────────────────────────
// Instructions
// ─────────────────────────────────────────────────────────────────────────────

pub const CHEF_INSTRUCTIONS: &str = "\
You are a creative chef writing recipes for a food brand.
- Every recipe is original. Never repeat a recipe you already wrote.
- Always mention the product by name and brand in the ingredients and steps.
- Use the reference recipes you are given as inspiration, not as text to copy.
- Return ONLY valid JSON of the form
  {\"ingredients\": [{\"name\": \"...\", \"quantity\": \"...\", \"unit\": \"...\"}], \"steps\": [\"...\"]}
  with no commentary before or after it.";

pub const PHOTOGRAPHER_INSTRUCTIONS: &str = "\
You are a professional food photographer producing one image per recipe step.
- Keep lighting, color palette and setting identical across the whole recipe.
- Shoot from a 45 degree angle or directly overhead.
- Compose with the rule of thirds and keep the background clean.
- The client's product must be clearly visible and recognizable.";

pub const LAYOUT_INSTRUCTIONS: &str = "\
You are a web designer laying out recipe pages.
- Produce one complete, self-contained HTML page.
- Open with an image carousel using the image URLs in the order given.
- Follow with an ordered ingredients section and an ordered steps section.
- Highlight the client's product image.
- Do not include external scripts, forms or tracking code.
- Return only the HTML.";

// ─────────────────────────────────────────────────────────────────────────────
// Shared plumbing
// ─────────────────────────────────────────────────────────────────────────────

#[derive(Clone)]
struct AgentCore {
    name: &'static str,
    instructions: &'static str,
    backend: SharedBackend,
    memory: Arc<SessionMemory>,
}

impl AgentCore {
    /// Send one prompt with the session's history and record the exchange.
    async fn call(
        &self,
        prompt: &str,
        session_id: &str,
        modality: Modality,
        reference_image: Option<&Path>,
    ) -> Result<AgentResponse> {
        let request = AgentRequest::new(prompt)
            .with_session(session_id)
            .with_system(self.instructions)
            .with_history(self.memory.history(session_id))
            .with_reference_image(reference_image.map(Path::to_path_buf))
            .with_modality(modality);

        tracing::debug!(
            agent = self.name,
            backend = self.backend.name(),
            session_id,
            prompt_len = prompt.len(),
            "calling backend"
        );
        let response = self.backend.run(request).await?;
        self.memory.record(session_id, prompt, &response.content);
        Ok(response)
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Chef
// ─────────────────────────────────────────────────────────────────────────────

/// Writes the recipe: ingredients and ordered steps.
#[derive(Clone)]
pub struct ChefAgent {
    core: AgentCore,
    knowledge: Option<Arc<dyn KnowledgeBase>>,
    knowledge_results: usize,
}

impl ChefAgent {
    pub fn new(backend: SharedBackend, memory: Arc<SessionMemory>) -> Self {
        Self {
            core: AgentCore {
                name: "chef",
                instructions: CHEF_INSTRUCTIONS,
                backend,
                memory,
            },
            knowledge: None,
            knowledge_results: 0,
        }
    }

    /// Consult `knowledge` for up to `results` reference recipes per run.
    pub fn with_knowledge(mut self, knowledge: Arc<dyn KnowledgeBase>, results: usize) -> Self {
        self.knowledge = Some(knowledge);
        self.knowledge_results = results;
        self
    }

    /// Generate a recipe for `prompt`.
    ///
    /// `topic` is the knowledge base query; reference recipes matching it are
    /// placed ahead of the prompt. Output that is not a recipe document yields
    /// an empty draft rather than an error. Backend failures propagate.
    pub async fn generate_recipe(
        &self,
        prompt: &str,
        session_id: &str,
        topic: Option<&str>,
    ) -> Result<RecipeDraft> {
        let prompt = match topic {
            Some(topic) => with_reference_material(prompt, &self.reference_material(topic)),
            None => prompt.to_string(),
        };

        let response = self
            .core
            .call(&prompt, session_id, Modality::Text, None)
            .await?;

        let payload = extract_fenced(&response.content, Some("json"));
        match serde_json::from_str::<RecipeDraft>(payload) {
            Ok(draft) => Ok(draft),
            Err(e) => {
                tracing::warn!(
                    session_id,
                    error = %e,
                    response_len = response.content.len(),
                    "recipe response was not valid JSON, using empty recipe"
                );
                Ok(RecipeDraft::empty())
            }
        }
    }

    fn reference_material(&self, topic: &str) -> Vec<mise_store::KnowledgeDocument> {
        let Some(knowledge) = &self.knowledge else {
            return Vec::new();
        };
        match knowledge.search(topic, self.knowledge_results) {
            Ok(docs) => {
                tracing::debug!(topic, found = docs.len(), "knowledge lookup");
                docs
            }
            Err(e) => {
                tracing::warn!(topic, error = %e, "knowledge lookup failed, continuing without");
                Vec::new()
            }
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Photographer
// ─────────────────────────────────────────────────────────────────────────────

/// Produces one image per recipe step.
#[derive(Clone)]
pub struct PhotographerAgent {
    core: AgentCore,
}

impl PhotographerAgent {
    pub fn new(backend: SharedBackend, memory: Arc<SessionMemory>) -> Self {
        Self {
            core: AgentCore {
                name: "photographer",
                instructions: PHOTOGRAPHER_INSTRUCTIONS,
                backend,
                memory,
            },
        }
    }

    /// Generate an image. `Ok(None)` when the backend answered without one.
    pub async fn generate_image(
        &self,
        prompt: &str,
        session_id: &str,
        reference_image: Option<&Path>,
    ) -> Result<Option<Vec<u8>>> {
        let response = self
            .core
            .call(prompt, session_id, Modality::Image, reference_image)
            .await?;
        Ok(response.first_image().map(<[u8]>::to_vec))
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Layout
// ─────────────────────────────────────────────────────────────────────────────

/// Lays out the final HTML page.
#[derive(Clone)]
pub struct LayoutAgent {
    core: AgentCore,
}

impl LayoutAgent {
    pub fn new(backend: SharedBackend, memory: Arc<SessionMemory>) -> Self {
        Self {
            core: AgentCore {
                name: "layout",
                instructions: LAYOUT_INSTRUCTIONS,
                backend,
                memory,
            },
        }
    }

    /// Generate the recipe page, stripped of any markdown fence.
    pub async fn generate_html(&self, prompt: &str, session_id: &str) -> Result<String> {
        let response = self
            .core
            .call(prompt, session_id, Modality::Text, None)
            .await?;
        Ok(extract_fenced(&response.content, Some("html")).to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mise_llm::{LlmError, MockBackend};
    use mise_store::RecipeStore;

    fn memory() -> Arc<SessionMemory> {
        Arc::new(SessionMemory::new(3))
    }

    #[tokio::test]
    async fn test_chef_parses_fenced_json() {
        let backend = Arc::new(MockBackend::with_text(
            "Sure!\n```json\n{\"ingredients\":[{\"name\":\"Condensed Milk Acme\",\"quantity\":\"1\",\"unit\":\"can\"}],\"steps\":[\"Heat\",\"Serve\"]}\n```",
        ));
        let chef = ChefAgent::new(backend.clone(), memory());

        let draft = chef.generate_recipe("make it", "s1", None).await.unwrap();
        assert_eq!(draft.ingredients.len(), 1);
        assert_eq!(draft.steps, vec!["Heat", "Serve"]);

        let request = &backend.requests()[0];
        assert_eq!(request.session_id.as_deref(), Some("s1"));
        assert_eq!(request.system.as_deref(), Some(CHEF_INSTRUCTIONS));
        assert_eq!(request.modality, Modality::Text);
    }

    #[tokio::test]
    async fn test_chef_soft_parse_failure() {
        let backend = Arc::new(MockBackend::with_text("I would rather write a poem."));
        let chef = ChefAgent::new(backend, memory());

        let draft = chef.generate_recipe("make it", "s1", None).await.unwrap();
        assert!(draft.is_empty());
    }

    #[tokio::test]
    async fn test_chef_backend_error_propagates() {
        let backend = Arc::new(MockBackend::new().then_error(LlmError::Auth("bad key".into())));
        let chef = ChefAgent::new(backend, memory());

        let err = chef.generate_recipe("make it", "s1", None).await.unwrap_err();
        assert!(err.to_string().contains("bad key"));
    }

    #[tokio::test]
    async fn test_chef_prepends_knowledge() {
        let store = Arc::new(RecipeStore::open_in_memory().unwrap());
        store
            .add_document("Brigadeiro", "Cook condensed milk with cocoa.", None)
            .unwrap();

        let backend = Arc::new(MockBackend::with_text("{\"ingredients\":[],\"steps\":[]}"));
        let chef = ChefAgent::new(backend.clone(), memory()).with_knowledge(store, 5);

        chef.generate_recipe("PROMPT", "s1", Some("Condensed Milk"))
            .await
            .unwrap();

        let prompt = &backend.requests()[0].prompt;
        assert!(prompt.contains("## Brigadeiro"));
        assert!(prompt.ends_with("PROMPT"));
    }

    #[tokio::test]
    async fn test_agents_share_session_history() {
        let memory = memory();
        let text = Arc::new(
            MockBackend::with_text("{\"ingredients\":[],\"steps\":[]}").then_text("<html></html>"),
        );
        let chef = ChefAgent::new(text.clone(), memory.clone());
        let layout = LayoutAgent::new(text.clone(), memory.clone());

        chef.generate_recipe("recipe please", "run", None)
            .await
            .unwrap();
        layout.generate_html("page please", "run").await.unwrap();

        let requests = text.requests();
        assert!(requests[0].history.is_empty());
        assert_eq!(requests[1].history.len(), 1);
        assert_eq!(requests[1].history[0].prompt, "recipe please");

        // Other sessions see nothing
        assert!(memory.history("other").is_empty());
    }

    #[tokio::test]
    async fn test_photographer_returns_image_bytes() {
        let backend = Arc::new(MockBackend::new().then_image(vec![1, 2, 3]).then_text("no image"));
        let photographer = PhotographerAgent::new(backend.clone(), memory());

        let first = photographer.generate_image("shot", "s", None).await.unwrap();
        assert_eq!(first, Some(vec![1, 2, 3]));
        let second = photographer.generate_image("shot", "s", None).await.unwrap();
        assert_eq!(second, None);

        let request = &backend.requests()[0];
        assert_eq!(request.modality, Modality::Image);
        assert!(request.reference_image.is_none());
    }

    #[tokio::test]
    async fn test_layout_strips_fence() {
        let backend = Arc::new(MockBackend::with_text("```html\n<html><body/></html>\n```"));
        let layout = LayoutAgent::new(backend, memory());
        let html = layout.generate_html("page", "s").await.unwrap();
        assert_eq!(html, "<html><body/></html>");
    }
}
