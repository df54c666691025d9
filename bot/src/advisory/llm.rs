//! LLM-backed advisory service
//!
//! Implements [`AdvisoryService`] against an OpenAI-compatible Chat
//! Completions endpoint with vision support. Images are sent inline as
//! base64 data URLs. Each call asks for a single JSON object and anything
//! the model gets wrong degrades to the manual flow on the caller's side.

use std::collections::HashMap;
use std::time::Duration;

use async_trait::async_trait;
use base64::Engine;
use base64::prelude::BASE64_STANDARD;
use reqwest::Client;
use serde::Deserialize;
use tracing::debug;

use super::{AdvisoryError, AdvisoryService, ItemAnalysis};
use crate::config::AdvisoryConfig;
use crate::market::{AttributeSpec, CategoryCandidate};

const ANALYZE_PROMPT: &str = "You are helping draft a classified ad from a photo. \
     Reply with a single JSON object: {\"title\": string (max 60 chars), \
     \"description\": string (2-3 sentences), \"brand\": string or null, \
     \"model\": string or null}. No markdown, no extra text.";

const CATEGORY_PROMPT: &str = "Pick the category that fits the listing, or answer null when unsure. \
     Reply with a single JSON object: {\"category\": string id or null}. \
     Only use ids from the candidate list.";

const ATTRIBUTES_PROMPT: &str = "Resolve listing attributes you are confident about. \
     Reply with a single JSON object mapping attribute name to option id. \
     Omit attributes you cannot determine from the listing text. \
     Only use option ids from the given specs.";

/// OpenAI-compatible vision/LLM advisor
pub struct LlmAdvisor {
    model: String,
    api_key: String,
    base_url: String,
    http: Client,
    max_tokens: u32,
}

#[derive(Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Deserialize)]
struct ChatChoice {
    message: ChatMessage,
}

#[derive(Deserialize)]
struct ChatMessage {
    content: Option<String>,
}

#[derive(Deserialize)]
struct AnalysisBody {
    title: String,
    description: String,
    #[serde(default)]
    brand: Option<String>,
    #[serde(default)]
    model: Option<String>,
}

#[derive(Deserialize)]
struct CategoryBody {
    category: Option<String>,
}

impl LlmAdvisor {
    /// Create an advisor from configuration; the API key is read from the
    /// environment variable named in the config
    pub fn from_config(config: &AdvisoryConfig) -> Result<Self, AdvisoryError> {
        let api_key = std::env::var(&config.api_key_env).map_err(|_| {
            AdvisoryError::InvalidResponse(format!("environment variable {} not set", config.api_key_env))
        })?;

        let http = Client::builder()
            .timeout(Duration::from_millis(config.timeout_ms))
            .build()
            .map_err(AdvisoryError::Network)?;

        Ok(Self {
            model: config.model.clone(),
            api_key,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            http,
            max_tokens: config.max_tokens,
        })
    }

    /// Send one chat completion and return the raw text content
    async fn chat(&self, messages: serde_json::Value) -> Result<String, AdvisoryError> {
        let body = serde_json::json!({
            "model": self.model,
            "max_tokens": self.max_tokens,
            "messages": messages,
        });

        let response = self
            .http
            .post(format!("{}/v1/chat/completions", self.base_url))
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let message = response.text().await.unwrap_or_default();
            return Err(AdvisoryError::Api { status, message });
        }

        let parsed: ChatResponse = response.json().await?;
        parsed
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .ok_or_else(|| AdvisoryError::InvalidResponse("empty completion".to_string()))
    }

    /// Extract the first JSON object from model output, tolerating fencing
    fn json_payload(text: &str) -> Result<&str, AdvisoryError> {
        let start = text.find('{');
        let end = text.rfind('}');
        match (start, end) {
            (Some(s), Some(e)) if e > s => Ok(&text[s..=e]),
            _ => Err(AdvisoryError::InvalidResponse(format!(
                "no JSON object in completion: {}",
                text.chars().take(120).collect::<String>()
            ))),
        }
    }

    fn encode_image(image: &[u8], mime: &str) -> String {
        format!("data:{};base64,{}", mime, BASE64_STANDARD.encode(image))
    }
}

#[async_trait]
impl AdvisoryService for LlmAdvisor {
    async fn analyze_image(&self, image: &[u8], mime: &str) -> Result<ItemAnalysis, AdvisoryError> {
        debug!(model = %self.model, size = image.len(), "LlmAdvisor::analyze_image");
        let messages = serde_json::json!([
            { "role": "system", "content": ANALYZE_PROMPT },
            {
                "role": "user",
                "content": [
                    { "type": "text", "text": "Describe this item for a classified ad." },
                    { "type": "image_url", "image_url": { "url": Self::encode_image(image, mime) } },
                ],
            },
        ]);

        let text = self.chat(messages).await?;
        let body: AnalysisBody = serde_json::from_str(Self::json_payload(&text)?)?;
        Ok(ItemAnalysis {
            title: body.title,
            description: body.description,
            brand: body.brand,
            model: body.model,
        })
    }

    async fn select_category(
        &self,
        title: &str,
        description: &str,
        candidates: &[CategoryCandidate],
    ) -> Result<Option<String>, AdvisoryError> {
        debug!(model = %self.model, candidates = candidates.len(), "LlmAdvisor::select_category");
        let messages = serde_json::json!([
            { "role": "system", "content": CATEGORY_PROMPT },
            {
                "role": "user",
                "content": format!(
                    "Listing:\ntitle: {title}\ndescription: {description}\n\nCandidates:\n{}",
                    serde_json::to_string(candidates)?,
                ),
            },
        ]);

        let text = self.chat(messages).await?;
        let body: CategoryBody = serde_json::from_str(Self::json_payload(&text)?)?;
        // The model is advisory: an id outside the candidate list is treated
        // as "not confident", never as a selection
        Ok(body
            .category
            .filter(|id| candidates.iter().any(|c| &c.id == id)))
    }

    async fn select_attributes(
        &self,
        title: &str,
        description: &str,
        attributes: &[AttributeSpec],
    ) -> Result<HashMap<String, String>, AdvisoryError> {
        debug!(model = %self.model, attributes = attributes.len(), "LlmAdvisor::select_attributes");
        if attributes.is_empty() {
            return Ok(HashMap::new());
        }

        let messages = serde_json::json!([
            { "role": "system", "content": ATTRIBUTES_PROMPT },
            {
                "role": "user",
                "content": format!(
                    "Listing:\ntitle: {title}\ndescription: {description}\n\nAttribute specs:\n{}",
                    serde_json::to_string(attributes)?,
                ),
            },
        ]);

        let text = self.chat(messages).await?;
        let raw: HashMap<String, String> = serde_json::from_str(Self::json_payload(&text)?)?;

        // Keep only answers that name a real attribute with a real option id
        Ok(raw
            .into_iter()
            .filter(|(name, option)| {
                attributes
                    .iter()
                    .any(|a| &a.name == name && a.options.iter().any(|o| &o.id == option))
            })
            .collect())
    }
}
