// src/shipments/ai/generator.rs
//! Text-generation collaborator.
//!
//! The pipeline treats the model as a black box: instructions and turns go
//! in, free text comes out, and every returned string is untrusted until the
//! normalizer and sanitizer have been over it. The trait boundary exists so
//! tests can script responses without any network.

use crate::shipments::error::{PipelineResult, QueryError};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Who said a conversation turn.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
}

/// One message in the conversation supplied by the caller. The pipeline
/// never persists turns; durability is the caller's responsibility.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConversationTurn {
    pub role: Role,
    pub content: String,
}

impl ConversationTurn {
    pub fn user(content: impl Into<String>) -> Self {
        Self { role: Role::User, content: content.into() }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self { role: Role::Assistant, content: content.into() }
    }
}

/// A complete generation request. Built fresh per call, never mutated after
/// construction.
#[derive(Debug, Clone)]
pub struct GenerationRequest {
    pub system_instructions: String,
    pub prior_turns: Vec<ConversationTurn>,
    pub current_question: String,
}

/// The generation collaborator itself.
pub trait TextGenerator {
    fn generate(&self, request: &GenerationRequest) -> PipelineResult<String>;
}

/// Gemini generateContent client over blocking HTTP.
pub struct GeminiGenerator {
    client: reqwest::blocking::Client,
    api_key: String,
    model: String,
    endpoint: String,
}

const DEFAULT_ENDPOINT: &str = "https://generativelanguage.googleapis.com/v1beta/models";
const REQUEST_TIMEOUT: Duration = Duration::from_secs(60);

impl GeminiGenerator {
    pub fn new(api_key: impl Into<String>, model: impl Into<String>) -> PipelineResult<Self> {
        Self::with_endpoint(api_key, model, DEFAULT_ENDPOINT)
    }

    /// Endpoint override for tests pointed at a local stub server.
    pub fn with_endpoint(
        api_key: impl Into<String>,
        model: impl Into<String>,
        endpoint: impl Into<String>,
    ) -> PipelineResult<Self> {
        let client = reqwest::blocking::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .map_err(|e| QueryError::GenerationError(e.to_string()))?;
        Ok(Self {
            client,
            api_key: api_key.into(),
            model: model.into(),
            endpoint: endpoint.into(),
        })
    }

    fn build_payload(request: &GenerationRequest) -> serde_json::Value {
        let mut contents = Vec::new();
        for turn in &request.prior_turns {
            let role = match turn.role {
                Role::User => "user",
                Role::Assistant => "model",
            };
            contents.push(serde_json::json!({
                "role": role,
                "parts": [{ "text": turn.content }],
            }));
        }
        contents.push(serde_json::json!({
            "role": "user",
            "parts": [{ "text": request.current_question }],
        }));

        serde_json::json!({
            "system_instruction": { "parts": [{ "text": request.system_instructions }] },
            "contents": contents,
        })
    }

    fn extract_text(body: &serde_json::Value) -> Option<String> {
        body.get("candidates")?
            .get(0)?
            .get("content")?
            .get("parts")?
            .get(0)?
            .get("text")?
            .as_str()
            .map(|s| s.to_string())
    }
}

impl TextGenerator for GeminiGenerator {
    fn generate(&self, request: &GenerationRequest) -> PipelineResult<String> {
        let url = format!(
            "{}/{}:generateContent?key={}",
            self.endpoint, self.model, self.api_key
        );
        let payload = Self::build_payload(request);

        let response = self
            .client
            .post(&url)
            .json(&payload)
            .send()
            .map_err(|e| QueryError::GenerationError(e.to_string()))?;

        let status = response.status();
        let body: serde_json::Value = response
            .json()
            .map_err(|e| QueryError::GenerationError(e.to_string()))?;

        if !status.is_success() {
            let detail = body
                .get("error")
                .and_then(|e| e.get("message"))
                .and_then(|m| m.as_str())
                .unwrap_or("unknown API error");
            return Err(QueryError::GenerationError(format!(
                "{} ({})",
                detail, status
            )));
        }

        Self::extract_text(&body).ok_or_else(|| {
            QueryError::GenerationError("response contained no candidate text".to_string())
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_payload_maps_roles_and_appends_question() {
        let request = GenerationRequest {
            system_instructions: "rules".to_string(),
            prior_turns: vec![
                ConversationTurn::user("status is Done"),
                ConversationTurn::assistant("SELECT * FROM shipments WHERE LOWER(status) = 'done';"),
            ],
            current_question: "what is the total?".to_string(),
        };

        let payload = GeminiGenerator::build_payload(&request);
        let contents = payload["contents"].as_array().unwrap();
        assert_eq!(contents.len(), 3);
        assert_eq!(contents[0]["role"], "user");
        assert_eq!(contents[1]["role"], "model");
        assert_eq!(contents[2]["parts"][0]["text"], "what is the total?");
        assert_eq!(payload["system_instruction"]["parts"][0]["text"], "rules");
    }

    #[test]
    fn test_extract_text_from_candidate() {
        let body = serde_json::json!({
            "candidates": [{
                "content": { "parts": [{ "text": "SELECT 1;" }] }
            }]
        });
        assert_eq!(GeminiGenerator::extract_text(&body).unwrap(), "SELECT 1;");
        assert!(GeminiGenerator::extract_text(&serde_json::json!({})).is_none());
    }
}
