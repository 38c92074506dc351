//! Chat-completion backend (OpenAI-compatible, DeepInfra by default).

use serde::{Deserialize, Serialize};
use tracing::{debug, error};

use crate::config::LlmConfig;

pub const TARGET_LLM: &str = "llm";

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum LlmError {
    #[error("no API key: set `llm.api_key` or the {0} environment variable")]
    MissingApiKey(String),
    #[error("LLM transport error: {0}")]
    Transport(String),
    #[error("LLM endpoint returned HTTP {0}")]
    Status(u16),
    #[error("LLM returned no content")]
    EmptyResponse,
    #[error("invalid LLM response: {0}")]
    InvalidResponse(String),
}

/// A single prompt in, a single completion out.
pub trait ChatModel: Send + Sync {
    fn complete(&self, model: &str, prompt: &str) -> Result<String, LlmError>;
}

#[derive(Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
    temperature: f32,
    max_tokens: u32,
}

#[derive(Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<ChatChoice>,
}

#[derive(Deserialize)]
struct ChatChoice {
    message: ChatResponseMessage,
}

#[derive(Deserialize)]
struct ChatResponseMessage {
    #[serde(default)]
    content: Option<String>,
}

/// Pull the first choice's content out of a `/chat/completions` body.
pub fn parse_completion(body: &str) -> Result<String, LlmError> {
    let response: ChatResponse =
        serde_json::from_str(body).map_err(|e| LlmError::InvalidResponse(e.to_string()))?;

    response
        .choices
        .into_iter()
        .next()
        .and_then(|c| c.message.content)
        .filter(|c| !c.trim().is_empty())
        .ok_or(LlmError::EmptyResponse)
}

/// Blocking client for any OpenAI-compatible chat endpoint.
pub struct OpenAiCompatClient {
    config: LlmConfig,
    api_key: String,
    agent: ureq::Agent,
}

impl OpenAiCompatClient {
    pub fn new(config: LlmConfig) -> Result<Self, LlmError> {
        let api_key = config
            .resolve_api_key()
            .ok_or_else(|| LlmError::MissingApiKey(config.api_key_env.clone()))?;
        let agent = ureq::AgentBuilder::new().timeout(config.timeout()).build();
        debug!(target: TARGET_LLM, base_url = %config.base_url, "LLM client initialized");
        Ok(Self { config, api_key, agent })
    }
}

impl ChatModel for OpenAiCompatClient {
    fn complete(&self, model: &str, prompt: &str) -> Result<String, LlmError> {
        let url = format!("{}/chat/completions", self.config.base_url.trim_end_matches('/'));
        let request = ChatRequest {
            model,
            messages: vec![ChatMessage { role: "user", content: prompt }],
            temperature: self.config.temperature,
            max_tokens: self.config.max_tokens,
        };

        debug!(target: TARGET_LLM, model, prompt_len = prompt.len(), "sending completion request");

        let response = self
            .agent
            .post(&url)
            .set("Authorization", &format!("Bearer {}", self.api_key))
            .send_json(&request)
            .map_err(|e| match e {
                ureq::Error::Status(code, _) => LlmError::Status(code),
                ureq::Error::Transport(t) => LlmError::Transport(t.to_string()),
            })
            .inspect_err(|e| error!(target: TARGET_LLM, model, error = %e, "completion request failed"))?;

        let body = response
            .into_string()
            .map_err(|e| LlmError::InvalidResponse(e.to_string()))?;

        let content = parse_completion(&body)?;
        debug!(target: TARGET_LLM, model, response = %content, "completion received");
        Ok(content)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_completion() {
        let body = r#"{"id":"x","choices":[{"index":0,"message":{"role":"assistant","content":"Event Type: Flood"}}]}"#;
        assert_eq!(parse_completion(body).unwrap(), "Event Type: Flood");
    }

    #[test]
    fn test_parse_completion_empty() {
        assert_eq!(parse_completion(r#"{"choices":[]}"#), Err(LlmError::EmptyResponse));
        assert_eq!(
            parse_completion(r#"{"choices":[{"message":{"content":"  "}}]}"#),
            Err(LlmError::EmptyResponse)
        );
        assert!(matches!(parse_completion("<html>"), Err(LlmError::InvalidResponse(_))));
    }

    #[test]
    fn test_missing_api_key() {
        let config = LlmConfig {
            api_key: None,
            api_key_env: "EVENT_ATLAS_TEST_NO_SUCH_KEY".into(),
            ..LlmConfig::default()
        };
        assert!(matches!(OpenAiCompatClient::new(config), Err(LlmError::MissingApiKey(_))));
    }
}
