//! OpenAI-compatible chat-completion client.
//!
//! Both the answer generator and the language normalizer talk to the model
//! through the [`CompletionBackend`] trait, so they can be exercised in
//! tests without a network.

use anyhow::Result;
use async_trait::async_trait;

use crate::config::GenerationConfig;
use crate::error::LookupError;
use crate::models::Message;
use crate::providers::read_json;

#[async_trait]
pub trait CompletionBackend: Send + Sync {
    /// Send `messages` and return the generated text. Called exactly once
    /// per request; no retries.
    async fn complete(&self, messages: &[Message], temperature: f32)
        -> Result<String, LookupError>;
}

pub struct ChatClient {
    client: reqwest::Client,
    endpoint: String,
    model: String,
    api_key: Option<String>,
}

impl ChatClient {
    /// Build a client for the configured endpoint. The API key is read from
    /// `generation.api_key_env`; without one, requests are sent unauthenticated
    /// (useful for local OpenAI-compatible servers).
    pub fn new(client: reqwest::Client, config: &GenerationConfig) -> Self {
        let api_key = std::env::var(&config.api_key_env)
            .ok()
            .filter(|k| !k.is_empty());
        if api_key.is_none() {
            tracing::debug!(var = %config.api_key_env, "no generation API key set");
        }
        Self {
            client,
            endpoint: endpoint(&config.base_url),
            model: config.model.clone(),
            api_key,
        }
    }
}

/// Resolve the chat completions endpoint from the base URL.
pub fn endpoint(base_url: &str) -> String {
    let base = base_url.trim_end_matches('/');
    if base.ends_with("/chat/completions") {
        base.to_string()
    } else if base.ends_with("/v1") {
        format!("{}/chat/completions", base)
    } else {
        format!("{}/v1/chat/completions", base)
    }
}

#[async_trait]
impl CompletionBackend for ChatClient {
    async fn complete(
        &self,
        messages: &[Message],
        temperature: f32,
    ) -> Result<String, LookupError> {
        let body = serde_json::json!({
            "model": self.model,
            "messages": messages,
            "temperature": temperature,
        });

        let mut req = self.client.post(&self.endpoint).json(&body);
        if let Some(key) = &self.api_key {
            req = req.header("Authorization", format!("Bearer {}", key));
        }

        let response = req.send().await.map_err(|e| LookupError::from_reqwest(&e))?;
        let json = read_json("chat completion", response).await?;
        parse_completion(&json)
    }
}

/// Extract `choices[0].message.content`.
pub fn parse_completion(json: &serde_json::Value) -> Result<String, LookupError> {
    json.pointer("/choices/0/message/content")
        .and_then(|c| c.as_str())
        .map(|s| s.to_string())
        .ok_or_else(|| LookupError::Parse("completion without choices[0].message.content".into()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn endpoint_variants() {
        assert_eq!(
            endpoint("https://api.groq.com/openai/v1"),
            "https://api.groq.com/openai/v1/chat/completions"
        );
        assert_eq!(
            endpoint("http://localhost:1234/"),
            "http://localhost:1234/v1/chat/completions"
        );
        assert_eq!(
            endpoint("http://x/v1/chat/completions"),
            "http://x/v1/chat/completions"
        );
    }

    #[test]
    fn parses_first_choice() {
        let json = json!({
            "choices": [ { "message": { "role": "assistant", "content": "Hi" } } ]
        });
        assert_eq!(parse_completion(&json).unwrap(), "Hi");
    }

    #[test]
    fn null_content_is_parse_error() {
        let json = json!({ "choices": [ { "message": { "content": null } } ] });
        assert!(matches!(parse_completion(&json), Err(LookupError::Parse(_))));
        assert!(parse_completion(&json!({ "error": "x" })).is_err());
    }
}
