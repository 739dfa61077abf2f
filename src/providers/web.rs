//! General web search through the Serper API.

use async_trait::async_trait;

use super::{api_key, read_json, KnowledgeProvider, Query};
use crate::config::WebSearchConfig;
use crate::error::LookupError;
use crate::models::{ProviderOutcome, SourceLabel};

pub struct WebSearchProvider {
    client: reqwest::Client,
    config: WebSearchConfig,
}

impl WebSearchProvider {
    pub fn new(client: reqwest::Client, config: &WebSearchConfig) -> Self {
        Self {
            client,
            config: config.clone(),
        }
    }

    async fn fetch(&self, query: &str) -> Result<serde_json::Value, LookupError> {
        let key = api_key(&self.config.api_key_env)?;
        let response = self
            .client
            .post(&self.config.url)
            .header("X-API-KEY", key)
            .json(&serde_json::json!({ "q": query }))
            .send()
            .await
            .map_err(|e| LookupError::from_reqwest(&e))?;
        read_json("serper", response).await
    }
}

#[async_trait]
impl KnowledgeProvider for WebSearchProvider {
    fn label(&self) -> SourceLabel {
        SourceLabel::Web
    }

    async fn lookup(&self, query: &Query<'_>) -> ProviderOutcome {
        match self.fetch(query.text).await {
            Ok(json) => ProviderOutcome::from_text(format_results(&json, self.config.max_results)),
            Err(e) => ProviderOutcome::Failed(e),
        }
    }
}

/// The first `max` organic results, each as title, snippet, and link lines.
///
/// A response without an `organic` array has no results.
pub fn format_results(json: &serde_json::Value, max: usize) -> String {
    let organic = match json.get("organic").and_then(|o| o.as_array()) {
        Some(o) => o,
        None => return String::new(),
    };

    organic
        .iter()
        .take(max)
        .map(|r| {
            format!(
                "- {}\n  {}\n  🔗 {}",
                str_field(r, "title"),
                str_field(r, "snippet"),
                str_field(r, "link")
            )
        })
        .collect::<Vec<_>>()
        .join("\n")
}

fn str_field<'a>(value: &'a serde_json::Value, key: &str) -> &'a str {
    value.get(key).and_then(|v| v.as_str()).unwrap_or("")
}
