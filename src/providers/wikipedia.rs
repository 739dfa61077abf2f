//! Encyclopedia lookups against Wikipedia.
//!
//! Two steps: a full-text search for the cleaned query, then the REST
//! summary of the top hit. If that summary is missing or empty, one more
//! summary fetch is tried with a title guessed from the query itself
//! (`"Black holes"` → `black_holes`).

use async_trait::async_trait;

use super::{read_json, KnowledgeProvider, Query};
use crate::config::WikipediaConfig;
use crate::error::LookupError;
use crate::models::{ProviderOutcome, SourceLabel};

pub struct WikipediaProvider {
    client: reqwest::Client,
    api_url: String,
    summary_url: String,
}

impl WikipediaProvider {
    pub fn new(client: reqwest::Client, config: &WikipediaConfig) -> Self {
        Self {
            client,
            api_url: config.api_url.clone(),
            summary_url: config.summary_url.clone(),
        }
    }

    /// Title of the best search hit, with spaces as underscores.
    async fn search(&self, cleaned: &str) -> Result<Option<String>, LookupError> {
        let response = self
            .client
            .get(&self.api_url)
            .query(&[
                ("action", "query"),
                ("list", "search"),
                ("srsearch", cleaned),
                ("format", "json"),
            ])
            .send()
            .await
            .map_err(|e| LookupError::from_reqwest(&e))?;
        let json = read_json("wikipedia search", response).await?;

        let hits = json
            .pointer("/query/search")
            .and_then(|s| s.as_array())
            .cloned()
            .unwrap_or_default();
        match hits.first() {
            None => Ok(None),
            Some(hit) => {
                let title = hit
                    .get("title")
                    .and_then(|t| t.as_str())
                    .ok_or_else(|| LookupError::Parse("search hit without title".to_string()))?;
                Ok(Some(title.replace(' ', "_")))
            }
        }
    }

    /// The summary extract for `title`; `None` on a non-2xx status.
    async fn summary(&self, title: &str) -> Result<Option<String>, LookupError> {
        let mut url = reqwest::Url::parse(&self.summary_url)
            .map_err(|e| LookupError::Transport(format!("bad summary url: {}", e)))?;
        url.path_segments_mut()
            .map_err(|_| LookupError::Transport("summary url cannot be a base".to_string()))?
            .pop_if_empty()
            .push(title);

        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| LookupError::from_reqwest(&e))?;
        if !response.status().is_success() {
            tracing::debug!(title, status = %response.status(), "no wikipedia summary");
            return Ok(None);
        }
        let json = read_json("wikipedia summary", response).await?;
        Ok(json
            .get("extract")
            .and_then(|e| e.as_str())
            .map(|s| s.to_string()))
    }
}

#[async_trait]
impl KnowledgeProvider for WikipediaProvider {
    fn label(&self) -> SourceLabel {
        SourceLabel::Wikipedia
    }

    async fn lookup(&self, query: &Query<'_>) -> ProviderOutcome {
        let cleaned = clean_query(query.text);
        if cleaned.is_empty() {
            return ProviderOutcome::Absent;
        }

        let top_title = match self.search(&cleaned).await {
            Ok(Some(title)) => title,
            Ok(None) => return ProviderOutcome::Absent,
            Err(e) => return ProviderOutcome::Failed(e),
        };

        match self.summary(&top_title).await {
            Ok(Some(extract)) if !extract.trim().is_empty() => {
                return ProviderOutcome::Present(extract)
            }
            Ok(_) => {}
            Err(e) => tracing::debug!(title = %top_title, error = %e, "summary fetch failed"),
        }

        let fallback = fallback_title(&cleaned);
        match self.summary(&fallback).await {
            Ok(Some(extract)) => ProviderOutcome::from_text(extract),
            Ok(None) => ProviderOutcome::Absent,
            Err(e) => ProviderOutcome::Failed(e),
        }
    }
}

/// Keep ASCII letters, digits, and spaces; trim the rest.
pub fn clean_query(query: &str) -> String {
    query
        .chars()
        .filter(|c| c.is_ascii_alphanumeric() || *c == ' ')
        .collect::<String>()
        .trim()
        .to_string()
}

/// Guess an article title directly from the cleaned query.
pub fn fallback_title(cleaned: &str) -> String {
    cleaned.to_lowercase().replace(' ', "_")
}
