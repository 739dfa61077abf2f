//! Recent headlines from NewsAPI.

use async_trait::async_trait;
use chrono::DateTime;

use super::{api_key, read_json, KnowledgeProvider, Query};
use crate::config::NewsConfig;
use crate::error::LookupError;
use crate::models::{ProviderOutcome, SourceLabel};

pub struct NewsProvider {
    client: reqwest::Client,
    config: NewsConfig,
}

impl NewsProvider {
    pub fn new(client: reqwest::Client, config: &NewsConfig) -> Self {
        Self {
            client,
            config: config.clone(),
        }
    }

    async fn fetch(&self, query: &str) -> Result<serde_json::Value, LookupError> {
        let key = api_key(&self.config.api_key_env)?;
        let page_size = self.config.page_size.to_string();
        let response = self
            .client
            .get(&self.config.url)
            .query(&[
                ("q", query),
                ("language", self.config.language.as_str()),
                ("pageSize", page_size.as_str()),
                ("sortBy", self.config.sort_by.as_str()),
                ("apiKey", key.as_str()),
            ])
            .send()
            .await
            .map_err(|e| LookupError::from_reqwest(&e))?;
        read_json("newsapi", response).await
    }
}

#[async_trait]
impl KnowledgeProvider for NewsProvider {
    fn label(&self) -> SourceLabel {
        SourceLabel::News
    }

    async fn lookup(&self, query: &Query<'_>) -> ProviderOutcome {
        let json = match self.fetch(query.text).await {
            Ok(json) => json,
            Err(e) => return ProviderOutcome::Failed(e),
        };
        match format_headlines(&json) {
            Ok(text) => ProviderOutcome::from_text(text),
            Err(e) => ProviderOutcome::Failed(e),
        }
    }
}

/// One line per article: `- <title> (📅 <date>, Source: <name>)`.
pub fn format_headlines(json: &serde_json::Value) -> Result<String, LookupError> {
    let articles = json
        .get("articles")
        .and_then(|a| a.as_array())
        .ok_or_else(|| LookupError::Parse("newsapi: missing articles array".to_string()))?;

    let lines: Vec<String> = articles
        .iter()
        .filter_map(|a| {
            let title = a.get("title")?.as_str()?;
            let published = a
                .get("publishedAt")
                .and_then(|p| p.as_str())
                .map(publication_date)
                .unwrap_or_else(|| "unknown date".to_string());
            let source = a
                .pointer("/source/name")
                .and_then(|s| s.as_str())
                .unwrap_or("unknown");
            Some(format!("- {} (📅 {}, Source: {})", title, published, source))
        })
        .collect();

    Ok(lines.join("\n"))
}

/// `2024-05-01T12:00:00Z` → `2024-05-01`.
fn publication_date(raw: &str) -> String {
    match DateTime::parse_from_rfc3339(raw) {
        Ok(dt) => dt.format("%Y-%m-%d").to_string(),
        Err(_) => raw.chars().take(10).collect(),
    }
}
