//! External knowledge providers.
//!
//! Each provider answers a single [`Query`] with a [`ProviderOutcome`]:
//! some text, nothing, or a classified failure. Providers never return
//! `Err` and never panic, so one provider's outage cannot block the others.
//!
//! | Provider | Label | Backend |
//! |----------|-------|---------|
//! | [`wikipedia::WikipediaProvider`] | Wikipedia | MediaWiki search + REST summary |
//! | [`news::NewsProvider`] | News | NewsAPI `/v2/everything` |
//! | [`web::WebSearchProvider`] | Web | Serper `/search` |
//! | [`documents::KeywordDocuments`] | Documents | uploaded files, substring match |
//! | [`documents::SemanticDocuments`] | Documents | uploaded files, vector search |

pub mod documents;
pub mod news;
pub mod web;
pub mod wikipedia;

use anyhow::Result;
use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;

use crate::config::Config;
use crate::embedding::EmbeddingProvider;
use crate::error::LookupError;
use crate::library::DocumentLibrary;
use crate::models::{ProviderOutcome, SourceLabel};

/// What the providers are asked about.
#[derive(Debug, Clone, Copy)]
pub struct Query<'a> {
    /// The (already translated) user question.
    pub text: &'a str,
    /// Restrict document retrieval to documents whose name contains this.
    pub document: Option<&'a str>,
}

impl<'a> Query<'a> {
    pub fn new(text: &'a str) -> Self {
        Self {
            text,
            document: None,
        }
    }

    pub fn with_document(mut self, document: Option<&'a str>) -> Self {
        self.document = document;
        self
    }
}

/// A source of auxiliary context for the answer generator.
#[async_trait]
pub trait KnowledgeProvider: Send + Sync {
    /// Which section of the assembled context this provider fills.
    fn label(&self) -> SourceLabel;

    /// Look the query up. Must not panic; failures are reported as
    /// [`ProviderOutcome::Failed`].
    async fn lookup(&self, query: &Query<'_>) -> ProviderOutcome;
}

/// Build the shared HTTP client with the configured per-call timeout.
pub fn http_client(timeout_secs: u64) -> Result<reqwest::Client> {
    Ok(reqwest::Client::builder()
        .timeout(Duration::from_secs(timeout_secs))
        .user_agent(concat!("context-chat/", env!("CARGO_PKG_VERSION")))
        .build()?)
}

/// Read an API key from the environment.
pub(crate) fn api_key(var: &str) -> Result<String, LookupError> {
    std::env::var(var)
        .ok()
        .filter(|k| !k.trim().is_empty())
        .ok_or_else(|| LookupError::Transport(format!("{} environment variable not set", var)))
}

/// Read a response body as JSON, classifying failures.
pub(crate) async fn read_json(
    service: &str,
    response: reqwest::Response,
) -> Result<serde_json::Value, LookupError> {
    let status = response.status();
    if !status.is_success() {
        let body = response.text().await.unwrap_or_default();
        return Err(LookupError::status(service, status, &body));
    }
    let text = response
        .text()
        .await
        .map_err(|e| LookupError::from_reqwest(&e))?;
    serde_json::from_str(&text).map_err(|e| LookupError::Parse(format!("{}: {}", service, e)))
}

/// Instantiate every provider enabled in `config`.
///
/// The document provider follows `context.document_mode`; the semantic
/// variant needs an embedding provider.
pub fn build_providers(
    config: &Config,
    client: &reqwest::Client,
    library: Option<Arc<DocumentLibrary>>,
    embedder: Option<Arc<dyn EmbeddingProvider>>,
) -> Result<Vec<Box<dyn KnowledgeProvider>>> {
    let mut providers: Vec<Box<dyn KnowledgeProvider>> = Vec::new();
    let p = &config.providers;

    if p.wikipedia.enabled {
        providers.push(Box::new(wikipedia::WikipediaProvider::new(
            client.clone(),
            &p.wikipedia,
        )));
    }
    if p.news.enabled {
        providers.push(Box::new(news::NewsProvider::new(client.clone(), &p.news)));
    }
    if p.web.enabled {
        providers.push(Box::new(web::WebSearchProvider::new(client.clone(), &p.web)));
    }

    match (config.context.document_mode.as_str(), library) {
        ("keyword", Some(lib)) => providers.push(Box::new(documents::KeywordDocuments::new(
            lib,
            config.context.keyword_prefix_chars,
        ))),
        ("semantic", Some(lib)) => {
            let embedder = embedder
                .ok_or_else(|| anyhow::anyhow!("semantic document mode needs embeddings"))?;
            providers.push(Box::new(documents::SemanticDocuments::new(
                lib,
                embedder,
                &config.documents,
            )));
        }
        _ => {}
    }

    Ok(providers)
}
