//! Retrieval from uploaded documents.
//!
//! Two variants:
//! - [`KeywordDocuments`] returns the full text of every document that
//!   contains the start of the query.
//! - [`SemanticDocuments`] returns the chunks nearest to the query embedding.
//!
//! Both re-read the upload directory on each lookup, so newly uploaded
//! files are visible without restarting.

use async_trait::async_trait;
use std::sync::Arc;

use super::{KnowledgeProvider, Query};
use crate::config::DocumentsConfig;
use crate::embedding::{embed_query, EmbeddingProvider};
use crate::error::LookupError;
use crate::library::DocumentLibrary;
use crate::models::{ProviderOutcome, SourceLabel};

/// Substring match of the query prefix against each document.
pub struct KeywordDocuments {
    library: Arc<DocumentLibrary>,
    prefix_chars: usize,
}

impl KeywordDocuments {
    pub fn new(library: Arc<DocumentLibrary>, prefix_chars: usize) -> Self {
        Self {
            library,
            prefix_chars,
        }
    }
}

/// The first `prefix_chars` characters of the lower-cased, trimmed query.
pub fn match_key(query: &str, prefix_chars: usize) -> String {
    query
        .trim()
        .to_lowercase()
        .chars()
        .take(prefix_chars)
        .collect()
}

#[async_trait]
impl KnowledgeProvider for KeywordDocuments {
    fn label(&self) -> SourceLabel {
        SourceLabel::Documents
    }

    async fn lookup(&self, query: &Query<'_>) -> ProviderOutcome {
        let key = match_key(query.text, self.prefix_chars);
        if key.is_empty() {
            return ProviderOutcome::Absent;
        }

        let docs = match self.library.documents() {
            Ok(docs) => docs,
            Err(e) => return ProviderOutcome::Failed(LookupError::Transport(e.to_string())),
        };
        let filter = query.document.map(|d| d.to_lowercase());

        let matched: Vec<&str> = docs
            .iter()
            .filter(|d| {
                filter
                    .as_deref()
                    .map_or(true, |f| d.name.to_lowercase().contains(f))
            })
            .filter(|d| d.text.to_lowercase().contains(&key))
            .map(|d| d.text.as_str())
            .collect();

        tracing::debug!(matched = matched.len(), "keyword document lookup");
        ProviderOutcome::from_text(matched.join("\n\n"))
    }
}

/// Nearest-chunk retrieval over the persisted chunk index.
pub struct SemanticDocuments {
    library: Arc<DocumentLibrary>,
    embedder: Arc<dyn EmbeddingProvider>,
    top_k: usize,
    filter_candidates: usize,
    filter_keep: usize,
}

impl SemanticDocuments {
    pub fn new(
        library: Arc<DocumentLibrary>,
        embedder: Arc<dyn EmbeddingProvider>,
        config: &DocumentsConfig,
    ) -> Self {
        Self {
            library,
            embedder,
            top_k: config.top_k,
            filter_candidates: config.filter_candidates,
            filter_keep: config.filter_keep,
        }
    }
}

#[async_trait]
impl KnowledgeProvider for SemanticDocuments {
    fn label(&self) -> SourceLabel {
        SourceLabel::Documents
    }

    async fn lookup(&self, query: &Query<'_>) -> ProviderOutcome {
        let index = match self.library.load_index() {
            Ok(index) => index,
            Err(e) => return ProviderOutcome::Failed(LookupError::Parse(e.to_string())),
        };
        if index.is_empty() {
            return ProviderOutcome::Absent;
        }
        if index.model != self.embedder.model_name() {
            return ProviderOutcome::Failed(LookupError::Parse(format!(
                "chunk index was built with '{}', not '{}'; run `cchat index`",
                index.model,
                self.embedder.model_name()
            )));
        }

        let query_vec = match embed_query(self.embedder.as_ref(), query.text).await {
            Ok(v) => v,
            Err(e) => return ProviderOutcome::Failed(LookupError::Transport(e.to_string())),
        };

        let hits = match query.document {
            Some(filter) => index.nearest_filtered(
                &query_vec,
                filter,
                self.filter_candidates,
                self.filter_keep,
            ),
            None => index.nearest(&query_vec, self.top_k),
        };

        let text = hits
            .iter()
            .map(|h| h.chunk.text.as_str())
            .collect::<Vec<_>>()
            .join("\n\n");
        ProviderOutcome::from_text(text)
    }
}
