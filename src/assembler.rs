//! Context assembly: which providers to ask, and how to merge what they say.
//!
//! # Policies
//!
//! **Classify**: if the query contains an informational cue (`"what is"`,
//! `"who was"`, `"explain"`, …) ask Wikipedia only. Otherwise ask the news
//! provider and fall back to web search when news has nothing. At most one
//! provider's text becomes the context, without a header.
//!
//! **Merge**: ask every configured provider concurrently and concatenate
//! the present results, each under its label header, always in the order
//! Wikipedia, News, Web, Documents regardless of which answered first.
//!
//! In both policies the result is cut to `max_chars` characters. Failed
//! lookups are logged and contribute nothing.

use anyhow::{bail, Result};
use std::collections::BTreeMap;
use std::str::FromStr;

use crate::config::ContextConfig;
use crate::models::{AssembledContext, ProviderOutcome, ProviderResult, SourceLabel};
use crate::providers::{KnowledgeProvider, Query};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Policy {
    Classify,
    Merge,
}

impl FromStr for Policy {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "classify" => Ok(Policy::Classify),
            "merge" => Ok(Policy::Merge),
            other => bail!("Unknown context policy: {}", other),
        }
    }
}

#[derive(Debug, Clone)]
pub struct AssemblerConfig {
    pub policy: Policy,
    pub max_chars: usize,
    pub informational_cues: Vec<String>,
}

impl AssemblerConfig {
    pub fn from_config(config: &ContextConfig) -> Result<Self> {
        Ok(Self {
            policy: config.policy.parse()?,
            max_chars: config.max_chars,
            informational_cues: config.informational_cues.clone(),
        })
    }
}

pub struct ContextAssembler {
    config: AssemblerConfig,
    providers: BTreeMap<SourceLabel, Box<dyn KnowledgeProvider>>,
}

impl ContextAssembler {
    pub fn new(config: AssemblerConfig) -> Self {
        Self {
            config,
            providers: BTreeMap::new(),
        }
    }

    /// Register a provider under its label, replacing any previous one.
    pub fn register(&mut self, provider: Box<dyn KnowledgeProvider>) {
        self.providers.insert(provider.label(), provider);
    }

    pub fn with_providers(mut self, providers: Vec<Box<dyn KnowledgeProvider>>) -> Self {
        for p in providers {
            self.register(p);
        }
        self
    }

    pub fn policy(&self) -> Policy {
        self.config.policy
    }

    pub fn labels(&self) -> Vec<SourceLabel> {
        self.providers.keys().copied().collect()
    }

    pub async fn assemble(&self, query: &Query<'_>) -> AssembledContext {
        match self.config.policy {
            Policy::Classify => self.classify_then_branch(query).await,
            Policy::Merge => self.merge_all(query).await,
        }
    }

    async fn classify_then_branch(&self, query: &Query<'_>) -> AssembledContext {
        let result = if is_informational(query.text, &self.config.informational_cues) {
            tracing::debug!("informational query");
            self.lookup(SourceLabel::Wikipedia, query).await
        } else {
            tracing::debug!("time-sensitive query");
            match self.lookup(SourceLabel::News, query).await {
                Some(news) if news.outcome.is_present() => Some(news),
                _ => self.lookup(SourceLabel::Web, query).await,
            }
        };

        match result {
            Some(ProviderResult {
                label,
                outcome: ProviderOutcome::Present(text),
            }) => AssembledContext {
                text: truncate_chars(&text, self.config.max_chars),
                sources: vec![label],
            },
            _ => AssembledContext::empty(),
        }
    }

    async fn merge_all(&self, query: &Query<'_>) -> AssembledContext {
        let (wikipedia, news, web, documents) = tokio::join!(
            self.lookup(SourceLabel::Wikipedia, query),
            self.lookup(SourceLabel::News, query),
            self.lookup(SourceLabel::Web, query),
            self.lookup(SourceLabel::Documents, query),
        );
        let results: Vec<ProviderResult> = [wikipedia, news, web, documents]
            .into_iter()
            .flatten()
            .collect();
        merge_results(&results, self.config.max_chars)
    }

    /// Run one provider, if registered, and log what happened.
    async fn lookup(&self, label: SourceLabel, query: &Query<'_>) -> Option<ProviderResult> {
        let provider = self.providers.get(&label)?;
        let outcome = provider.lookup(query).await;
        match &outcome {
            ProviderOutcome::Present(text) => {
                tracing::info!(source = %label, chars = text.chars().count(), "context found")
            }
            ProviderOutcome::Absent => tracing::info!(source = %label, "no context found"),
            ProviderOutcome::Failed(e) => {
                tracing::warn!(source = %label, error = %e, "provider lookup failed")
            }
        }
        Some(ProviderResult { label, outcome })
    }
}

/// Case-insensitive substring match of any cue against the query.
pub fn is_informational(query: &str, cues: &[String]) -> bool {
    let lower = query.to_lowercase();
    cues.iter().any(|cue| lower.contains(&cue.to_lowercase()))
}

/// Concatenate present results in label order, each under its header,
/// then cut to `max_chars`.
pub fn merge_results(results: &[ProviderResult], max_chars: usize) -> AssembledContext {
    let mut present: Vec<(SourceLabel, &str)> = results
        .iter()
        .filter_map(|r| r.outcome.text().map(|t| (r.label, t)))
        .collect();
    present.sort_by_key(|(label, _)| *label);

    let mut text = String::new();
    let mut sources = Vec::new();
    for (label, body) in present {
        if !text.is_empty() {
            text.push_str("\n\n");
        }
        // A section whose header falls past the budget is cut entirely.
        if text.chars().count() < max_chars {
            sources.push(label);
        }
        text.push_str(label.header());
        text.push('\n');
        text.push_str(body);
    }

    AssembledContext {
        text: truncate_chars(&text, max_chars),
        sources,
    }
}

/// Keep at most `max_chars` characters, never splitting a code point.
pub fn truncate_chars(text: &str, max_chars: usize) -> String {
    match text.char_indices().nth(max_chars) {
        Some((byte, _)) => text[..byte].to_string(),
        None => text.to_string(),
    }
}
