use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};

#[derive(Debug, Deserialize, Clone, Default)]
pub struct Config {
    #[serde(default)]
    pub http: HttpConfig,
    #[serde(default)]
    pub generation: GenerationConfig,
    #[serde(default)]
    pub normalizer: NormalizerConfig,
    #[serde(default)]
    pub context: ContextConfig,
    #[serde(default)]
    pub providers: ProvidersConfig,
    #[serde(default)]
    pub documents: DocumentsConfig,
    #[serde(default)]
    pub embedding: EmbeddingConfig,
    #[serde(default)]
    pub history: HistoryConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct HttpConfig {
    /// Per-request timeout applied to every outbound call.
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            timeout_secs: default_timeout_secs(),
        }
    }
}

fn default_timeout_secs() -> u64 {
    20
}

#[derive(Debug, Deserialize, Clone)]
pub struct GenerationConfig {
    #[serde(default = "default_generation_url")]
    pub base_url: String,
    #[serde(default = "default_generation_model")]
    pub model: String,
    #[serde(default = "default_temperature")]
    pub temperature: f32,
    #[serde(default = "default_generation_key_env")]
    pub api_key_env: String,
}

impl Default for GenerationConfig {
    fn default() -> Self {
        Self {
            base_url: default_generation_url(),
            model: default_generation_model(),
            temperature: default_temperature(),
            api_key_env: default_generation_key_env(),
        }
    }
}

fn default_generation_url() -> String {
    "https://api.groq.com/openai/v1".to_string()
}
fn default_generation_model() -> String {
    "llama3-70b-8192".to_string()
}
fn default_temperature() -> f32 {
    0.3
}
fn default_generation_key_env() -> String {
    "GROQ_API_KEY".to_string()
}

#[derive(Debug, Deserialize, Clone)]
pub struct NormalizerConfig {
    #[serde(default = "default_true")]
    pub enabled: bool,
}

impl Default for NormalizerConfig {
    fn default() -> Self {
        Self { enabled: true }
    }
}

fn default_true() -> bool {
    true
}

#[derive(Debug, Deserialize, Clone)]
pub struct ContextConfig {
    /// `"classify"` (pick one provider) or `"merge"` (query all, concatenate).
    #[serde(default = "default_policy")]
    pub policy: String,
    #[serde(default = "default_max_chars")]
    pub max_chars: usize,
    #[serde(default = "default_informational_cues")]
    pub informational_cues: Vec<String>,
    /// `"disabled"`, `"keyword"`, or `"semantic"`.
    #[serde(default = "default_document_mode")]
    pub document_mode: String,
    #[serde(default = "default_keyword_prefix_chars")]
    pub keyword_prefix_chars: usize,
}

impl Default for ContextConfig {
    fn default() -> Self {
        Self {
            policy: default_policy(),
            max_chars: default_max_chars(),
            informational_cues: default_informational_cues(),
            document_mode: default_document_mode(),
            keyword_prefix_chars: default_keyword_prefix_chars(),
        }
    }
}

fn default_policy() -> String {
    "classify".to_string()
}
fn default_max_chars() -> usize {
    5000
}
fn default_informational_cues() -> Vec<String> {
    [
        "what is",
        "who is",
        "who was",
        "explain",
        "define",
        "history of",
        "origin of",
        "when did",
        "how did",
    ]
    .iter()
    .map(|s| s.to_string())
    .collect()
}
fn default_document_mode() -> String {
    "keyword".to_string()
}
fn default_keyword_prefix_chars() -> usize {
    40
}

#[derive(Debug, Deserialize, Clone, Default)]
pub struct ProvidersConfig {
    #[serde(default)]
    pub wikipedia: WikipediaConfig,
    #[serde(default)]
    pub news: NewsConfig,
    #[serde(default)]
    pub web: WebSearchConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct WikipediaConfig {
    #[serde(default = "default_true")]
    pub enabled: bool,
    #[serde(default = "default_wikipedia_api_url")]
    pub api_url: String,
    #[serde(default = "default_wikipedia_summary_url")]
    pub summary_url: String,
}

impl Default for WikipediaConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            api_url: default_wikipedia_api_url(),
            summary_url: default_wikipedia_summary_url(),
        }
    }
}

fn default_wikipedia_api_url() -> String {
    "https://en.wikipedia.org/w/api.php".to_string()
}
fn default_wikipedia_summary_url() -> String {
    "https://en.wikipedia.org/api/rest_v1/page/summary".to_string()
}

#[derive(Debug, Deserialize, Clone)]
pub struct NewsConfig {
    #[serde(default = "default_true")]
    pub enabled: bool,
    #[serde(default = "default_news_url")]
    pub url: String,
    #[serde(default = "default_news_key_env")]
    pub api_key_env: String,
    #[serde(default = "default_news_language")]
    pub language: String,
    #[serde(default = "default_news_page_size")]
    pub page_size: u32,
    #[serde(default = "default_news_sort_by")]
    pub sort_by: String,
}

impl Default for NewsConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            url: default_news_url(),
            api_key_env: default_news_key_env(),
            language: default_news_language(),
            page_size: default_news_page_size(),
            sort_by: default_news_sort_by(),
        }
    }
}

fn default_news_url() -> String {
    "https://newsapi.org/v2/everything".to_string()
}
fn default_news_key_env() -> String {
    "NEWSAPI_KEY".to_string()
}
fn default_news_language() -> String {
    "en".to_string()
}
fn default_news_page_size() -> u32 {
    5
}
fn default_news_sort_by() -> String {
    "publishedAt".to_string()
}

#[derive(Debug, Deserialize, Clone)]
pub struct WebSearchConfig {
    #[serde(default = "default_true")]
    pub enabled: bool,
    #[serde(default = "default_web_url")]
    pub url: String,
    #[serde(default = "default_web_key_env")]
    pub api_key_env: String,
    #[serde(default = "default_web_max_results")]
    pub max_results: usize,
}

impl Default for WebSearchConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            url: default_web_url(),
            api_key_env: default_web_key_env(),
            max_results: default_web_max_results(),
        }
    }
}

fn default_web_url() -> String {
    "https://google.serper.dev/search".to_string()
}
fn default_web_key_env() -> String {
    "SERPER_KEY".to_string()
}
fn default_web_max_results() -> usize {
    3
}

#[derive(Debug, Deserialize, Clone)]
pub struct DocumentsConfig {
    #[serde(default = "default_upload_dir")]
    pub upload_dir: PathBuf,
    #[serde(default = "default_include_globs")]
    pub include_globs: Vec<String>,
    #[serde(default = "default_chunk_size")]
    pub chunk_size: usize,
    #[serde(default = "default_chunk_overlap")]
    pub chunk_overlap: usize,
    #[serde(default = "default_top_k")]
    pub top_k: usize,
    #[serde(default = "default_filter_candidates")]
    pub filter_candidates: usize,
    #[serde(default = "default_filter_keep")]
    pub filter_keep: usize,
}

impl Default for DocumentsConfig {
    fn default() -> Self {
        Self {
            upload_dir: default_upload_dir(),
            include_globs: default_include_globs(),
            chunk_size: default_chunk_size(),
            chunk_overlap: default_chunk_overlap(),
            top_k: default_top_k(),
            filter_candidates: default_filter_candidates(),
            filter_keep: default_filter_keep(),
        }
    }
}

fn default_upload_dir() -> PathBuf {
    PathBuf::from("uploaded_docs")
}
fn default_include_globs() -> Vec<String> {
    vec![
        "**/*.txt".to_string(),
        "**/*.md".to_string(),
        "**/*.pdf".to_string(),
    ]
}
fn default_chunk_size() -> usize {
    1000
}
fn default_chunk_overlap() -> usize {
    200
}
fn default_top_k() -> usize {
    4
}
fn default_filter_candidates() -> usize {
    10
}
fn default_filter_keep() -> usize {
    3
}

#[derive(Debug, Deserialize, Clone)]
pub struct EmbeddingConfig {
    #[serde(default = "default_provider")]
    pub provider: String,
    #[serde(default)]
    pub model: Option<String>,
    #[serde(default)]
    pub dims: Option<usize>,
    /// Base URL for the Ollama provider.
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default = "default_batch_size")]
    pub batch_size: usize,
    /// Retries while building the index. Query-time embedding is never retried.
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for EmbeddingConfig {
    fn default() -> Self {
        Self {
            provider: "disabled".to_string(),
            model: None,
            dims: None,
            url: None,
            batch_size: 64,
            max_retries: 5,
            timeout_secs: default_timeout_secs(),
        }
    }
}

fn default_provider() -> String {
    "disabled".to_string()
}
fn default_batch_size() -> usize {
    64
}
fn default_max_retries() -> u32 {
    5
}

impl EmbeddingConfig {
    pub fn is_enabled(&self) -> bool {
        self.provider != "disabled"
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct HistoryConfig {
    #[serde(default = "default_history_path")]
    pub path: PathBuf,
    #[serde(default = "default_system_prompt")]
    pub system_prompt: String,
}

impl Default for HistoryConfig {
    fn default() -> Self {
        Self {
            path: default_history_path(),
            system_prompt: default_system_prompt(),
        }
    }
}

fn default_history_path() -> PathBuf {
    PathBuf::from("chat_memory.json")
}
fn default_system_prompt() -> String {
    "You are a helpful assistant with live and historical knowledge.".to_string()
}

/// Load and validate the configuration.
///
/// A missing file is not an error: every section has defaults, so the
/// assistant runs out of the box with only API keys in the environment.
pub fn load_config(path: &Path) -> Result<Config> {
    let config = if path.exists() {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;
        toml::from_str(&content).with_context(|| "Failed to parse config file")?
    } else {
        tracing::debug!(path = %path.display(), "config file not found, using defaults");
        Config::default()
    };

    validate(&config)?;
    Ok(config)
}

pub fn validate(config: &Config) -> Result<()> {
    if config.http.timeout_secs == 0 {
        anyhow::bail!("http.timeout_secs must be > 0");
    }

    if !(0.0..=2.0).contains(&config.generation.temperature) {
        anyhow::bail!("generation.temperature must be in [0.0, 2.0]");
    }

    // Validate context assembly
    match config.context.policy.as_str() {
        "classify" | "merge" => {}
        other => anyhow::bail!(
            "Unknown context policy: '{}'. Must be classify or merge.",
            other
        ),
    }
    if config.context.max_chars == 0 {
        anyhow::bail!("context.max_chars must be > 0");
    }
    if config.context.keyword_prefix_chars == 0 {
        anyhow::bail!("context.keyword_prefix_chars must be > 0");
    }

    // Validate documents
    let docs = &config.documents;
    if docs.chunk_size == 0 {
        anyhow::bail!("documents.chunk_size must be > 0");
    }
    if docs.chunk_overlap >= docs.chunk_size {
        anyhow::bail!("documents.chunk_overlap must be smaller than documents.chunk_size");
    }
    if docs.top_k == 0 {
        anyhow::bail!("documents.top_k must be >= 1");
    }
    if docs.filter_keep == 0 || docs.filter_keep > docs.filter_candidates {
        anyhow::bail!("documents.filter_keep must be in [1, documents.filter_candidates]");
    }

    match config.context.document_mode.as_str() {
        "disabled" | "keyword" => {}
        "semantic" => {
            if !config.embedding.is_enabled() {
                anyhow::bail!(
                    "context.document_mode = \"semantic\" requires an embedding provider"
                );
            }
        }
        other => anyhow::bail!(
            "Unknown document mode: '{}'. Must be disabled, keyword, or semantic.",
            other
        ),
    }

    // Validate embedding
    if config.embedding.is_enabled() {
        if config.embedding.dims.is_none() || config.embedding.dims == Some(0) {
            anyhow::bail!(
                "embedding.dims must be > 0 when provider is '{}'",
                config.embedding.provider
            );
        }
        if config.embedding.model.is_none() {
            anyhow::bail!(
                "embedding.model must be specified when provider is '{}'",
                config.embedding.provider
            );
        }
    }

    match config.embedding.provider.as_str() {
        "disabled" | "openai" | "ollama" => {}
        other => anyhow::bail!(
            "Unknown embedding provider: '{}'. Must be disabled, openai, or ollama.",
            other
        ),
    }

    Ok(())
}
