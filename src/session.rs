//! One chat session: everything a turn needs, wired from [`Config`].
//!
//! A turn runs translate → assemble → generate → persist. The
//! [`Conversation`] is owned by the caller and passed into each turn.

use anyhow::Result;
use std::sync::Arc;

use crate::assembler::{truncate_chars, AssemblerConfig, ContextAssembler};
use crate::config::Config;
use crate::embedding::{create_provider, EmbeddingProvider};
use crate::generator::AnswerGenerator;
use crate::history::HistoryStore;
use crate::library::DocumentLibrary;
use crate::llm::{ChatClient, CompletionBackend};
use crate::models::{Conversation, Message, SourceLabel, UploadedDocument};
use crate::normalizer::LanguageNormalizer;
use crate::providers::{build_providers, http_client, Query};

/// What a turn produced, beyond the reply already appended to the log.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TurnOutcome {
    pub reply: String,
    /// The query as sent to the providers (after translation).
    pub query: String,
    /// Sources that contributed context, in merge order.
    pub sources: Vec<SourceLabel>,
}

pub struct ChatSession {
    normalizer: LanguageNormalizer,
    assembler: ContextAssembler,
    generator: AnswerGenerator,
    history: HistoryStore,
    library: Option<Arc<DocumentLibrary>>,
    embedder: Option<Arc<dyn EmbeddingProvider>>,
    max_context_chars: usize,
    document_filter: Option<String>,
}

impl ChatSession {
    pub fn new(
        normalizer: LanguageNormalizer,
        assembler: ContextAssembler,
        generator: AnswerGenerator,
        history: HistoryStore,
        max_context_chars: usize,
    ) -> Self {
        Self {
            normalizer,
            assembler,
            generator,
            history,
            library: None,
            embedder: None,
            max_context_chars,
            document_filter: None,
        }
    }

    /// Build a session from configuration: one shared HTTP client, the
    /// completion backend, every enabled provider and the history store.
    pub fn from_config(config: &Config) -> Result<Self> {
        let client = http_client(config.http.timeout_secs)?;
        let backend: Arc<dyn CompletionBackend> =
            Arc::new(ChatClient::new(client.clone(), &config.generation));

        let library = if config.context.document_mode == "disabled" {
            None
        } else {
            Some(Arc::new(DocumentLibrary::open(&config.documents)?))
        };
        let embedder: Option<Arc<dyn EmbeddingProvider>> = if config.embedding.is_enabled() {
            Some(Arc::from(create_provider(&config.embedding)?))
        } else {
            None
        };

        let providers = build_providers(config, &client, library.clone(), embedder.clone())?;
        let assembler = ContextAssembler::new(AssemblerConfig::from_config(&config.context)?)
            .with_providers(providers);
        tracing::debug!(
            policy = ?assembler.policy(),
            providers = ?assembler.labels(),
            "session ready"
        );

        let mut session = Self::new(
            LanguageNormalizer::new(backend.clone(), config.normalizer.enabled),
            assembler,
            AnswerGenerator::new(
                backend,
                config.generation.temperature,
                config.context.max_chars,
            ),
            HistoryStore::from_config(&config.history),
            config.context.max_chars,
        );
        session.library = library;
        session.embedder = embedder;
        Ok(session)
    }

    pub fn history(&self) -> &HistoryStore {
        &self.history
    }

    pub fn library(&self) -> Option<&Arc<DocumentLibrary>> {
        self.library.as_ref()
    }

    pub fn embedder(&self) -> Option<&Arc<dyn EmbeddingProvider>> {
        self.embedder.as_ref()
    }

    /// Restrict document retrieval to documents whose name contains `filter`.
    pub fn set_document_filter(&mut self, filter: Option<String>) {
        self.document_filter = filter.filter(|f| !f.trim().is_empty());
    }

    pub fn document_filter(&self) -> Option<&str> {
        self.document_filter.as_deref()
    }

    /// Process one user turn.
    ///
    /// The raw input is logged, not the translation. Only history
    /// persistence errors are returned; every other failure degrades into
    /// less context or the failure reply.
    pub async fn turn(&self, conversation: &mut Conversation, input: &str) -> Result<TurnOutcome> {
        self.history.append(conversation, Message::user(input));

        let query = self.normalizer.to_english(input).await;
        let context = self
            .assembler
            .assemble(&Query::new(&query).with_document(self.document_filter.as_deref()))
            .await;
        tracing::info!(
            chars = context.char_len(),
            sources = ?context.sources,
            "context assembled"
        );

        let reply = self
            .generator
            .answer(conversation.system_prompt(), &query, &context)
            .await;
        self.history
            .append(conversation, Message::assistant(reply.clone()));
        self.history.persist(conversation)?;

        Ok(TurnOutcome {
            reply,
            query,
            sources: context.sources,
        })
    }

    /// Answer a question from a single document's text.
    ///
    /// The question is used as typed and nothing is recorded in history.
    pub async fn ask_document(&self, document: &UploadedDocument, question: &str) -> String {
        let text = truncate_chars(&document.text, self.max_context_chars);
        tracing::info!(
            document = %document.name,
            chars = text.chars().count(),
            "document question"
        );
        self.generator.answer_document(&text, question).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::assembler::Policy;
    use crate::config::ContextConfig;
    use crate::error::LookupError;
    use crate::generator::GENERATION_FAILED_REPLY;
    use crate::models::{ProviderOutcome, Role};
    use crate::providers::KnowledgeProvider;
    use async_trait::async_trait;
    use std::path::PathBuf;
    use std::sync::Mutex;
    use tempfile::TempDir;

    /// Translates by upper-casing (temperature 0) and answers with a fixed
    /// reply, recording every answer prompt.
    struct FakeModel {
        answer: Result<String, LookupError>,
        prompts: Mutex<Vec<Vec<Message>>>,
    }

    #[async_trait]
    impl CompletionBackend for FakeModel {
        async fn complete(
            &self,
            messages: &[Message],
            temperature: f32,
        ) -> Result<String, LookupError> {
            if temperature == 0.0 {
                return Ok(messages[1].content.to_uppercase());
            }
            self.prompts.lock().unwrap().push(messages.to_vec());
            self.answer.clone()
        }
    }

    /// Records the queries it sees and answers with fixed text.
    struct RecordingProvider {
        label: SourceLabel,
        text: &'static str,
        seen: Arc<Mutex<Vec<(String, Option<String>)>>>,
    }

    #[async_trait]
    impl KnowledgeProvider for RecordingProvider {
        fn label(&self) -> SourceLabel {
            self.label
        }

        async fn lookup(&self, query: &Query<'_>) -> ProviderOutcome {
            self.seen.lock().unwrap().push((
                query.text.to_string(),
                query.document.map(|d| d.to_string()),
            ));
            ProviderOutcome::from_text(self.text)
        }
    }

    struct Fixture {
        _tmp: TempDir,
        history_path: PathBuf,
        model: Arc<FakeModel>,
        seen: Arc<Mutex<Vec<(String, Option<String>)>>>,
        session: ChatSession,
    }

    fn fixture(answer: Result<String, LookupError>, wiki_text: &'static str) -> Fixture {
        let tmp = TempDir::new().unwrap();
        let history_path = tmp.path().join("history.json");
        let model = Arc::new(FakeModel {
            answer,
            prompts: Mutex::new(Vec::new()),
        });
        let seen = Arc::new(Mutex::new(Vec::new()));
        let wiki: Box<dyn KnowledgeProvider> = Box::new(RecordingProvider {
            label: SourceLabel::Wikipedia,
            text: wiki_text,
            seen: seen.clone(),
        });
        let assembler = ContextAssembler::new(AssemblerConfig {
            policy: Policy::Classify,
            max_chars: 5000,
            informational_cues: ContextConfig::default().informational_cues,
        })
        .with_providers(vec![wiki]);
        let session = ChatSession::new(
            LanguageNormalizer::new(model.clone(), true),
            assembler,
            AnswerGenerator::new(model.clone(), 0.3, 5000),
            HistoryStore::new(&history_path, "sys"),
            5000,
        );
        Fixture {
            _tmp: tmp,
            history_path,
            model,
            seen,
            session,
        }
    }

    #[tokio::test]
    async fn turn_appends_and_persists() {
        let f = fixture(Ok("Light into sugar.".into()), "Photosynthesis is a process");
        let mut conv = f.session.history().load().unwrap();

        let outcome = f.session.turn(&mut conv, "what is photosynthesis?").await.unwrap();
        assert_eq!(outcome.reply, "Light into sugar.");
        assert_eq!(outcome.query, "WHAT IS PHOTOSYNTHESIS?");
        assert_eq!(outcome.sources, vec![SourceLabel::Wikipedia]);

        // Raw input is stored, translated query goes to providers.
        assert_eq!(conv.len(), 3);
        assert_eq!(conv.visible()[0].content, "what is photosynthesis?");
        assert_eq!(conv.visible()[1].role, Role::Assistant);
        assert_eq!(f.seen.lock().unwrap()[0].0, "WHAT IS PHOTOSYNTHESIS?");

        let reloaded = HistoryStore::new(&f.history_path, "sys").load().unwrap();
        assert_eq!(reloaded, conv);
    }

    #[tokio::test]
    async fn prompt_carries_context_and_system_prompt() {
        let f = fixture(Ok("ok".into()), "Photosynthesis is a process");
        let mut conv = Conversation::new("custom system");
        f.session.turn(&mut conv, "explain photosynthesis").await.unwrap();

        let prompts = f.model.prompts.lock().unwrap();
        assert_eq!(prompts[0][0].content, "custom system");
        assert!(prompts[0][1].content.contains("Photosynthesis is a process"));
    }

    #[tokio::test]
    async fn empty_context_still_generates() {
        let f = fixture(Ok("general answer".into()), "");
        let mut conv = Conversation::new("sys");
        let outcome = f.session.turn(&mut conv, "what is nothing").await.unwrap();
        assert_eq!(outcome.reply, "general answer");
        assert!(outcome.sources.is_empty());
        assert_eq!(f.model.prompts.lock().unwrap()[0][1].content, "WHAT IS NOTHING");
    }

    #[tokio::test]
    async fn generation_failure_is_recorded_as_sentinel() {
        let f = fixture(Err(LookupError::Transport("down".into())), "x");
        let mut conv = Conversation::new("sys");
        let outcome = f.session.turn(&mut conv, "what is x").await.unwrap();
        assert_eq!(outcome.reply, GENERATION_FAILED_REPLY);
        assert_eq!(conv.visible()[1].content, GENERATION_FAILED_REPLY);
    }

    #[tokio::test]
    async fn document_filter_reaches_providers() {
        let mut f = fixture(Ok("ok".into()), "x");
        f.session.set_document_filter(Some("handbook".into()));
        let mut conv = Conversation::new("sys");
        f.session.turn(&mut conv, "what is leave").await.unwrap();
        assert_eq!(f.seen.lock().unwrap()[0].1.as_deref(), Some("handbook"));

        f.session.set_document_filter(Some("  ".into()));
        assert_eq!(f.session.document_filter(), None);
    }

    #[tokio::test]
    async fn ask_document_uses_document_text_without_history() {
        let f = fixture(Ok("25 days".into()), "unused");
        let doc = UploadedDocument {
            name: "handbook.txt".into(),
            path: PathBuf::from("handbook.txt"),
            text: "Employees get 25 vacation days.".into(),
        };

        let reply = f.session.ask_document(&doc, "¿Cuántos días?").await;
        assert_eq!(reply, "25 days");
        assert!(f.seen.lock().unwrap().is_empty());
        assert!(!f.history_path.exists());

        let prompts = f.model.prompts.lock().unwrap();
        assert_eq!(prompts[0][0].content, "You are a helpful assistant.");
        assert_eq!(
            prompts[0][1].content,
            "Employees get 25 vacation days.\n\nQuestion: ¿Cuántos días?"
        );
    }

    #[test]
    fn from_config_builds_with_defaults() {
        let tmp = TempDir::new().unwrap();
        let mut config = Config::default();
        config.documents.upload_dir = tmp.path().join("uploads");
        config.history.path = tmp.path().join("h.json");
        let session = ChatSession::from_config(&config).unwrap();
        assert!(session.library().is_some());
        assert!(session.embedder().is_none());
        assert!(tmp.path().join("uploads").is_dir());
    }
}
