//! Best-effort translation of user input into English.
//!
//! There is no local language detection: the model is asked to translate
//! non-English text and echo English text unchanged. Any failure falls back
//! to the original input so the turn always continues.

use std::sync::Arc;

use crate::llm::CompletionBackend;
use crate::models::Message;

const TRANSLATE_INSTRUCTION: &str =
    "Translate non-English input to English. If already English, return it exactly as-is.";

pub struct LanguageNormalizer {
    backend: Arc<dyn CompletionBackend>,
    enabled: bool,
}

impl LanguageNormalizer {
    pub fn new(backend: Arc<dyn CompletionBackend>, enabled: bool) -> Self {
        Self { backend, enabled }
    }

    pub async fn to_english(&self, text: &str) -> String {
        if !self.enabled || text.trim().is_empty() {
            return text.to_string();
        }

        let messages = [Message::system(TRANSLATE_INSTRUCTION), Message::user(text)];
        match self.backend.complete(&messages, 0.0).await {
            Ok(translated) if !translated.trim().is_empty() => translated.trim().to_string(),
            Ok(_) => {
                tracing::warn!("translation returned nothing, using original input");
                text.to_string()
            }
            Err(e) => {
                tracing::warn!(error = %e, "translation failed, using original input");
                text.to_string()
            }
        }
    }
}
