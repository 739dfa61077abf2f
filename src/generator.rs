//! Answer generation.
//!
//! Wraps one completion call. The assembled context, if any, is placed in
//! the user message ahead of the question with an instruction to stay
//! within it. Failures never reach the caller: they are logged and turned
//! into [`GENERATION_FAILED_REPLY`].

use std::sync::Arc;

use crate::assembler::truncate_chars;
use crate::llm::CompletionBackend;
use crate::models::{AssembledContext, Message};

/// Reply shown when the model could not be reached or answered nonsense.
pub const GENERATION_FAILED_REPLY: &str = "⚠️ No response";

const GROUNDING_INSTRUCTION: &str =
    "IMPORTANT: Answer using ONLY the context provided below. Avoid internal knowledge unless necessary.";

/// System message for single-document questions.
pub const DOCUMENT_SYSTEM_PROMPT: &str = "You are a helpful assistant.";

/// Sampling temperature for single-document questions.
pub const DOCUMENT_TEMPERATURE: f32 = 0.4;

pub struct AnswerGenerator {
    backend: Arc<dyn CompletionBackend>,
    temperature: f32,
    max_context_chars: usize,
}

impl AnswerGenerator {
    pub fn new(
        backend: Arc<dyn CompletionBackend>,
        temperature: f32,
        max_context_chars: usize,
    ) -> Self {
        Self {
            backend,
            temperature,
            max_context_chars,
        }
    }

    /// Generate a reply. Returns [`GENERATION_FAILED_REPLY`] on failure.
    pub async fn answer(
        &self,
        system_prompt: &str,
        question: &str,
        context: &AssembledContext,
    ) -> String {
        let messages = build_prompt(system_prompt, question, &context.text, self.max_context_chars);
        self.complete(&messages, self.temperature).await
    }

    /// Answer from one document's text: the text, then the question, with no
    /// grounding instruction and no conversation system prompt.
    pub async fn answer_document(&self, document_text: &str, question: &str) -> String {
        let messages = vec![
            Message::system(DOCUMENT_SYSTEM_PROMPT),
            Message::user(format!(
                "{}\n\nQuestion: {}",
                truncate_chars(document_text, self.max_context_chars),
                question
            )),
        ];
        self.complete(&messages, DOCUMENT_TEMPERATURE).await
    }

    async fn complete(&self, messages: &[Message], temperature: f32) -> String {
        match self.backend.complete(messages, temperature).await {
            Ok(reply) if !reply.trim().is_empty() => reply,
            Ok(_) => {
                tracing::warn!("generation returned an empty reply");
                GENERATION_FAILED_REPLY.to_string()
            }
            Err(e) => {
                tracing::warn!(error = %e, "generation failed");
                GENERATION_FAILED_REPLY.to_string()
            }
        }
    }
}

/// System prompt plus one user message holding the (truncated) context and
/// the question. Without context the user message is the bare question.
pub fn build_prompt(
    system_prompt: &str,
    question: &str,
    context: &str,
    max_context_chars: usize,
) -> Vec<Message> {
    let user = if context.trim().is_empty() {
        question.to_string()
    } else {
        format!(
            "{}\n\nContext:\n{}\n\nQuestion: {}",
            GROUNDING_INSTRUCTION,
            truncate_chars(context, max_context_chars),
            question
        )
    };
    vec![Message::system(system_prompt), Message::user(user)]
}
