//! Core data models used throughout Context Chat.
//!
//! These types represent the conversation log, the outcome of each
//! knowledge lookup, the merged context handed to the generator, and the
//! uploaded documents with their derived chunks.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;

use crate::error::LookupError;

/// Who authored a [`Message`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
    Assistant,
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Role::System => "system",
            Role::User => "user",
            Role::Assistant => "assistant",
        };
        f.write_str(s)
    }
}

/// A single role-tagged chat message. Serializes as `{"role", "content"}`,
/// which is also the wire shape of the chat-completion API.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    pub role: Role,
    pub content: String,
}

impl Message {
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: Role::System,
            content: content.into(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
        }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: Role::Assistant,
            content: content.into(),
        }
    }
}

/// An ordered, non-empty message log whose first entry is always the
/// system prompt.
///
/// The system prompt is sent to the generator but never shown to the user;
/// [`visible`](Conversation::visible) skips it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Conversation {
    messages: Vec<Message>,
}

impl Conversation {
    /// A fresh conversation holding only the system prompt.
    pub fn new(system_prompt: impl Into<String>) -> Self {
        Self {
            messages: vec![Message::system(system_prompt)],
        }
    }

    /// Rebuild a conversation from stored messages.
    ///
    /// Returns `None` if the list is empty or does not start with a system
    /// message.
    pub fn from_messages(messages: Vec<Message>) -> Option<Self> {
        match messages.first() {
            Some(first) if first.role == Role::System => Some(Self { messages }),
            _ => None,
        }
    }

    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    pub fn system_prompt(&self) -> &str {
        &self.messages[0].content
    }

    /// Every message after the system prompt, in chronological order.
    pub fn visible(&self) -> &[Message] {
        &self.messages[1..]
    }

    /// Append a message. A system message can only ever lead the log, so
    /// later system messages are rejected.
    pub fn push(&mut self, message: Message) -> bool {
        if message.role == Role::System {
            return false;
        }
        self.messages.push(message);
        true
    }

    pub fn push_user(&mut self, content: impl Into<String>) {
        self.messages.push(Message::user(content));
    }

    pub fn push_assistant(&mut self, content: impl Into<String>) {
        self.messages.push(Message::assistant(content));
    }

    /// Drop everything except a fresh system prompt.
    pub fn reset(&mut self, system_prompt: impl Into<String>) {
        self.messages = vec![Message::system(system_prompt)];
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    /// Always false; kept for symmetry with [`len`](Conversation::len).
    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }
}

/// Where a piece of context came from.
///
/// The derived ordering is the merge order of the assembled context.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum SourceLabel {
    Wikipedia,
    News,
    Web,
    Documents,
}

impl SourceLabel {
    pub const ALL: [SourceLabel; 4] = [
        SourceLabel::Wikipedia,
        SourceLabel::News,
        SourceLabel::Web,
        SourceLabel::Documents,
    ];

    /// Header line placed before this source's text when merging.
    pub fn header(&self) -> &'static str {
        match self {
            SourceLabel::Wikipedia => "Wikipedia:",
            SourceLabel::News => "News:",
            SourceLabel::Web => "Web:",
            SourceLabel::Documents => "Documents:",
        }
    }
}

impl fmt::Display for SourceLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.header().trim_end_matches(':'))
    }
}

/// Result of one knowledge lookup.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProviderOutcome {
    /// The provider found something to say.
    Present(String),
    /// The lookup worked but found nothing relevant.
    Absent,
    /// The lookup could not be completed.
    Failed(LookupError),
}

impl ProviderOutcome {
    /// Treat blank text as absent so callers never merge empty sections.
    pub fn from_text(text: impl Into<String>) -> Self {
        let text = text.into();
        if text.trim().is_empty() {
            ProviderOutcome::Absent
        } else {
            ProviderOutcome::Present(text)
        }
    }

    pub fn is_present(&self) -> bool {
        matches!(self, ProviderOutcome::Present(_))
    }

    pub fn text(&self) -> Option<&str> {
        match self {
            ProviderOutcome::Present(t) => Some(t),
            _ => None,
        }
    }
}

/// A labelled provider outcome.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProviderResult {
    pub label: SourceLabel,
    pub outcome: ProviderOutcome,
}

/// Merged, bounded context handed to the answer generator.
///
/// An empty context is valid and means "answer from general knowledge".
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AssembledContext {
    pub text: String,
    /// Sources that contributed text, in merge order.
    pub sources: Vec<SourceLabel>,
}

impl AssembledContext {
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.text.is_empty()
    }

    /// Length in characters (not bytes).
    pub fn char_len(&self) -> usize {
        self.text.chars().count()
    }
}

/// A file in the upload directory together with its extracted text.
#[derive(Debug, Clone)]
pub struct UploadedDocument {
    /// File name within the upload directory (e.g. `handbook.pdf`).
    pub name: String,
    pub path: PathBuf,
    pub text: String,
}

/// A fixed-size slice of a document's text, the unit of semantic retrieval.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Chunk {
    pub id: String,
    /// Name of the source [`UploadedDocument`].
    pub document: String,
    pub chunk_index: i64,
    pub text: String,
    pub hash: String,
}
