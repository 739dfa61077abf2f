//! File-backed conversation history.
//!
//! The whole conversation is stored as a pretty-printed JSON array of
//! `{"role", "content"}` objects. Writes go to a sibling temp file that is
//! then renamed over the target, so a crash mid-write leaves the previous
//! history intact.

use anyhow::{Context, Result};
use std::path::{Path, PathBuf};

use crate::config::HistoryConfig;
use crate::models::{Conversation, Message};

pub struct HistoryStore {
    path: PathBuf,
    system_prompt: String,
}

impl HistoryStore {
    pub fn new(path: impl Into<PathBuf>, system_prompt: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            system_prompt: system_prompt.into(),
        }
    }

    pub fn from_config(config: &HistoryConfig) -> Self {
        Self::new(&config.path, &config.system_prompt)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn system_prompt(&self) -> &str {
        &self.system_prompt
    }

    /// Load the stored conversation.
    ///
    /// A missing or empty file yields a fresh conversation. A log that does
    /// not start with a system message gets the default one prepended.
    pub fn load(&self) -> Result<Conversation> {
        if !self.path.exists() {
            return Ok(Conversation::new(&self.system_prompt));
        }

        let content = std::fs::read_to_string(&self.path)
            .with_context(|| format!("Failed to read history file: {}", self.path.display()))?;
        if content.trim().is_empty() {
            return Ok(Conversation::new(&self.system_prompt));
        }

        let mut messages: Vec<Message> = serde_json::from_str(&content)
            .with_context(|| format!("Malformed history file: {}", self.path.display()))?;

        match Conversation::from_messages(messages.clone()) {
            Some(conversation) => Ok(conversation),
            None => {
                if !messages.is_empty() {
                    tracing::warn!(
                        path = %self.path.display(),
                        "history does not start with a system message, prepending default"
                    );
                }
                messages.insert(0, Message::system(&self.system_prompt));
                Ok(Conversation::from_messages(messages)
                    .unwrap_or_else(|| Conversation::new(&self.system_prompt)))
            }
        }
    }

    /// Append in memory only; call [`persist`](HistoryStore::persist) to save.
    pub fn append(&self, conversation: &mut Conversation, message: Message) {
        if !conversation.push(message) {
            tracing::debug!("ignoring system message appended mid-conversation");
        }
    }

    pub fn persist(&self, conversation: &Conversation) -> Result<()> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create directory: {}", parent.display()))?;
        }

        let json = serde_json::to_string_pretty(conversation.messages())?;
        let tmp = temp_path(&self.path);
        std::fs::write(&tmp, json)
            .with_context(|| format!("Failed to write {}", tmp.display()))?;
        std::fs::rename(&tmp, &self.path)
            .with_context(|| format!("Failed to replace {}", self.path.display()))?;

        tracing::debug!(
            messages = conversation.len(),
            path = %self.path.display(),
            "history saved"
        );
        Ok(())
    }

    /// Reset to the system prompt alone and persist immediately.
    pub fn clear(&self, conversation: &mut Conversation) -> Result<()> {
        conversation.reset(&self.system_prompt);
        self.persist(conversation)
    }
}

fn temp_path(path: &Path) -> PathBuf {
    let mut name = path
        .file_name()
        .map(|n| n.to_os_string())
        .unwrap_or_default();
    name.push(".tmp");
    path.with_file_name(name)
}
