//! Conversation transcript and its export encoding.

use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};

use aquanet_core::types::{AquacultureData, Role, TaskKind};

use crate::error::ChatError;

/// One entry in the transcript.
///
/// Serialized field names match the export format:
/// `{role, content, timestamp, taskKind?, inputSnapshot?}`.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Message {
    pub role: Role,
    pub content: String,
    #[serde(rename = "timestamp")]
    pub created_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub task_kind: Option<TaskKind>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub input_snapshot: Option<AquacultureData>,
}

impl Message {
    pub fn user(
        content: impl Into<String>,
        task_kind: Option<TaskKind>,
        input_snapshot: Option<AquacultureData>,
    ) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
            created_at: Utc::now(),
            task_kind,
            input_snapshot,
        }
    }

    /// Empty assistant message that a response will be streamed into.
    pub fn assistant_placeholder(task_kind: Option<TaskKind>) -> Self {
        Self {
            role: Role::Assistant,
            content: String::new(),
            created_at: Utc::now(),
            task_kind,
            input_snapshot: None,
        }
    }
}

/// Ordered message log.
///
/// Append-only, except that the trailing assistant message may have its
/// content replaced while a response is streaming into it.
#[derive(Debug, Default)]
pub struct ConversationStore {
    messages: Vec<Message>,
}

impl ConversationStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a message and return its index.
    pub fn push(&mut self, message: Message) -> usize {
        self.messages.push(message);
        self.messages.len() - 1
    }

    /// Replace the content of the assistant message at `index`.
    ///
    /// Only the last message may be rewritten, and only if it is an assistant
    /// message. Returns whether the write was applied.
    pub fn set_content(&mut self, index: usize, content: &str) -> bool {
        let last = self.messages.len().checked_sub(1);
        if last != Some(index) {
            tracing::warn!(index, len = self.messages.len(), "Rejected write to non-trailing message");
            return false;
        }
        match self.messages.get_mut(index) {
            Some(message) if message.role == Role::Assistant => {
                if message.content != content {
                    message.content.clear();
                    message.content.push_str(content);
                }
                true
            }
            _ => {
                tracing::warn!(index, "Rejected write to user message");
                false
            }
        }
    }

    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    pub fn get(&self, index: usize) -> Option<&Message> {
        self.messages.get(index)
    }

    pub fn last(&self) -> Option<&Message> {
        self.messages.last()
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    pub fn clear(&mut self) {
        self.messages.clear();
    }

    /// Encode the whole transcript as pretty-printed JSON.
    pub fn export_json(&self) -> Result<Vec<u8>, ChatError> {
        Ok(serde_json::to_vec_pretty(&self.messages)?)
    }

    /// Decode bytes produced by [`ConversationStore::export_json`].
    pub fn parse_export(bytes: &[u8]) -> Result<Vec<Message>, ChatError> {
        Ok(serde_json::from_slice(bytes)?)
    }
}

/// File name for an export taken at `now`, e.g.
/// `chat-history-2026-10-18T09-30-00.123Z.json`.
///
/// Colons in the ISO-8601 time are replaced so the name is valid on every
/// filesystem.
pub fn export_file_name(now: DateTime<Utc>) -> String {
    let stamp = now.to_rfc3339_opts(SecondsFormat::Millis, true).replace(':', "-");
    format!("chat-history-{}.json", stamp)
}
