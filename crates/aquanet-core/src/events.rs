use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::types::{Role, TaskKind};

/// State changes published by the conversation controller.
///
/// Rendering layers subscribe to these instead of polling; each event names
/// what changed so a view can re-read just that part of the state.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[non_exhaustive]
pub enum ConversationEvent {
    // =========================================================================
    // Transcript Events
    // =========================================================================
    /// A message was appended at `index`.
    MessageAppended {
        index: usize,
        role: Role,
        timestamp: DateTime<Utc>,
    },

    /// The streaming placeholder at `index` now holds `content`.
    ContentUpdated {
        index: usize,
        content: String,
        timestamp: DateTime<Utc>,
    },

    /// Transcript and analytics were cleared.
    HistoryReset { timestamp: DateTime<Utc> },

    // =========================================================================
    // Submission Lifecycle Events
    // =========================================================================
    /// A submission entered the awaiting-response state.
    SubmissionStarted {
        submission_id: Uuid,
        task_kind: Option<TaskKind>,
        timestamp: DateTime<Utc>,
    },

    /// The backend returned a final answer.
    SubmissionCompleted {
        submission_id: Uuid,
        latency_ms: u64,
        timestamp: DateTime<Utc>,
    },

    /// The backend failed; partial content was kept.
    SubmissionFailed {
        submission_id: Uuid,
        reason: String,
        timestamp: DateTime<Utc>,
    },
}

impl ConversationEvent {
    /// Returns the timestamp of the event.
    pub fn timestamp(&self) -> DateTime<Utc> {
        match self {
            ConversationEvent::MessageAppended { timestamp, .. }
            | ConversationEvent::ContentUpdated { timestamp, .. }
            | ConversationEvent::HistoryReset { timestamp }
            | ConversationEvent::SubmissionStarted { timestamp, .. }
            | ConversationEvent::SubmissionCompleted { timestamp, .. }
            | ConversationEvent::SubmissionFailed { timestamp, .. } => *timestamp,
        }
    }

    /// Returns a short event name for logging.
    pub fn event_name(&self) -> &'static str {
        match self {
            ConversationEvent::MessageAppended { .. } => "message_appended",
            ConversationEvent::ContentUpdated { .. } => "content_updated",
            ConversationEvent::HistoryReset { .. } => "history_reset",
            ConversationEvent::SubmissionStarted { .. } => "submission_started",
            ConversationEvent::SubmissionCompleted { .. } => "submission_completed",
            ConversationEvent::SubmissionFailed { .. } => "submission_failed",
        }
    }
}
