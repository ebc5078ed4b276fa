//! Terminal echo of conversation events.

use aquanet_core::events::ConversationEvent;
use aquanet_core::types::Role;

/// Turns controller events into text for the terminal.
///
/// Tracks what has been printed for the current assistant message so each
/// update writes only the new suffix. When the final text is not a
/// continuation of what streamed, it is printed again in full.
#[derive(Debug, Default)]
pub struct StreamEcho {
    index: Option<usize>,
    printed: String,
}

impl StreamEcho {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn handle(&mut self, event: &ConversationEvent) -> Option<String> {
        match event {
            ConversationEvent::MessageAppended {
                index,
                role: Role::Assistant,
                ..
            } => {
                self.index = Some(*index);
                self.printed.clear();
                Some("assistant> ".to_string())
            }
            ConversationEvent::ContentUpdated { index, content, .. }
                if self.index == Some(*index) =>
            {
                let out = match content.strip_prefix(self.printed.as_str()) {
                    Some(suffix) => suffix.to_string(),
                    None => format!("\n{}", content),
                };
                self.printed.clone_from(content);
                Some(out).filter(|s| !s.is_empty())
            }
            ConversationEvent::SubmissionCompleted { latency_ms, .. } => {
                self.index = None;
                Some(format!("\n[{} ms]\n", latency_ms))
            }
            ConversationEvent::SubmissionFailed { reason, .. } => {
                self.index = None;
                Some(format!("\n[request failed: {}]\n", reason))
            }
            ConversationEvent::HistoryReset { .. } => Some("[conversation cleared]\n".to_string()),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use uuid::Uuid;

    fn appended(index: usize, role: Role) -> ConversationEvent {
        ConversationEvent::MessageAppended {
            index,
            role,
            timestamp: Utc::now(),
        }
    }

    fn updated(index: usize, content: &str) -> ConversationEvent {
        ConversationEvent::ContentUpdated {
            index,
            content: content.to_string(),
            timestamp: Utc::now(),
        }
    }

    #[test]
    fn test_prints_only_new_suffix() {
        let mut echo = StreamEcho::new();
        assert_eq!(echo.handle(&appended(0, Role::User)), None);
        assert_eq!(
            echo.handle(&appended(1, Role::Assistant)).as_deref(),
            Some("assistant> ")
        );
        assert_eq!(echo.handle(&updated(1, "pH ")).as_deref(), Some("pH "));
        assert_eq!(echo.handle(&updated(1, "pH is fine")).as_deref(), Some("is fine"));
        // Final text identical to the stream adds nothing.
        assert_eq!(echo.handle(&updated(1, "pH is fine")), None);
    }

    #[test]
    fn test_rewritten_final_printed_in_full() {
        let mut echo = StreamEcho::new();
        echo.handle(&appended(1, Role::Assistant));
        echo.handle(&updated(1, "draft"));
        assert_eq!(
            echo.handle(&updated(1, "Final answer")).as_deref(),
            Some("\nFinal answer")
        );
    }

    #[test]
    fn test_ignores_other_indices_and_ends_on_terminal() {
        let mut echo = StreamEcho::new();
        echo.handle(&appended(3, Role::Assistant));
        assert_eq!(echo.handle(&updated(1, "stale")), None);

        let done = ConversationEvent::SubmissionCompleted {
            submission_id: Uuid::nil(),
            latency_ms: 42,
            timestamp: Utc::now(),
        };
        assert_eq!(echo.handle(&done).as_deref(), Some("\n[42 ms]\n"));
        assert_eq!(echo.handle(&updated(3, "late")), None);
    }
}
