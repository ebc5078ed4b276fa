//! Error types for the conversational interface.

use aquanet_core::error::AquanetError;

/// Errors from the chat engine.
#[derive(Debug, thiserror::Error)]
pub enum ChatError {
    #[error("unknown task kind: {0}")]
    UnknownTaskKind(String),
    #[error("a task kind or a question is required")]
    EmptyTaskAndQuestion,
    #[error("a submission is already awaiting a response")]
    SubmissionInProgress,
    #[error("stream accumulator is already active")]
    AlreadyActive,
    #[error("backend failure: {0}")]
    BackendFailure(String),
    #[error("export error: {0}")]
    Export(String),
    #[error("configuration error: {0}")]
    Config(String),
}

impl From<AquanetError> for ChatError {
    fn from(err: AquanetError) -> Self {
        match err {
            AquanetError::UnknownTaskKind(kind) => ChatError::UnknownTaskKind(kind),
            AquanetError::Config(msg) => ChatError::Config(msg),
            other => ChatError::Export(other.to_string()),
        }
    }
}

impl From<serde_json::Error> for ChatError {
    fn from(err: serde_json::Error) -> Self {
        ChatError::Export(err.to_string())
    }
}
