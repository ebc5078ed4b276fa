//! Conversational interface for Aquanet.
//!
//! Turns user questions and pond data into backend requests, merges streamed
//! answers into the transcript as they arrive, and keeps latency analytics and
//! a last-call debug snapshot alongside the conversation.

pub mod analytics;
pub mod catalog;
pub mod controller;
pub mod debug;
pub mod error;
pub mod gateway;
pub mod prompt;
pub mod stream;
pub mod transcript;

pub use analytics::{AnalyticsSample, AnalyticsSeries};
pub use catalog::{BackendEntryPoint, PromptTemplate, TaskCatalog, TaskRoute};
pub use controller::{ControllerState, ConversationController, SubmissionTicket, ABANDONED_REASON};
pub use debug::{DebugRecorder, DebugSnapshot, ErrorRecord, SuccessRecord};
pub use error::ChatError;
pub use gateway::{
    BackendGateway, ChatCompletionsGateway, ChunkSender, GatewayError, GatewayRequest,
    RoutedBackend, StreamingBackend,
};
pub use prompt::PromptBuilder;
pub use stream::StreamAccumulator;
pub use transcript::{export_file_name, ConversationStore, Message};
