pub mod config;
pub mod error;
pub mod events;
pub mod types;

pub use config::AquanetConfig;
pub use error::{AquanetError, Result};
pub use events::ConversationEvent;
pub use types::*;
