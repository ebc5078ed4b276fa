//! Buffer for the text of the response currently being streamed.

use crate::error::ChatError;

/// Accumulates chunks of one in-flight response.
///
/// Only one stream may be active at a time; `begin` on an active accumulator
/// is an invariant violation.
#[derive(Debug, Default)]
pub struct StreamAccumulator {
    current: String,
    active: bool,
}

impl StreamAccumulator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start a new stream with an empty buffer.
    pub fn begin(&mut self) -> Result<(), ChatError> {
        if self.active {
            return Err(ChatError::AlreadyActive);
        }
        self.current.clear();
        self.active = true;
        Ok(())
    }

    /// Append a chunk. Ignored when no stream is active.
    pub fn append(&mut self, chunk: &str) {
        if !self.active {
            tracing::debug!(len = chunk.len(), "Chunk dropped: accumulator inactive");
            return;
        }
        self.current.push_str(chunk);
    }

    /// End the stream and hand back everything accumulated.
    pub fn finish(&mut self) -> String {
        self.active = false;
        std::mem::take(&mut self.current)
    }

    /// End the stream and discard the buffer.
    pub fn abort(&mut self) {
        self.active = false;
        self.current.clear();
    }

    pub fn current(&self) -> &str {
        &self.current
    }

    pub fn is_active(&self) -> bool {
        self.active
    }
}
