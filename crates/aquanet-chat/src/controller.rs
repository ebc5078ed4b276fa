//! Conversation controller: the state machine that owns the transcript.
//!
//! One submission may be in flight at a time. A submission appends the user
//! message and an empty assistant placeholder, then the placeholder is
//! rewritten as chunks arrive until the backend's final text replaces it.
//!
//! State lives behind a `std::sync::Mutex` that is never held across an
//! `.await`; observers follow changes through [`ConversationEvent`]s.

use std::sync::{Mutex, MutexGuard};

use chrono::{DateTime, Utc};
use tokio::sync::{broadcast, mpsc};
use tokio::time::Instant;
use tracing::{debug, info, warn};
use uuid::Uuid;

use aquanet_core::config::AquanetConfig;
use aquanet_core::events::ConversationEvent;
use aquanet_core::types::{AquacultureData, Role, TaskKind};

use crate::analytics::{AnalyticsSample, AnalyticsSeries};
use crate::catalog::TaskCatalog;
use crate::debug::{DebugRecorder, DebugSnapshot, ErrorRecord, SuccessRecord};
use crate::error::ChatError;
use crate::gateway::{BackendGateway, GatewayRequest};
use crate::prompt::PromptBuilder;
use crate::stream::StreamAccumulator;
use crate::transcript::{ConversationStore, Message};

/// User message content when a task is chosen without a question.
pub const DEFAULT_USER_TEXT: &str = "Analyze data";

const EVENT_CAPACITY: usize = 256;

/// Reason recorded when a `submit` future is dropped mid-flight.
pub const ABANDONED_REASON: &str = "submission abandoned";

/// Where the controller is in the submit/response cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ControllerState {
    Idle,
    AwaitingResponse,
}

/// Handle for one accepted submission.
///
/// Returned by [`ConversationController::begin_submission`]; the `id` ties
/// chunks and the terminal outcome back to this submission.
#[derive(Debug, Clone)]
pub struct SubmissionTicket {
    pub id: Uuid,
    pub request: GatewayRequest,
    /// Transcript index of the assistant placeholder.
    pub assistant_index: usize,
}

struct PendingSubmission {
    id: Uuid,
    task_kind: Option<TaskKind>,
    input: AquacultureData,
    prompt: String,
    assistant_index: usize,
    started_at: DateTime<Utc>,
    started: Instant,
}

struct Inner {
    state: ControllerState,
    store: ConversationStore,
    accumulator: StreamAccumulator,
    analytics: AnalyticsSeries,
    debug: DebugRecorder,
    pending: Option<PendingSubmission>,
    pending_question: String,
}

impl Inner {
    /// The in-flight submission, if `id` names it.
    fn pending_for(&self, id: Uuid) -> Option<&PendingSubmission> {
        match (&self.state, &self.pending) {
            (ControllerState::AwaitingResponse, Some(p)) if p.id == id => Some(p),
            _ => None,
        }
    }
}

/// Fails the in-flight submission if `submit` is dropped before its
/// terminal outcome, so the controller never stays in `AwaitingResponse`.
struct AbandonGuard<'a> {
    controller: &'a ConversationController,
    id: Uuid,
    armed: bool,
}

impl Drop for AbandonGuard<'_> {
    fn drop(&mut self) {
        if self.armed {
            self.controller.fail(self.id, ABANDONED_REASON);
        }
    }
}

/// Owns the transcript, analytics and debug snapshot for one conversation
/// and drives submissions through the backend gateway.
pub struct ConversationController {
    gateway: BackendGateway,
    prompts: PromptBuilder,
    inner: Mutex<Inner>,
    events: broadcast::Sender<ConversationEvent>,
}

impl ConversationController {
    pub fn new(gateway: BackendGateway, prompts: PromptBuilder) -> Self {
        let (events, _) = broadcast::channel(EVENT_CAPACITY);
        Self {
            gateway,
            prompts,
            inner: Mutex::new(Inner {
                state: ControllerState::Idle,
                store: ConversationStore::new(),
                accumulator: StreamAccumulator::new(),
                analytics: AnalyticsSeries::new(),
                debug: DebugRecorder::new(),
                pending: None,
                pending_question: String::new(),
            }),
            events,
        }
    }

    /// Controller whose prompts follow the `[domain]` section of `config`.
    pub fn from_config(gateway: BackendGateway, config: &AquanetConfig) -> Self {
        Self::new(gateway, PromptBuilder::new(config.domain.clone()))
    }

    /// Receiver for every event emitted after this call.
    pub fn subscribe(&self) -> broadcast::Receiver<ConversationEvent> {
        self.events.subscribe()
    }

    fn lock(&self) -> MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(|poisoned| {
            warn!("Controller mutex poisoned; continuing with inner state");
            poisoned.into_inner()
        })
    }

    fn emit(&self, event: ConversationEvent) {
        debug!(event = event.event_name(), "Conversation event");
        // No subscribers is fine.
        let _ = self.events.send(event);
    }

    // =========================================================================
    // Queries
    // =========================================================================

    pub fn state(&self) -> ControllerState {
        self.lock().state
    }

    pub fn is_busy(&self) -> bool {
        self.state() == ControllerState::AwaitingResponse
    }

    /// Snapshot of the transcript.
    pub fn messages(&self) -> Vec<Message> {
        self.lock().store.messages().to_vec()
    }

    pub fn message_count(&self) -> usize {
        self.lock().store.len()
    }

    /// Copy of the response-time series.
    pub fn analytics(&self) -> AnalyticsSeries {
        self.lock().analytics.clone()
    }

    /// Last successful query or last error, whichever came later.
    pub fn debug_snapshot(&self) -> Option<DebugSnapshot> {
        self.lock().debug.snapshot().cloned()
    }

    /// Debug snapshot as pretty JSON; `{}` before the first call.
    pub fn debug_json(&self) -> String {
        self.lock().debug.to_pretty_json()
    }

    pub fn pending_question(&self) -> String {
        self.lock().pending_question.clone()
    }

    /// Store the question being typed. Cleared after a successful submission.
    pub fn set_pending_question(&self, text: impl Into<String>) {
        self.lock().pending_question = text.into();
    }

    // =========================================================================
    // Submission lifecycle
    // =========================================================================

    /// Accept a submission and move to `AwaitingResponse`.
    ///
    /// Appends the user message and an empty assistant placeholder, builds
    /// the prompt and starts the latency clock. Fails without touching any
    /// state when a submission is already in flight or when there is neither
    /// a task nor a question.
    pub fn begin_submission(
        &self,
        task_kind: Option<TaskKind>,
        input: AquacultureData,
        free_text: &str,
    ) -> Result<SubmissionTicket, ChatError> {
        let question = free_text.trim();
        let mut inner = self.lock();

        if inner.state == ControllerState::AwaitingResponse {
            warn!("Submission rejected: response still pending");
            return Err(ChatError::SubmissionInProgress);
        }
        if task_kind.is_none() && question.is_empty() {
            return Err(ChatError::EmptyTaskAndQuestion);
        }
        // Before any transcript change: a failure here must leave it untouched.
        inner.accumulator.begin()?;

        let user_text = if question.is_empty() {
            DEFAULT_USER_TEXT
        } else {
            question
        };
        let user_index = inner
            .store
            .push(Message::user(user_text, task_kind, Some(input.clone())));
        let assistant_index = inner.store.push(Message::assistant_placeholder(task_kind));

        let prompt = self.prompts.build(task_kind, &input, free_text);
        let route = TaskCatalog::resolve_optional(task_kind);
        let id = Uuid::new_v4();
        let started_at = Utc::now();

        inner.pending = Some(PendingSubmission {
            id,
            task_kind,
            input: input.clone(),
            prompt: prompt.clone(),
            assistant_index,
            started_at,
            started: Instant::now(),
        });
        inner.state = ControllerState::AwaitingResponse;

        info!(
            submission_id = %id,
            task = task_kind.map(|k| k.as_str()).unwrap_or("none"),
            method = route.entry_point.method_name(),
            "Submission started"
        );

        self.emit(ConversationEvent::MessageAppended {
            index: user_index,
            role: Role::User,
            timestamp: started_at,
        });
        self.emit(ConversationEvent::MessageAppended {
            index: assistant_index,
            role: Role::Assistant,
            timestamp: started_at,
        });
        self.emit(ConversationEvent::SubmissionStarted {
            submission_id: id,
            task_kind,
            timestamp: started_at,
        });

        Ok(SubmissionTicket {
            id,
            request: GatewayRequest {
                task_kind,
                entry_point: route.entry_point,
                input,
                prompt,
            },
            assistant_index,
        })
    }

    /// Merge one streamed chunk into the placeholder.
    ///
    /// Returns `false` when `id` is not the in-flight submission; such
    /// chunks are dropped.
    pub fn apply_chunk(&self, id: Uuid, chunk: &str) -> bool {
        let mut inner = self.lock();
        let Some(index) = inner.pending_for(id).map(|p| p.assistant_index) else {
            warn!(submission_id = %id, "Dropping chunk for inactive submission");
            return false;
        };

        inner.accumulator.append(chunk);
        let content = inner.accumulator.current().to_string();
        inner.store.set_content(index, &content);

        self.emit(ConversationEvent::ContentUpdated {
            index,
            content,
            timestamp: Utc::now(),
        });
        true
    }

    /// Commit the backend's final text and return to `Idle`.
    ///
    /// The final text replaces whatever was streamed. Returns the measured
    /// latency, or `None` when `id` is not the in-flight submission.
    pub fn complete(&self, id: Uuid, final_text: &str) -> Option<u64> {
        let mut inner = self.lock();
        if inner.pending_for(id).is_none() {
            warn!(submission_id = %id, "Ignoring completion for inactive submission");
            return None;
        }
        let pending = inner.pending.take()?;

        inner.store.set_content(pending.assistant_index, final_text);
        let latency_ms = pending.started.elapsed().as_millis() as u64;
        inner
            .analytics
            .record(AnalyticsSample::new(pending.started_at, latency_ms));
        inner.debug.record_success(SuccessRecord {
            task_kind: pending.task_kind,
            input: pending.input,
            prompt: pending.prompt,
            response: final_text.to_string(),
            latency_ms,
            timestamp: Utc::now(),
        });
        inner.accumulator.finish();
        inner.pending_question.clear();
        inner.state = ControllerState::Idle;

        info!(submission_id = %id, latency_ms, "Submission completed");

        self.emit(ConversationEvent::ContentUpdated {
            index: pending.assistant_index,
            content: final_text.to_string(),
            timestamp: Utc::now(),
        });
        self.emit(ConversationEvent::SubmissionCompleted {
            submission_id: id,
            latency_ms,
            timestamp: Utc::now(),
        });
        Some(latency_ms)
    }

    /// Record a backend failure and return to `Idle`.
    ///
    /// Streamed partial content stays in the transcript, no analytics sample
    /// is recorded and the pending question is kept. Returns `false` when
    /// `id` is not the in-flight submission.
    pub fn fail(&self, id: Uuid, reason: &str) -> bool {
        let mut inner = self.lock();
        if inner.pending_for(id).is_none() {
            warn!(submission_id = %id, "Ignoring failure for inactive submission");
            return false;
        }
        let Some(pending) = inner.pending.take() else {
            return false;
        };

        let partial_content = inner
            .store
            .get(pending.assistant_index)
            .map(|m| m.content.clone())
            .unwrap_or_default();
        inner.debug.record_error(ErrorRecord {
            task_kind: pending.task_kind,
            prompt: pending.prompt,
            message: reason.to_string(),
            partial_content,
            timestamp: Utc::now(),
        });
        inner.accumulator.abort();
        inner.state = ControllerState::Idle;

        warn!(submission_id = %id, reason, "Submission failed");

        self.emit(ConversationEvent::SubmissionFailed {
            submission_id: id,
            reason: reason.to_string(),
            timestamp: Utc::now(),
        });
        true
    }

    /// Run one submission end to end against the configured gateway.
    ///
    /// Chunks are merged into the transcript while the backend runs. Any
    /// chunk emitted before the terminal outcome is applied before that
    /// outcome is committed. Backend errors are recorded and the controller
    /// returns to `Idle` before the error is handed back as
    /// [`ChatError::BackendFailure`].
    ///
    /// Dropping the returned future before it resolves (a timeout, for
    /// example) fails the submission with [`ABANDONED_REASON`].
    pub async fn submit(
        &self,
        task_kind: Option<TaskKind>,
        input: AquacultureData,
        free_text: &str,
    ) -> Result<String, ChatError> {
        let ticket = self.begin_submission(task_kind, input, free_text)?;
        let mut guard = AbandonGuard {
            controller: self,
            id: ticket.id,
            armed: true,
        };
        let (chunk_tx, mut chunk_rx) = mpsc::unbounded_channel::<String>();

        let invocation = self.gateway.invoke(&ticket.request, chunk_tx);
        tokio::pin!(invocation);

        let outcome = loop {
            tokio::select! {
                biased;
                Some(chunk) = chunk_rx.recv() => {
                    self.apply_chunk(ticket.id, &chunk);
                }
                outcome = &mut invocation => break outcome,
            }
        };
        while let Ok(chunk) = chunk_rx.try_recv() {
            self.apply_chunk(ticket.id, &chunk);
        }

        guard.armed = false;
        match outcome {
            Ok(text) => {
                self.complete(ticket.id, &text);
                Ok(text)
            }
            Err(err) => {
                let reason = err.to_string();
                self.fail(ticket.id, &reason);
                Err(ChatError::BackendFailure(reason))
            }
        }
    }

    // =========================================================================
    // Transcript management
    // =========================================================================

    /// Clear transcript and analytics. The debug snapshot is kept.
    ///
    /// Not allowed while a response is pending.
    pub fn reset(&self) -> Result<(), ChatError> {
        let mut inner = self.lock();
        if inner.state == ControllerState::AwaitingResponse {
            return Err(ChatError::SubmissionInProgress);
        }
        inner.store.clear();
        inner.analytics.clear();
        drop(inner);

        info!("Conversation reset");
        self.emit(ConversationEvent::HistoryReset {
            timestamp: Utc::now(),
        });
        Ok(())
    }

    /// Pretty JSON array of every message. Read-only.
    pub fn export_transcript(&self) -> Result<Vec<u8>, ChatError> {
        self.lock().store.export_json()
    }
}
