//! Backend capability consumed by the conversation controller.
//!
//! Two integration shapes are supported and chosen when the gateway is built:
//! - [`RoutedBackend`]: one async call per task kind, full text at once.
//! - [`StreamingBackend`]: one call taking the prompt, emitting chunks over a
//!   channel before resolving with the final text.
//!
//! Either way an invocation has exactly one terminal outcome, and every chunk
//! is sent before it.

mod http;

use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::mpsc;

use aquanet_core::types::{AquacultureData, TaskKind};

use crate::catalog::BackendEntryPoint;

pub use http::{system_prompt, ChatCompletionsGateway};

/// Channel end a streaming backend pushes text chunks into.
pub type ChunkSender = mpsc::UnboundedSender<String>;

/// Errors from a backend invocation.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum GatewayError {
    #[error("API key not configured")]
    MissingApiKey,
    #[error("network error: {0}")]
    Network(String),
    #[error("HTTP {status}: {body}")]
    Http { status: u16, body: String },
    #[error("malformed response: {0}")]
    Parse(String),
    #[error("{0}")]
    Other(String),
}

/// Everything a backend invocation needs for one submission.
#[derive(Debug, Clone)]
pub struct GatewayRequest {
    pub task_kind: Option<TaskKind>,
    pub entry_point: BackendEntryPoint,
    pub input: AquacultureData,
    /// Full prompt; the payload for streaming backends.
    pub prompt: String,
}

/// Task-routed backend: one method per analysis task.
#[async_trait]
pub trait RoutedBackend: Send + Sync {
    async fn analyze_water_quality(&self, input: &AquacultureData) -> Result<String, GatewayError>;
    async fn diagnose_diseases(&self, input: &AquacultureData) -> Result<String, GatewayError>;
    async fn optimize_feeding(&self, input: &AquacultureData) -> Result<String, GatewayError>;
    async fn predict_growth(&self, input: &AquacultureData) -> Result<String, GatewayError>;
    async fn analyze_costs(&self, input: &AquacultureData) -> Result<String, GatewayError>;
    async fn get_technical_advice(&self, input: &AquacultureData) -> Result<String, GatewayError>;
    async fn analyze_market(&self, input: &AquacultureData) -> Result<String, GatewayError>;
    async fn assess_environmental_impact(
        &self,
        input: &AquacultureData,
    ) -> Result<String, GatewayError>;
}

/// Raw streaming backend.
#[async_trait]
pub trait StreamingBackend: Send + Sync {
    /// Send `payload`, push chunks into `chunks` in emission order, and
    /// resolve with the final text.
    async fn stream(&self, payload: &str, chunks: ChunkSender) -> Result<String, GatewayError>;
}

/// The backend capability, in one of its two shapes.
#[derive(Clone)]
pub enum BackendGateway {
    Routed(Arc<dyn RoutedBackend>),
    Streaming(Arc<dyn StreamingBackend>),
}

impl std::fmt::Debug for BackendGateway {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_tuple("BackendGateway").field(&self.shape()).finish()
    }
}

impl BackendGateway {
    pub fn routed(backend: impl RoutedBackend + 'static) -> Self {
        BackendGateway::Routed(Arc::new(backend))
    }

    pub fn streaming(backend: impl StreamingBackend + 'static) -> Self {
        BackendGateway::Streaming(Arc::new(backend))
    }

    /// `routed` or `streaming`, for logs.
    pub fn shape(&self) -> &'static str {
        match self {
            BackendGateway::Routed(_) => "routed",
            BackendGateway::Streaming(_) => "streaming",
        }
    }

    /// Run one request to its terminal outcome.
    ///
    /// Routed backends never emit chunks; their sender is dropped up front so
    /// the receiving side sees the channel close immediately.
    pub async fn invoke(
        &self,
        request: &GatewayRequest,
        chunks: ChunkSender,
    ) -> Result<String, GatewayError> {
        match self {
            BackendGateway::Routed(backend) => {
                drop(chunks);
                tracing::debug!(method = request.entry_point.method_name(), "Routed backend call");
                let input = &request.input;
                match request.entry_point {
                    BackendEntryPoint::AnalyzeWaterQuality => {
                        backend.analyze_water_quality(input).await
                    }
                    BackendEntryPoint::DiagnoseDiseases => backend.diagnose_diseases(input).await,
                    BackendEntryPoint::OptimizeFeeding => backend.optimize_feeding(input).await,
                    BackendEntryPoint::PredictGrowth => backend.predict_growth(input).await,
                    BackendEntryPoint::AnalyzeCosts => backend.analyze_costs(input).await,
                    BackendEntryPoint::GetTechnicalAdvice => {
                        backend.get_technical_advice(input).await
                    }
                    BackendEntryPoint::AnalyzeMarket => backend.analyze_market(input).await,
                    BackendEntryPoint::AssessEnvironmentalImpact => {
                        backend.assess_environmental_impact(input).await
                    }
                }
            }
            BackendGateway::Streaming(backend) => {
                tracing::debug!(payload_len = request.prompt.len(), "Streaming backend call");
                backend.stream(&request.prompt, chunks).await
            }
        }
    }
}
