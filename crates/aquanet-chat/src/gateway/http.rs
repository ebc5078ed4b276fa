//! OpenAI-compatible chat-completions client.
//!
//! Implements both backend shapes against `{base_url}/chat/completions`:
//! routed calls do a single non-streaming request per task, the streaming
//! shape reads server-sent events and forwards each content delta.

use std::time::Duration;

use async_trait::async_trait;
use futures_util::StreamExt;
use serde::Deserialize;
use serde_json::json;

use aquanet_core::config::{AquanetConfig, DomainConfig};
use aquanet_core::types::{AquacultureData, TaskKind};

use super::{ChunkSender, GatewayError, RoutedBackend, StreamingBackend};
use crate::prompt::PromptBuilder;

/// Reqwest-backed gateway for DeepSeek and other OpenAI-style endpoints.
#[derive(Debug, Clone)]
pub struct ChatCompletionsGateway {
    client: reqwest::Client,
    endpoint: String,
    api_key: Option<String>,
    model: String,
    temperature: f32,
    max_tokens: u32,
    system_prompt: String,
    prompts: PromptBuilder,
}

impl ChatCompletionsGateway {
    pub fn from_config(config: &AquanetConfig) -> Result<Self, GatewayError> {
        let backend = &config.backend;
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(backend.request_timeout_secs))
            .build()
            .map_err(|e| GatewayError::Network(e.to_string()))?;

        let api_key = backend.resolve_api_key();
        if api_key.is_none() {
            tracing::warn!("No API key configured; backend calls will fail");
        }

        Ok(Self {
            client,
            endpoint: format!("{}/chat/completions", backend.base_url.trim_end_matches('/')),
            api_key,
            model: backend.model.clone(),
            temperature: backend.temperature,
            max_tokens: backend.max_tokens,
            system_prompt: system_prompt(&config.domain),
            prompts: PromptBuilder::new(config.domain.clone()),
        })
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    fn request_body(&self, prompt: &str, stream: bool) -> serde_json::Value {
        json!({
            "model": self.model,
            "messages": [
                { "role": "system", "content": self.system_prompt },
                { "role": "user", "content": prompt },
            ],
            "temperature": self.temperature,
            "max_tokens": self.max_tokens,
            "stream": stream,
        })
    }

    async fn send(&self, prompt: &str, stream: bool) -> Result<reqwest::Response, GatewayError> {
        let api_key = self.api_key.as_deref().ok_or(GatewayError::MissingApiKey)?;

        let response = self
            .client
            .post(&self.endpoint)
            .bearer_auth(api_key)
            .json(&self.request_body(prompt, stream))
            .send()
            .await
            .map_err(|e| GatewayError::Network(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            tracing::warn!(status = status.as_u16(), "Backend returned error status");
            return Err(GatewayError::Http {
                status: status.as_u16(),
                body,
            });
        }
        Ok(response)
    }

    /// Single non-streaming completion.
    pub async fn complete(&self, prompt: &str) -> Result<String, GatewayError> {
        let response = self.send(prompt, false).await?;
        let body: CompletionResponse = response
            .json()
            .await
            .map_err(|e| GatewayError::Parse(e.to_string()))?;

        body.choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .ok_or_else(|| GatewayError::Parse("response has no choices".to_string()))
    }

    async fn routed(&self, kind: TaskKind, input: &AquacultureData) -> Result<String, GatewayError> {
        let prompt = self.prompts.build(Some(kind), input, "");
        self.complete(&prompt).await
    }
}

#[async_trait]
impl RoutedBackend for ChatCompletionsGateway {
    async fn analyze_water_quality(&self, input: &AquacultureData) -> Result<String, GatewayError> {
        self.routed(TaskKind::WaterQualityAnalysis, input).await
    }

    async fn diagnose_diseases(&self, input: &AquacultureData) -> Result<String, GatewayError> {
        self.routed(TaskKind::DiseaseDiagnosis, input).await
    }

    async fn optimize_feeding(&self, input: &AquacultureData) -> Result<String, GatewayError> {
        self.routed(TaskKind::FeedingOptimization, input).await
    }

    async fn predict_growth(&self, input: &AquacultureData) -> Result<String, GatewayError> {
        self.routed(TaskKind::GrowthPrediction, input).await
    }

    async fn analyze_costs(&self, input: &AquacultureData) -> Result<String, GatewayError> {
        self.routed(TaskKind::CostAnalysis, input).await
    }

    async fn get_technical_advice(&self, input: &AquacultureData) -> Result<String, GatewayError> {
        self.routed(TaskKind::TechnicalAdvice, input).await
    }

    async fn analyze_market(&self, input: &AquacultureData) -> Result<String, GatewayError> {
        self.routed(TaskKind::MarketAnalysis, input).await
    }

    async fn assess_environmental_impact(
        &self,
        input: &AquacultureData,
    ) -> Result<String, GatewayError> {
        self.routed(TaskKind::EnvironmentalImpact, input).await
    }
}

#[async_trait]
impl StreamingBackend for ChatCompletionsGateway {
    async fn stream(&self, payload: &str, chunks: ChunkSender) -> Result<String, GatewayError> {
        let response = self.send(payload, true).await?;
        let mut body = response.bytes_stream();

        let mut buffer: Vec<u8> = Vec::new();
        let mut accumulated = String::new();

        'read: while let Some(bytes) = body.next().await {
            let bytes = bytes.map_err(|e| GatewayError::Network(e.to_string()))?;
            buffer.extend_from_slice(&bytes);

            for line in drain_lines(&mut buffer) {
                match parse_sse_line(&line)? {
                    SseEvent::Delta(text) => {
                        accumulated.push_str(&text);
                        // Receiver gone means nobody is rendering; keep reading for the final text.
                        let _ = chunks.send(text);
                    }
                    SseEvent::Done => break 'read,
                    SseEvent::Skip => {}
                }
            }
        }

        // Trailing line without a newline.
        if !buffer.is_empty() {
            let line = String::from_utf8_lossy(&buffer).into_owned();
            if let SseEvent::Delta(text) = parse_sse_line(&line)? {
                accumulated.push_str(&text);
                let _ = chunks.send(text);
            }
        }

        tracing::debug!(len = accumulated.len(), "Stream finished");
        Ok(accumulated)
    }
}

/// System message describing the assistant's domain and answer rules.
pub fn system_prompt(domain: &DomainConfig) -> String {
    let mut prompt = format!(
        "You are an aquaculture expert assistant. Expertise level: {}.",
        domain.expertise_level
    );
    push_list(&mut prompt, "Knowledge domains", &domain.knowledge_domains);
    push_list(&mut prompt, "Preferred data sources", &domain.data_sources);
    push_list(
        &mut prompt,
        "Species of interest",
        &domain.customization.species_specific,
    );
    push_list(
        &mut prompt,
        "Farming methods",
        &domain.customization.farming_methods,
    );
    push_list(
        &mut prompt,
        "Follow regional guidelines for",
        &domain.customization.regional_guidelines,
    );

    let tools = &domain.tools;
    let offered: Vec<&str> = [
        (tools.water_calculator, "water quality calculations"),
        (tools.farming_calendar, "farming calendar planning"),
        (tools.alert_system, "alert thresholds"),
        (tools.disease_identifier, "disease identification"),
        (tools.feed_optimizer, "feed optimization"),
    ]
    .into_iter()
    .filter_map(|(enabled, name)| enabled.then_some(name))
    .collect();
    if !offered.is_empty() {
        prompt.push_str(&format!("\nYou may help with: {}.", offered.join(", ")));
    }

    if domain.use_industry_terms {
        prompt.push_str("\nUse standard aquaculture industry terminology.");
    }
    if domain.validation.require_source_citation {
        prompt.push_str("\nCite the sources behind each recommendation.");
    }
    push_list(
        &mut prompt,
        "Check facts against",
        &domain.validation.fact_check_sources,
    );
    if domain.validation.confidence_scoring {
        prompt.push_str(&format!(
            "\nEnd with a confidence score between 0 and 1 and recommend expert review below {}.",
            domain.validation.expert_review_threshold
        ));
    }
    prompt
}

fn push_list(prompt: &mut String, label: &str, items: &[String]) {
    if !items.is_empty() {
        prompt.push_str(&format!("\n{}: {}.", label, items.join(", ")));
    }
}

#[derive(Debug, PartialEq)]
enum SseEvent {
    Delta(String),
    Done,
    Skip,
}

#[derive(Deserialize)]
struct StreamChunk {
    #[serde(default)]
    choices: Vec<StreamChoice>,
    #[serde(default)]
    error: Option<ApiErrorBody>,
}

#[derive(Deserialize)]
struct StreamChoice {
    #[serde(default)]
    delta: StreamDelta,
}

#[derive(Deserialize, Default)]
struct StreamDelta {
    #[serde(default)]
    content: Option<String>,
}

#[derive(Deserialize)]
struct ApiErrorBody {
    message: String,
}

#[derive(Deserialize)]
struct CompletionResponse {
    #[serde(default)]
    choices: Vec<CompletionChoice>,
}

#[derive(Deserialize)]
struct CompletionChoice {
    message: CompletionMessage,
}

#[derive(Deserialize)]
struct CompletionMessage {
    #[serde(default)]
    content: Option<String>,
}

/// Split complete `\n`-terminated lines off the front of `buffer`.
///
/// Works on bytes so a multi-byte character split across network reads is
/// decoded only once both halves have arrived.
fn drain_lines(buffer: &mut Vec<u8>) -> Vec<String> {
    let mut lines = Vec::new();
    while let Some(pos) = buffer.iter().position(|&b| b == b'\n') {
        let raw: Vec<u8> = buffer.drain(..=pos).collect();
        let line = String::from_utf8_lossy(&raw[..pos]);
        let line = line.trim_end_matches('\r');
        if !line.is_empty() {
            lines.push(line.to_string());
        }
    }
    lines
}

fn parse_sse_line(line: &str) -> Result<SseEvent, GatewayError> {
    let Some(payload) = line.trim().strip_prefix("data:") else {
        // Comments, `event:` and `id:` fields.
        return Ok(SseEvent::Skip);
    };
    let payload = payload.trim();
    if payload == "[DONE]" {
        return Ok(SseEvent::Done);
    }
    if payload.is_empty() {
        return Ok(SseEvent::Skip);
    }

    let chunk: StreamChunk =
        serde_json::from_str(payload).map_err(|e| GatewayError::Parse(e.to_string()))?;
    if let Some(err) = chunk.error {
        return Err(GatewayError::Other(err.message));
    }

    match chunk.choices.into_iter().next().and_then(|c| c.delta.content) {
        Some(text) if !text.is_empty() => Ok(SseEvent::Delta(text)),
        _ => Ok(SseEvent::Skip),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_delta() {
        let line = r#"data: {"choices":[{"delta":{"content":"Hel"}}]}"#;
        assert_eq!(parse_sse_line(line).unwrap(), SseEvent::Delta("Hel".to_string()));
    }

    #[test]
    fn test_parse_done_and_skips() {
        assert_eq!(parse_sse_line("data: [DONE]").unwrap(), SseEvent::Done);
        assert_eq!(parse_sse_line(": keep-alive").unwrap(), SseEvent::Skip);
        assert_eq!(parse_sse_line("event: message").unwrap(), SseEvent::Skip);
        // Role-only first chunk carries no content.
        let role_only = r#"data: {"choices":[{"delta":{"role":"assistant"}}]}"#;
        assert_eq!(parse_sse_line(role_only).unwrap(), SseEvent::Skip);
    }

    #[test]
    fn test_parse_error_payload() {
        let line = r#"data: {"error":{"message":"rate limited"}}"#;
        assert_eq!(
            parse_sse_line(line).unwrap_err(),
            GatewayError::Other("rate limited".to_string())
        );
    }

    #[test]
    fn test_parse_malformed_json() {
        assert!(matches!(
            parse_sse_line("data: {not json"),
            Err(GatewayError::Parse(_))
        ));
    }

    #[test]
    fn test_drain_lines_keeps_partial_tail() {
        let mut buffer = b"data: one\r\n\ndata: tw".to_vec();
        assert_eq!(drain_lines(&mut buffer), vec!["data: one"]);
        assert_eq!(buffer, b"data: tw");

        buffer.extend_from_slice(b"o\n");
        assert_eq!(drain_lines(&mut buffer), vec!["data: two"]);
        assert!(buffer.is_empty());
    }

    #[test]
    fn test_drain_lines_split_multibyte() {
        // "ô" is 0xC3 0xB4; split it across two reads.
        let mut buffer = vec![b't', 0xC3];
        assert!(drain_lines(&mut buffer).is_empty());
        buffer.extend_from_slice(&[0xB4, b'm', b'\n']);
        assert_eq!(drain_lines(&mut buffer), vec!["tôm"]);
    }

    #[test]
    fn test_system_prompt_reflects_domain() {
        let mut domain = DomainConfig::default();
        domain.expertise_level = "expert".to_string();
        domain.validation.confidence_scoring = true;
        domain.validation.expert_review_threshold = 0.8;

        let prompt = system_prompt(&domain);
        assert!(prompt.contains("Expertise level: expert."));
        assert!(prompt.contains("expert review below 0.8"));
    }

    #[test]
    fn test_system_prompt_lists_sources_tools_and_methods() {
        let mut domain = DomainConfig::default();
        domain.data_sources = vec!["FAO".to_string(), "local extension office".to_string()];
        domain.tools.alert_system = false;
        domain.tools.farming_calendar = false;
        domain.validation.fact_check_sources = vec!["government_data".to_string()];
        domain.customization.farming_methods = vec!["biofloc".to_string()];
        domain.customization.regional_guidelines = vec!["Mekong Delta".to_string()];

        let prompt = system_prompt(&domain);
        assert!(prompt.contains("\nPreferred data sources: FAO, local extension office."));
        assert!(prompt.contains(
            "\nYou may help with: water quality calculations, disease identification, feed optimization."
        ));
        assert!(prompt.contains("\nCheck facts against: government_data."));
        assert!(prompt.contains("\nFarming methods: biofloc."));
        assert!(prompt.contains("\nFollow regional guidelines for: Mekong Delta."));
    }

    #[test]
    fn test_system_prompt_omits_empty_sections() {
        let mut domain = DomainConfig::default();
        domain.data_sources.clear();
        domain.validation.fact_check_sources.clear();
        domain.tools.water_calculator = false;
        domain.tools.farming_calendar = false;
        domain.tools.alert_system = false;
        domain.tools.disease_identifier = false;
        domain.tools.feed_optimizer = false;

        let prompt = system_prompt(&domain);
        assert!(!prompt.contains("Preferred data sources"));
        assert!(!prompt.contains("You may help with"));
        assert!(!prompt.contains("Check facts against"));
    }

    #[test]
    fn test_from_config_endpoint() {
        let mut config = AquanetConfig::default();
        config.backend.base_url = "https://api.example.com/v1/".to_string();
        let gateway = ChatCompletionsGateway::from_config(&config).unwrap();
        assert_eq!(gateway.endpoint(), "https://api.example.com/v1/chat/completions");
    }

    #[test]
    fn test_request_body() {
        let mut config = AquanetConfig::default();
        config.backend.model = "deepseek-chat".to_string();
        config.backend.max_tokens = 512;
        let gateway = ChatCompletionsGateway::from_config(&config).unwrap();

        let body = gateway.request_body("How is pond 4?", true);
        assert_eq!(body["model"], "deepseek-chat");
        assert_eq!(body["max_tokens"], 512);
        assert_eq!(body["stream"], true);
        assert_eq!(body["messages"][0]["role"], "system");
        assert_eq!(body["messages"][1]["content"], "How is pond 4?");
    }

    #[tokio::test]
    async fn test_missing_api_key_fails_before_network() {
        let mut config = AquanetConfig::default();
        config.backend.api_key = String::new();
        config.backend.base_url = "http://127.0.0.1:9".to_string();
        let mut gateway = ChatCompletionsGateway::from_config(&config).unwrap();
        gateway.api_key = None;

        assert_eq!(
            gateway.complete("hi").await.unwrap_err(),
            GatewayError::MissingApiKey
        );
    }
}
