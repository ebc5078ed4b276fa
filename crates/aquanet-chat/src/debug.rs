//! Last-call diagnostics for the debug view.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use aquanet_core::types::{AquacultureData, TaskKind};

/// A successful backend call.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SuccessRecord {
    pub task_kind: Option<TaskKind>,
    pub input: AquacultureData,
    pub prompt: String,
    pub response: String,
    pub latency_ms: u64,
    pub timestamp: DateTime<Utc>,
}

/// A failed backend call.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ErrorRecord {
    pub task_kind: Option<TaskKind>,
    pub prompt: String,
    pub message: String,
    /// Text that had streamed in before the failure.
    pub partial_content: String,
    pub timestamp: DateTime<Utc>,
}

/// Either the last successful call or the last failure, never both.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum DebugSnapshot {
    LastQuery(SuccessRecord),
    LastError(ErrorRecord),
}

impl DebugSnapshot {
    pub fn is_error(&self) -> bool {
        matches!(self, DebugSnapshot::LastError(_))
    }

    pub fn timestamp(&self) -> DateTime<Utc> {
        match self {
            DebugSnapshot::LastQuery(r) => r.timestamp,
            DebugSnapshot::LastError(r) => r.timestamp,
        }
    }
}

/// Holds the most recent [`DebugSnapshot`]. Last write wins.
#[derive(Debug, Default)]
pub struct DebugRecorder {
    snapshot: Option<DebugSnapshot>,
}

impl DebugRecorder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_success(&mut self, record: SuccessRecord) {
        self.snapshot = Some(DebugSnapshot::LastQuery(record));
    }

    pub fn record_error(&mut self, record: ErrorRecord) {
        self.snapshot = Some(DebugSnapshot::LastError(record));
    }

    pub fn snapshot(&self) -> Option<&DebugSnapshot> {
        self.snapshot.as_ref()
    }

    /// Pretty JSON for display; `{}` when nothing has been recorded yet.
    pub fn to_pretty_json(&self) -> String {
        match &self.snapshot {
            Some(snapshot) => serde_json::to_string_pretty(snapshot)
                .unwrap_or_else(|e| format!("{{\"serializationError\": \"{}\"}}", e)),
            None => "{}".to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn success(latency_ms: u64) -> SuccessRecord {
        SuccessRecord {
            task_kind: Some(TaskKind::WaterQualityAnalysis),
            input: AquacultureData::default(),
            prompt: "Analyze water quality data".to_string(),
            response: "Fine".to_string(),
            latency_ms,
            timestamp: Utc::now(),
        }
    }

    fn failure() -> ErrorRecord {
        ErrorRecord {
            task_kind: None,
            prompt: "p".to_string(),
            message: "HTTP 503".to_string(),
            partial_content: "Wat".to_string(),
            timestamp: Utc::now(),
        }
    }

    #[test]
    fn test_empty_recorder() {
        let recorder = DebugRecorder::new();
        assert!(recorder.snapshot().is_none());
        assert_eq!(recorder.to_pretty_json(), "{}");
    }

    #[test]
    fn test_error_overwrites_success() {
        let mut recorder = DebugRecorder::new();
        recorder.record_success(success(10));
        recorder.record_error(failure());
        let snapshot = recorder.snapshot().unwrap();
        assert!(snapshot.is_error());
    }

    #[test]
    fn test_success_overwrites_error() {
        let mut recorder = DebugRecorder::new();
        recorder.record_error(failure());
        recorder.record_success(success(42));
        match recorder.snapshot().unwrap() {
            DebugSnapshot::LastQuery(r) => assert_eq!(r.latency_ms, 42),
            other => panic!("Expected LastQuery, got {:?}", other),
        }
    }

    #[test]
    fn test_json_shape() {
        let mut recorder = DebugRecorder::new();
        recorder.record_success(success(7));
        let json: serde_json::Value = serde_json::from_str(&recorder.to_pretty_json()).unwrap();
        assert_eq!(json["lastQuery"]["latencyMs"], 7);
        assert_eq!(json["lastQuery"]["taskKind"], "water_quality_analysis");
        assert!(json.get("lastError").is_none());

        recorder.record_error(failure());
        let json: serde_json::Value = serde_json::from_str(&recorder.to_pretty_json()).unwrap();
        assert_eq!(json["lastError"]["message"], "HTTP 503");
        assert_eq!(json["lastError"]["partialContent"], "Wat");
        assert!(json.get("lastQuery").is_none());
    }
}
