//! Response-time series for the analytics chart.

use chrono::{DateTime, Local, Utc};
use serde::{Deserialize, Serialize};

/// Legend shown next to the series in charting views.
pub const SERIES_LABEL: &str = "Response Time (ms)";

/// One completed request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalyticsSample {
    /// Local wall-clock time the submission was made, formatted for display.
    pub label: String,
    pub latency_ms: u64,
    pub started_at: DateTime<Utc>,
}

impl AnalyticsSample {
    pub fn new(started_at: DateTime<Utc>, latency_ms: u64) -> Self {
        Self {
            label: display_label(started_at),
            latency_ms,
            started_at,
        }
    }
}

/// Append-only series of samples, cleared only with the transcript.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AnalyticsSeries {
    samples: Vec<AnalyticsSample>,
}

impl AnalyticsSeries {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a sample. Called once per successful submission.
    pub fn record(&mut self, sample: AnalyticsSample) {
        tracing::debug!(label = %sample.label, latency_ms = sample.latency_ms, "Analytics sample recorded");
        self.samples.push(sample);
    }

    pub fn samples(&self) -> &[AnalyticsSample] {
        &self.samples
    }

    /// `(label, latency_ms)` pairs in recording order.
    pub fn points(&self) -> Vec<(String, u64)> {
        self.samples
            .iter()
            .map(|s| (s.label.clone(), s.latency_ms))
            .collect()
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    /// Mean latency, rounded down. `None` for an empty series.
    pub fn average_latency_ms(&self) -> Option<u64> {
        if self.samples.is_empty() {
            return None;
        }
        let total: u64 = self.samples.iter().map(|s| s.latency_ms).sum();
        Some(total / self.samples.len() as u64)
    }

    /// Slowest request so far.
    pub fn max_latency_ms(&self) -> Option<u64> {
        self.samples.iter().map(|s| s.latency_ms).max()
    }

    pub fn clear(&mut self) {
        self.samples.clear();
    }
}

fn display_label(at: DateTime<Utc>) -> String {
    at.with_timezone(&Local).format("%H:%M:%S").to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_record_and_points() {
        let mut series = AnalyticsSeries::new();
        let t0 = Utc::now();
        series.record(AnalyticsSample::new(t0, 120));
        series.record(AnalyticsSample::new(t0, 80));

        let points = series.points();
        assert_eq!(points.len(), 2);
        assert_eq!(points[0].1, 120);
        assert_eq!(points[1].1, 80);
        assert_eq!(points[0].0, display_label(t0));
    }

    #[test]
    fn test_label_format() {
        let sample = AnalyticsSample::new(Utc::now(), 5);
        assert_eq!(sample.label.len(), 8);
        assert_eq!(sample.label.matches(':').count(), 2);
    }

    #[test]
    fn test_stats() {
        let mut series = AnalyticsSeries::new();
        assert_eq!(series.average_latency_ms(), None);
        assert_eq!(series.max_latency_ms(), None);

        let t0 = Utc::now();
        for ms in [100, 200, 300] {
            series.record(AnalyticsSample::new(t0, ms));
        }
        assert_eq!(series.average_latency_ms(), Some(200));
        assert_eq!(series.max_latency_ms(), Some(300));
    }

    #[test]
    fn test_clear() {
        let mut series = AnalyticsSeries::new();
        series.record(AnalyticsSample::new(Utc::now(), 1));
        series.clear();
        assert!(series.is_empty());
        assert_eq!(series.len(), 0);
    }
}
