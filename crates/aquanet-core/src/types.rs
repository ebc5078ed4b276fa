use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::AquanetError;

// =============================================================================
// Enums
// =============================================================================

/// Author of a transcript message.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// A question or analysis request typed by the user.
    User,
    /// A model response, possibly still streaming.
    Assistant,
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Role::User => write!(f, "user"),
            Role::Assistant => write!(f, "assistant"),
        }
    }
}

/// Aquaculture analysis operations supported by the backend.
///
/// The set is closed: every value has exactly one prompt template and one
/// backend entry point.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskKind {
    WaterQualityAnalysis,
    DiseaseDiagnosis,
    FeedingOptimization,
    GrowthPrediction,
    CostAnalysis,
    TechnicalAdvice,
    MarketAnalysis,
    EnvironmentalImpact,
}

impl TaskKind {
    /// Every task kind, in menu order.
    pub const ALL: [TaskKind; 8] = [
        TaskKind::WaterQualityAnalysis,
        TaskKind::DiseaseDiagnosis,
        TaskKind::FeedingOptimization,
        TaskKind::GrowthPrediction,
        TaskKind::CostAnalysis,
        TaskKind::TechnicalAdvice,
        TaskKind::MarketAnalysis,
        TaskKind::EnvironmentalImpact,
    ];

    /// Wire name, as used in exports and on the command line.
    pub fn as_str(&self) -> &'static str {
        match self {
            TaskKind::WaterQualityAnalysis => "water_quality_analysis",
            TaskKind::DiseaseDiagnosis => "disease_diagnosis",
            TaskKind::FeedingOptimization => "feeding_optimization",
            TaskKind::GrowthPrediction => "growth_prediction",
            TaskKind::CostAnalysis => "cost_analysis",
            TaskKind::TechnicalAdvice => "technical_advice",
            TaskKind::MarketAnalysis => "market_analysis",
            TaskKind::EnvironmentalImpact => "environmental_impact",
        }
    }

    /// Human-readable label, e.g. `WATER QUALITY ANALYSIS`.
    pub fn label(&self) -> String {
        self.as_str().replace('_', " ").to_uppercase()
    }
}

impl fmt::Display for TaskKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TaskKind {
    type Err = AquanetError;

    /// Accepts the wire name in any case, with `_`, `-` or spaces as separators.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.trim().to_lowercase().replace(['-', ' '], "_");
        TaskKind::ALL
            .into_iter()
            .find(|kind| kind.as_str() == normalized)
            .ok_or_else(|| AquanetError::UnknownTaskKind(s.to_string()))
    }
}

// =============================================================================
// Structured input
// =============================================================================

/// Pond measurements and context attached to an analysis request.
///
/// Passed through to the backend untouched; ranges are not validated here.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct AquacultureData {
    pub environmental_data: EnvironmentalData,
    pub biological_data: BiologicalData,
    pub metadata: DataMetadata,
}

impl AquacultureData {
    /// Shorthand for a record with the given water readings and default context.
    pub fn with_water_quality(temperature: f64, ph: f64, dissolved_oxygen: f64) -> Self {
        let mut data = Self::default();
        data.environmental_data.water_quality = WaterQuality {
            temperature,
            ph,
            dissolved_oxygen,
            ..WaterQuality::default()
        };
        data
    }

    pub fn water_quality(&self) -> &WaterQuality {
        &self.environmental_data.water_quality
    }
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct EnvironmentalData {
    pub water_quality: WaterQuality,
}

/// Water chemistry readings.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct WaterQuality {
    /// Degrees Celsius.
    pub temperature: f64,
    #[serde(rename = "pH")]
    pub ph: f64,
    /// mg/L.
    pub dissolved_oxygen: f64,
    /// mg/L total ammonia nitrogen.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ammonia: Option<f64>,
    /// Parts per thousand.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub salinity: Option<f64>,
}

impl Default for WaterQuality {
    fn default() -> Self {
        Self {
            temperature: 28.0,
            ph: 7.5,
            dissolved_oxygen: 5.2,
            ammonia: None,
            salinity: None,
        }
    }
}

/// Cultured species and life stage.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct BiologicalData {
    pub species: String,
    pub stage: String,
}

impl Default for BiologicalData {
    fn default() -> Self {
        Self {
            species: "shrimp".to_string(),
            stage: "juvenile".to_string(),
        }
    }
}

/// Where and when the readings were taken.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct DataMetadata {
    pub farm_id: String,
    pub pond_id: String,
    pub timestamp: DateTime<Utc>,
    /// Provenance tag, e.g. `user-input` or `sensor`.
    pub source: String,
}

impl Default for DataMetadata {
    fn default() -> Self {
        Self {
            farm_id: "farm-123".to_string(),
            pond_id: "pond-456".to_string(),
            timestamp: Utc::now(),
            source: "user-input".to_string(),
        }
    }
}
