//! Task catalog: which template and which backend call serve each task kind.

use aquanet_core::types::TaskKind;

use crate::error::ChatError;

/// Prompt layout used by [`crate::prompt::PromptBuilder`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PromptTemplate {
    WaterQuality,
    Disease,
    Feeding,
    Growth,
    Cost,
    TechnicalAdvice,
    Market,
    EnvironmentalImpact,
    /// No task selected: dump the whole input as JSON.
    Generic,
}

/// Task-routed backend call, one per task kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BackendEntryPoint {
    AnalyzeWaterQuality,
    DiagnoseDiseases,
    OptimizeFeeding,
    PredictGrowth,
    AnalyzeCosts,
    GetTechnicalAdvice,
    AnalyzeMarket,
    AssessEnvironmentalImpact,
}

impl BackendEntryPoint {
    /// Method name for logs.
    pub fn method_name(&self) -> &'static str {
        match self {
            BackendEntryPoint::AnalyzeWaterQuality => "analyze_water_quality",
            BackendEntryPoint::DiagnoseDiseases => "diagnose_diseases",
            BackendEntryPoint::OptimizeFeeding => "optimize_feeding",
            BackendEntryPoint::PredictGrowth => "predict_growth",
            BackendEntryPoint::AnalyzeCosts => "analyze_costs",
            BackendEntryPoint::GetTechnicalAdvice => "get_technical_advice",
            BackendEntryPoint::AnalyzeMarket => "analyze_market",
            BackendEntryPoint::AssessEnvironmentalImpact => "assess_environmental_impact",
        }
    }
}

/// Resolved routing for one request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TaskRoute {
    pub template: PromptTemplate,
    pub entry_point: BackendEntryPoint,
}

/// Static mapping from task kinds to templates and backend calls.
pub struct TaskCatalog;

impl TaskCatalog {
    /// Resolve the route for a task kind. Total over the closed enumeration.
    pub fn resolve(kind: TaskKind) -> TaskRoute {
        let (template, entry_point) = match kind {
            TaskKind::WaterQualityAnalysis => (
                PromptTemplate::WaterQuality,
                BackendEntryPoint::AnalyzeWaterQuality,
            ),
            TaskKind::DiseaseDiagnosis => {
                (PromptTemplate::Disease, BackendEntryPoint::DiagnoseDiseases)
            }
            TaskKind::FeedingOptimization => {
                (PromptTemplate::Feeding, BackendEntryPoint::OptimizeFeeding)
            }
            TaskKind::GrowthPrediction => (PromptTemplate::Growth, BackendEntryPoint::PredictGrowth),
            TaskKind::CostAnalysis => (PromptTemplate::Cost, BackendEntryPoint::AnalyzeCosts),
            TaskKind::TechnicalAdvice => (
                PromptTemplate::TechnicalAdvice,
                BackendEntryPoint::GetTechnicalAdvice,
            ),
            TaskKind::MarketAnalysis => (PromptTemplate::Market, BackendEntryPoint::AnalyzeMarket),
            TaskKind::EnvironmentalImpact => (
                PromptTemplate::EnvironmentalImpact,
                BackendEntryPoint::AssessEnvironmentalImpact,
            ),
        };
        TaskRoute {
            template,
            entry_point,
        }
    }

    /// Resolve an optional task kind.
    ///
    /// Free-text questions without a task use the generic template and the
    /// general-purpose technical advice call.
    pub fn resolve_optional(kind: Option<TaskKind>) -> TaskRoute {
        match kind {
            Some(kind) => Self::resolve(kind),
            None => TaskRoute {
                template: PromptTemplate::Generic,
                entry_point: BackendEntryPoint::GetTechnicalAdvice,
            },
        }
    }

    /// Parse a task kind from user-supplied text.
    pub fn parse(name: &str) -> Result<TaskKind, ChatError> {
        name.parse::<TaskKind>().map_err(ChatError::from)
    }

    /// Input fields (JSON paths) the template for `kind` reads.
    pub fn expected_fields(kind: TaskKind) -> &'static [&'static str] {
        const WATER: &[&str] = &[
            "environmentalData.waterQuality.temperature",
            "environmentalData.waterQuality.pH",
            "environmentalData.waterQuality.dissolvedOxygen",
        ];
        const WATER_AND_STOCK: &[&str] = &[
            "environmentalData.waterQuality.temperature",
            "environmentalData.waterQuality.pH",
            "environmentalData.waterQuality.dissolvedOxygen",
            "biologicalData.species",
            "biologicalData.stage",
        ];
        const STOCK: &[&str] = &["biologicalData.species", "biologicalData.stage"];
        const SITE: &[&str] = &[
            "biologicalData.species",
            "biologicalData.stage",
            "metadata.farmId",
            "metadata.pondId",
        ];

        match kind {
            TaskKind::WaterQualityAnalysis => WATER,
            TaskKind::DiseaseDiagnosis
            | TaskKind::FeedingOptimization
            | TaskKind::GrowthPrediction
            | TaskKind::EnvironmentalImpact => WATER_AND_STOCK,
            TaskKind::TechnicalAdvice | TaskKind::MarketAnalysis => STOCK,
            TaskKind::CostAnalysis => SITE,
        }
    }
}
