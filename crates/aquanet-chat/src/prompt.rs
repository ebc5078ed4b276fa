//! Prompt construction from task kind, pond data and the user's question.
//!
//! Pure and deterministic: the same inputs and domain settings always yield
//! the same prompt text.

use std::fmt::Write;

use aquanet_core::config::DomainConfig;
use aquanet_core::types::{AquacultureData, TaskKind, WaterQuality};

use crate::catalog::{PromptTemplate, TaskCatalog};

/// Heading that introduces the free-text question at the end of a prompt.
pub const QUESTION_HEADING: &str = "User question:";

/// Builds request payloads for the backend.
#[derive(Debug, Clone, Default)]
pub struct PromptBuilder {
    domain: DomainConfig,
}

impl PromptBuilder {
    pub fn new(domain: DomainConfig) -> Self {
        Self { domain }
    }

    /// Build the prompt for one submission.
    ///
    /// `kind = None` selects the generic template, which serializes the whole
    /// input. A non-blank `free_text` is always appended last under
    /// [`QUESTION_HEADING`].
    pub fn build(&self, kind: Option<TaskKind>, input: &AquacultureData, free_text: &str) -> String {
        let template = TaskCatalog::resolve_optional(kind).template;
        let mut prompt = render_template(template, input);

        if let Some(guidance) = self.guidance_for(template) {
            let _ = write!(prompt, "\nGuidance: {}", guidance);
        }

        let language = self.domain.language.trim();
        if !language.is_empty() && !language.eq_ignore_ascii_case("en") {
            let _ = write!(prompt, "\nRespond in: {}", language);
        }

        let question = free_text.trim();
        if !question.is_empty() {
            let _ = write!(prompt, "\n\n{} {}", QUESTION_HEADING, question);
        }

        prompt
    }

    fn guidance_for(&self, template: PromptTemplate) -> Option<&str> {
        let key = match template {
            PromptTemplate::WaterQuality => "water_quality",
            PromptTemplate::Disease => "disease_alert",
            PromptTemplate::Feeding => "feeding_schedule",
            _ => return None,
        };
        self.domain
            .customization
            .custom_prompts
            .get(key)
            .map(String::as_str)
            .filter(|g| !g.trim().is_empty())
    }
}

fn render_template(template: PromptTemplate, input: &AquacultureData) -> String {
    let species = &input.biological_data.species;
    let stage = &input.biological_data.stage;
    let water = water_lines(input.water_quality());

    match template {
        PromptTemplate::WaterQuality => format!("Analyze water quality data:\n{}", water),
        PromptTemplate::Disease => format!(
            "Diagnose potential diseases for {} at {} stage based on water parameters:\n{}",
            species, stage, water
        ),
        PromptTemplate::Feeding => format!(
            "Optimize the feeding schedule and ration for {} at {} stage under current conditions:\n{}",
            species, stage, water
        ),
        PromptTemplate::Growth => format!(
            "Predict growth performance for {} at {} stage given water parameters:\n{}",
            species, stage, water
        ),
        PromptTemplate::Cost => format!(
            "Analyze production costs for {} at {} stage on farm {}, pond {}.",
            species, stage, input.metadata.farm_id, input.metadata.pond_id
        ),
        PromptTemplate::TechnicalAdvice => format!(
            "Provide technical farming advice for {} at {} stage.",
            species, stage
        ),
        PromptTemplate::Market => format!(
            "Analyze the current market outlook for {} ({} stage).",
            species, stage
        ),
        PromptTemplate::EnvironmentalImpact => format!(
            "Assess the environmental impact of farming {} at {} stage with water parameters:\n{}",
            species, stage, water
        ),
        PromptTemplate::Generic => {
            let data = serde_json::to_string_pretty(input).unwrap_or_else(|_| format!("{:?}", input));
            format!(
                "Analyze aquaculture data for {} at {} stage:\n{}",
                species, stage, data
            )
        }
    }
}

fn water_lines(wq: &WaterQuality) -> String {
    let mut lines = format!(
        "Temperature: {}°C\npH: {}\nDissolved Oxygen: {} mg/L",
        wq.temperature, wq.ph, wq.dissolved_oxygen
    );
    if let Some(ammonia) = wq.ammonia {
        let _ = write!(lines, "\nAmmonia: {} mg/L", ammonia);
    }
    if let Some(salinity) = wq.salinity {
        let _ = write!(lines, "\nSalinity: {} ppt", salinity);
    }
    lines
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> AquacultureData {
        AquacultureData::with_water_quality(28.0, 7.5, 5.2)
    }

    #[test]
    fn test_water_quality_prompt_contains_readings() {
        let prompt = PromptBuilder::default().build(Some(TaskKind::WaterQualityAnalysis), &sample(), "");
        assert!(prompt.starts_with("Analyze water quality data:"));
        assert!(prompt.contains("28"));
        assert!(prompt.contains("7.5"));
        assert!(prompt.contains("5.2"));
        assert!(!prompt.contains(QUESTION_HEADING));
    }

    #[test]
    fn test_disease_prompt_contains_readings_and_stock() {
        let mut input = sample();
        input.biological_data.species = "tilapia".to_string();
        input.biological_data.stage = "fingerling".to_string();
        let prompt = PromptBuilder::default().build(Some(TaskKind::DiseaseDiagnosis), &input, "");
        for needle in ["tilapia", "fingerling", "28", "7.5", "5.2"] {
            assert!(prompt.contains(needle), "missing {needle} in {prompt}");
        }
    }

    #[test]
    fn test_question_appended_for_every_kind() {
        let builder = PromptBuilder::default();
        for kind in TaskKind::ALL {
            let prompt = builder.build(Some(kind), &sample(), "  Why is my pond cloudy?  ");
            assert!(
                prompt.ends_with("\n\nUser question: Why is my pond cloudy?"),
                "{kind}: {prompt}"
            );
        }
    }

    #[test]
    fn test_blank_question_not_appended() {
        let prompt = PromptBuilder::default().build(Some(TaskKind::MarketAnalysis), &sample(), "   \n");
        assert!(!prompt.contains(QUESTION_HEADING));
    }

    #[test]
    fn test_generic_template_serializes_input() {
        let prompt = PromptBuilder::default().build(None, &sample(), "Any advice?");
        assert!(prompt.starts_with("Analyze aquaculture data for shrimp at juvenile stage:"));
        assert!(prompt.contains("\"dissolvedOxygen\": 5.2"));
        assert!(prompt.contains("\"farmId\": \"farm-123\""));
        assert!(prompt.ends_with("User question: Any advice?"));
    }

    #[test]
    fn test_optional_readings_rendered_when_present() {
        let mut input = sample();
        input.environmental_data.water_quality.ammonia = Some(0.25);
        input.environmental_data.water_quality.salinity = Some(15.0);
        let prompt = PromptBuilder::default().build(Some(TaskKind::WaterQualityAnalysis), &input, "");
        assert!(prompt.contains("Ammonia: 0.25 mg/L"));
        assert!(prompt.contains("Salinity: 15 ppt"));
    }

    #[test]
    fn test_build_is_deterministic() {
        let builder = PromptBuilder::default();
        let input = sample();
        let a = builder.build(None, &input, "q");
        let b = builder.build(None, &input, "q");
        assert_eq!(a, b);
    }

    #[test]
    fn test_custom_guidance_and_language() {
        let mut domain = DomainConfig::default();
        domain.language = "vi".to_string();
        domain
            .customization
            .custom_prompts
            .insert("disease_alert".to_string(), "Flag early warning signs".to_string());
        let builder = PromptBuilder::new(domain);

        let prompt = builder.build(Some(TaskKind::DiseaseDiagnosis), &sample(), "Help");
        assert!(prompt.contains("\nGuidance: Flag early warning signs"));
        assert!(prompt.contains("\nRespond in: vi"));
        assert!(prompt.ends_with("User question: Help"));

        // Guidance is scoped to its own task.
        let prompt = builder.build(Some(TaskKind::CostAnalysis), &sample(), "");
        assert!(!prompt.contains("Guidance:"));
    }
}
