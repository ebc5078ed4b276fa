use std::collections::BTreeMap;
use std::fmt;
use std::path::Path;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::error::{AquanetError, Result};

/// Environment variable that overrides `backend.api_key`.
pub const API_KEY_ENV: &str = "AQUANET_API_KEY";

/// Top-level configuration for the Aquanet client.
///
/// Loaded from `~/.aquanet/config.toml` by default. Scoped to the controller
/// instance built from it; nothing here is process-global.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AquanetConfig {
    #[serde(default)]
    pub general: GeneralConfig,
    #[serde(default)]
    pub backend: BackendConfig,
    #[serde(default)]
    pub domain: DomainConfig,
}

impl AquanetConfig {
    /// Load configuration from a TOML file.
    ///
    /// Returns an error if the file cannot be read or parsed.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: AquanetConfig = toml::from_str(&content)?;
        info!("Configuration loaded from {}", path.display());
        Ok(config)
    }

    /// Load configuration from a TOML file, falling back to defaults if the
    /// file does not exist or cannot be parsed.
    pub fn load_or_default(path: &Path) -> Self {
        match Self::load(path) {
            Ok(config) => config,
            Err(e) => {
                warn!(
                    "Failed to load config from {}: {}. Using defaults.",
                    path.display(),
                    e
                );
                Self::default()
            }
        }
    }

    /// Save the current configuration to a TOML file.
    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content = toml::to_string_pretty(self)?;
        std::fs::write(path, content)?;
        info!("Configuration saved to {}", path.display());
        Ok(())
    }

    /// Check value ranges the backend would otherwise reject.
    pub fn validate(&self) -> Result<()> {
        self.backend.validate()
    }
}

/// General application settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneralConfig {
    /// Log level: trace, debug, info, warn, error.
    pub log_level: String,
    /// Directory that transcript exports are written to.
    pub export_dir: String,
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            export_dir: "~/.aquanet/exports".to_string(),
        }
    }
}

/// How the backend delivers answers.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResponseFormat {
    /// Incremental chunks over a single streaming call.
    #[default]
    Stream,
    /// One task-routed call per request, full text at once.
    Complete,
}

impl fmt::Display for ResponseFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ResponseFormat::Stream => write!(f, "stream"),
            ResponseFormat::Complete => write!(f, "complete"),
        }
    }
}

impl FromStr for ResponseFormat {
    type Err = AquanetError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "stream" => Ok(ResponseFormat::Stream),
            "complete" => Ok(ResponseFormat::Complete),
            other => Err(AquanetError::Config(format!(
                "unknown response format '{}', expected 'stream' or 'complete'",
                other
            ))),
        }
    }
}

/// Language-model backend connection settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BackendConfig {
    /// Bearer credential. Overridden by `AQUANET_API_KEY` when set.
    pub api_key: String,
    /// OpenAI-compatible endpoint root, e.g. `https://api.deepseek.com/v1`.
    pub base_url: String,
    pub model: String,
    /// Sampling temperature in `[0, 2]`.
    pub temperature: f32,
    /// Upper bound on generated tokens. Must be positive.
    pub max_tokens: u32,
    pub response_format: ResponseFormat,
    pub request_timeout_secs: u64,
}

impl Default for BackendConfig {
    fn default() -> Self {
        Self {
            api_key: String::new(),
            base_url: "https://api.deepseek.com/v1".to_string(),
            model: "deepseek-chat".to_string(),
            temperature: 0.7,
            max_tokens: 2000,
            response_format: ResponseFormat::Stream,
            request_timeout_secs: 120,
        }
    }
}

impl BackendConfig {
    pub fn validate(&self) -> Result<()> {
        if !(0.0..=2.0).contains(&self.temperature) {
            return Err(AquanetError::Config(format!(
                "backend.temperature must be within [0, 2], got {}",
                self.temperature
            )));
        }
        if self.max_tokens == 0 {
            return Err(AquanetError::Config(
                "backend.max_tokens must be positive".to_string(),
            ));
        }
        if self.base_url.trim().is_empty() {
            return Err(AquanetError::Config(
                "backend.base_url must not be empty".to_string(),
            ));
        }
        Ok(())
    }

    /// API key from the environment if present, else from the file.
    ///
    /// Returns `None` when neither source provides a non-empty key.
    pub fn resolve_api_key(&self) -> Option<String> {
        std::env::var(API_KEY_ENV)
            .ok()
            .filter(|k| !k.trim().is_empty())
            .or_else(|| Some(self.api_key.clone()).filter(|k| !k.trim().is_empty()))
    }
}

/// Task vocabulary and answer-shaping hints forwarded to prompts.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DomainConfig {
    pub knowledge_domains: Vec<String>,
    pub data_sources: Vec<String>,
    /// beginner, intermediate or expert.
    pub expertise_level: String,
    /// ISO 639-1 response language.
    pub language: String,
    pub use_industry_terms: bool,
    #[serde(default)]
    pub tools: DomainToolsConfig,
    #[serde(default)]
    pub validation: DomainValidationConfig,
    #[serde(default)]
    pub customization: DomainCustomizationConfig,
}

impl Default for DomainConfig {
    fn default() -> Self {
        Self {
            knowledge_domains: vec![
                "farming_techniques".to_string(),
                "water_quality".to_string(),
                "disease_management".to_string(),
                "feed_management".to_string(),
                "market_analysis".to_string(),
            ],
            data_sources: vec![
                "research_papers".to_string(),
                "industry_standards".to_string(),
                "technical_guidelines".to_string(),
            ],
            expertise_level: "intermediate".to_string(),
            language: "en".to_string(),
            use_industry_terms: true,
            tools: DomainToolsConfig::default(),
            validation: DomainValidationConfig::default(),
            customization: DomainCustomizationConfig::default(),
        }
    }
}

/// Backend-side helper tools the model may mention.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DomainToolsConfig {
    pub water_calculator: bool,
    pub farming_calendar: bool,
    pub alert_system: bool,
    pub disease_identifier: bool,
    pub feed_optimizer: bool,
}

impl Default for DomainToolsConfig {
    fn default() -> Self {
        Self {
            water_calculator: true,
            farming_calendar: true,
            alert_system: true,
            disease_identifier: true,
            feed_optimizer: true,
        }
    }
}

/// Answer validation hints.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DomainValidationConfig {
    pub require_source_citation: bool,
    pub confidence_scoring: bool,
    /// Confidence below which an answer should recommend expert review.
    pub expert_review_threshold: f64,
    pub fact_check_sources: Vec<String>,
}

impl Default for DomainValidationConfig {
    fn default() -> Self {
        Self {
            require_source_citation: true,
            confidence_scoring: true,
            expert_review_threshold: 0.8,
            fact_check_sources: vec![
                "trusted_research".to_string(),
                "government_data".to_string(),
                "industry_reports".to_string(),
            ],
        }
    }
}

/// Farm-specific tailoring.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct DomainCustomizationConfig {
    pub species_specific: Vec<String>,
    pub farming_methods: Vec<String>,
    pub regional_guidelines: Vec<String>,
    /// Extra guidance keyed by `disease_alert`, `water_quality` or
    /// `feeding_schedule`.
    pub custom_prompts: BTreeMap<String, String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn create_temp_config(content: &str) -> NamedTempFile {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(content.as_bytes()).unwrap();
        file
    }

    #[test]
    fn test_config_default_values() {
        let config = AquanetConfig::default();

        assert_eq!(config.general.log_level, "info");
        assert_eq!(config.general.export_dir, "~/.aquanet/exports");

        assert!(config.backend.api_key.is_empty());
        assert_eq!(config.backend.base_url, "https://api.deepseek.com/v1");
        assert_eq!(config.backend.model, "deepseek-chat");
        assert!((config.backend.temperature - 0.7).abs() < f32::EPSILON);
        assert_eq!(config.backend.max_tokens, 2000);
        assert_eq!(config.backend.response_format, ResponseFormat::Stream);

        assert_eq!(config.domain.expertise_level, "intermediate");
        assert_eq!(config.domain.language, "en");
        assert_eq!(config.domain.knowledge_domains.len(), 5);
        assert!(config.domain.tools.water_calculator);
        assert!((config.domain.validation.expert_review_threshold - 0.8).abs() < f64::EPSILON);
        assert!(config.domain.customization.custom_prompts.is_empty());
    }

    #[test]
    fn test_config_load_full() {
        let content = r#"
[general]
log_level = "debug"
export_dir = "/tmp/aquanet-exports"

[backend]
api_key = "sk-test"
base_url = "http://localhost:8080/v1"
model = "local-model"
temperature = 0.2
max_tokens = 512
response_format = "complete"
request_timeout_secs = 30

[domain]
language = "vi"
expertise_level = "expert"

[domain.customization]
species_specific = ["shrimp"]
regional_guidelines = ["mekong_delta"]

[domain.customization.custom_prompts]
water_quality = "Track and suggest adjustments to water parameters"
"#;
        let file = create_temp_config(content);
        let config = AquanetConfig::load(file.path()).unwrap();

        assert_eq!(config.general.log_level, "debug");
        assert_eq!(config.backend.api_key, "sk-test");
        assert_eq!(config.backend.base_url, "http://localhost:8080/v1");
        assert_eq!(config.backend.max_tokens, 512);
        assert_eq!(config.backend.response_format, ResponseFormat::Complete);
        assert_eq!(config.backend.request_timeout_secs, 30);
        assert_eq!(config.domain.language, "vi");
        assert_eq!(config.domain.expertise_level, "expert");
        assert_eq!(
            config.domain.customization.regional_guidelines,
            vec!["mekong_delta"]
        );
        assert_eq!(
            config
                .domain
                .customization
                .custom_prompts
                .get("water_quality")
                .map(String::as_str),
            Some("Track and suggest adjustments to water parameters")
        );
        // Untouched sections keep defaults.
        assert!(config.domain.tools.feed_optimizer);
    }

    #[test]
    fn test_config_load_or_default_missing_file() {
        let config = AquanetConfig::load_or_default(Path::new("/does/not/exist/config.toml"));
        assert_eq!(config.backend.model, "deepseek-chat");
        assert_eq!(config.general.log_level, "info");
    }

    #[test]
    fn test_config_load_invalid_toml() {
        let file = create_temp_config("this is {{ not valid TOML");
        assert!(AquanetConfig::load(file.path()).is_err());
    }

    #[test]
    fn test_config_empty_toml_uses_all_defaults() {
        let file = create_temp_config("");
        let config = AquanetConfig::load(file.path()).unwrap();
        assert_eq!(config.backend.max_tokens, 2000);
        assert_eq!(config.domain.language, "en");
    }

    #[test]
    fn test_config_save_creates_parent_dirs() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("sub").join("dir").join("config.toml");

        let mut config = AquanetConfig::default();
        config.backend.response_format = ResponseFormat::Complete;
        config
            .domain
            .customization
            .custom_prompts
            .insert("disease_alert".to_string(), "Flag early signs".to_string());
        config.save(&path).unwrap();

        let reloaded = AquanetConfig::load(&path).unwrap();
        assert_eq!(reloaded.backend.response_format, ResponseFormat::Complete);
        assert_eq!(
            reloaded.domain.customization.custom_prompts["disease_alert"],
            "Flag early signs"
        );
    }

    #[test]
    fn test_validate_defaults_ok() {
        assert!(AquanetConfig::default().validate().is_ok());
    }

    #[test]
    fn test_validate_temperature_bounds() {
        let mut config = AquanetConfig::default();
        config.backend.temperature = 2.0;
        assert!(config.validate().is_ok());
        config.backend.temperature = 0.0;
        assert!(config.validate().is_ok());
        config.backend.temperature = 2.5;
        assert!(matches!(config.validate(), Err(AquanetError::Config(_))));
        config.backend.temperature = -0.1;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validate_max_tokens_positive() {
        let mut config = AquanetConfig::default();
        config.backend.max_tokens = 0;
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("max_tokens"));
    }

    #[test]
    fn test_validate_empty_base_url() {
        let mut config = AquanetConfig::default();
        config.backend.base_url = "  ".to_string();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_response_format_parse() {
        assert_eq!(
            "stream".parse::<ResponseFormat>().unwrap(),
            ResponseFormat::Stream
        );
        assert_eq!(
            "COMPLETE".parse::<ResponseFormat>().unwrap(),
            ResponseFormat::Complete
        );
        assert!("batch".parse::<ResponseFormat>().is_err());
        assert_eq!(ResponseFormat::Complete.to_string(), "complete");
    }

    #[test]
    fn test_resolve_api_key_from_file() {
        // Only meaningful when the override is absent from the test environment.
        if std::env::var(API_KEY_ENV).is_ok() {
            return;
        }
        let mut backend = BackendConfig::default();
        assert_eq!(backend.resolve_api_key(), None);
        backend.api_key = "sk-file".to_string();
        assert_eq!(backend.resolve_api_key().as_deref(), Some("sk-file"));
    }
}
