//! CLI argument definitions for the Aquanet client.
//!
//! Priority resolution: CLI args > env vars > config file > defaults.

use clap::Parser;
use std::path::PathBuf;

use aquanet_core::config::{AquanetConfig, ResponseFormat};
use aquanet_core::error::Result;

/// Environment variable naming the configuration file.
pub const CONFIG_ENV: &str = "AQUANET_CONFIG";

/// Aquanet: interactive aquaculture assistant.
#[derive(Parser, Debug)]
#[command(name = "aquanet", version, about)]
pub struct CliArgs {
    /// Path to the configuration file.
    #[arg(short = 'c', long = "config")]
    pub config: Option<PathBuf>,

    /// Log level (trace, debug, info, warn, error).
    #[arg(short = 'l', long = "log-level")]
    pub log_level: Option<String>,

    /// Task selected at startup, e.g. `water_quality_analysis`.
    #[arg(short = 't', long = "task")]
    pub task: Option<String>,

    /// Backend shape: `stream` or `complete`.
    #[arg(short = 'r', long = "response-format")]
    pub response_format: Option<String>,

    /// Directory transcripts are exported to.
    #[arg(short = 'e', long = "export-dir")]
    pub export_dir: Option<PathBuf>,
}

impl CliArgs {
    /// Resolve the configuration file path.
    ///
    /// Priority: --config flag > AQUANET_CONFIG env var > ~/.aquanet/config.toml.
    pub fn resolve_config_path(&self) -> PathBuf {
        if let Some(ref p) = self.config {
            return p.clone();
        }
        if let Ok(p) = std::env::var(CONFIG_ENV) {
            return PathBuf::from(p);
        }
        default_config_path()
    }

    /// Apply command-line overrides on top of the loaded configuration.
    pub fn apply_overrides(&self, config: &mut AquanetConfig) -> Result<()> {
        if let Some(ref level) = self.log_level {
            config.general.log_level = level.clone();
        }
        if let Some(ref format) = self.response_format {
            config.backend.response_format = format.parse::<ResponseFormat>()?;
        }
        if let Some(ref dir) = self.export_dir {
            config.general.export_dir = dir.to_string_lossy().to_string();
        }
        Ok(())
    }
}

/// Default config file path for the current platform.
fn default_config_path() -> PathBuf {
    #[cfg(target_os = "windows")]
    if let Ok(home) = std::env::var("USERPROFILE") {
        return PathBuf::from(home).join(".aquanet").join("config.toml");
    }
    #[cfg(not(target_os = "windows"))]
    if let Ok(home) = std::env::var("HOME") {
        return PathBuf::from(home).join(".aquanet").join("config.toml");
    }
    PathBuf::from("config.toml")
}
