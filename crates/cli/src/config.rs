//! `.qoe/config.toml` loading.
//!
//! Every field has a default, so an empty or absent file yields a working
//! configuration that reproduces the reference behaviour.

use std::path::Path;
use std::time::Duration;

use anyhow::{Context, Result};
use pipeline::config::{DEFAULT_MAX_OUTPUT_TOKENS, DEFAULT_MODEL, DEFAULT_TEMPERATURE};
use pipeline::{GenerationSettings, MaterialityPolicy, PipelineConfig};
use serde::Deserialize;

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct CliConfig {
    pub llm: LlmSection,
    pub pipeline: PipelineSection,
    pub project: ProjectDefaults,
    pub telemetry: TelemetrySection,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct LlmSection {
    pub base_url: String,
    pub model: String,
    pub temperature: f64,
    pub max_output_tokens: u64,
    pub request_timeout_secs: u64,
}

impl Default for LlmSection {
    fn default() -> Self {
        Self {
            base_url: llm::DEFAULT_BASE_URL.to_string(),
            model: DEFAULT_MODEL.to_string(),
            temperature: DEFAULT_TEMPERATURE,
            max_output_tokens: DEFAULT_MAX_OUTPUT_TOKENS,
            request_timeout_secs: 120,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct PipelineSection {
    pub analysis_char_budget: usize,
    pub calculation_char_budget: usize,
    pub call_timeout_secs: u64,
    pub max_concurrent_calls: usize,
    pub percentage_filter_enabled: bool,
}

impl Default for PipelineSection {
    fn default() -> Self {
        let defaults = PipelineConfig::default();
        Self {
            analysis_char_budget: defaults.analysis_char_budget,
            calculation_char_budget: defaults.calculation_char_budget,
            call_timeout_secs: defaults.call_timeout.as_secs(),
            max_concurrent_calls: defaults.max_concurrent_calls,
            percentage_filter_enabled: defaults.materiality.percentage_filter_enabled,
        }
    }
}

/// Project materiality used when the command line does not give one.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ProjectDefaults {
    pub materiality_amount: f64,
    pub materiality_percentage: f64,
}

impl Default for ProjectDefaults {
    fn default() -> Self {
        Self {
            materiality_amount: 1000.0,
            materiality_percentage: 3.0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct TelemetrySection {
    /// OTLP gRPC endpoint; traces are exported only when set.
    pub otlp_endpoint: Option<String>,
    pub service_name: String,
}

impl Default for TelemetrySection {
    fn default() -> Self {
        Self {
            otlp_endpoint: None,
            service_name: "qoe".to_string(),
        }
    }
}

impl CliConfig {
    /// Reads `path`. A missing file is only an error when `required` is set.
    pub fn load(path: &Path, required: bool) -> Result<Self> {
        match std::fs::read_to_string(path) {
            Ok(contents) => Self::parse(&contents)
                .with_context(|| format!("invalid configuration in {}", path.display())),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound && !required => Ok(Self::default()),
            Err(e) => Err(e).with_context(|| format!("cannot read {}", path.display())),
        }
    }

    pub fn parse(contents: &str) -> Result<Self> {
        Ok(toml::from_str(contents)?)
    }

    pub fn generation_settings(&self) -> Result<GenerationSettings> {
        Ok(GenerationSettings::new(
            self.llm.model.clone(),
            self.llm.temperature,
            self.llm.max_output_tokens,
        )?)
    }

    pub fn pipeline_config(&self) -> Result<PipelineConfig> {
        let config = PipelineConfig {
            analysis_char_budget: self.pipeline.analysis_char_budget,
            calculation_char_budget: self.pipeline.calculation_char_budget,
            call_timeout: Duration::from_secs(self.pipeline.call_timeout_secs),
            max_concurrent_calls: self.pipeline.max_concurrent_calls,
            materiality: MaterialityPolicy {
                percentage_filter_enabled: self.pipeline.percentage_filter_enabled,
            },
        };
        config.validate()?;
        Ok(config)
    }
}
