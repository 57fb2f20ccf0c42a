//! Configuration value objects for the pipeline and the text-generation provider.
//!
//! These are plain values: loading them from files or the environment is the
//! job of the `cli` crate. Every type has defaults that reproduce the reference
//! behaviour (sequential calls, percentage materiality inert).

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::errors::AnalysisError;
use crate::types::{MaterialityAmount, Temperature, TokenCount};
use crate::{ModelId, ProjectContext};

/// Default model identifier.
pub const DEFAULT_MODEL: &str = "gpt-3.5-turbo";
/// Default sampling temperature.
pub const DEFAULT_TEMPERATURE: f64 = 0.7;
/// Default cap on generated tokens per call.
pub const DEFAULT_MAX_OUTPUT_TOKENS: u64 = 2000;

// ---------------------------------------------------------------------------
// Generation settings
// ---------------------------------------------------------------------------

/// Generation parameters fixed per deployment and sent with every request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GenerationSettings {
    pub model: ModelId,
    pub temperature: Temperature,
    pub max_output_tokens: TokenCount,
}

impl GenerationSettings {
    /// Builds settings from raw values, rejecting out-of-range parameters.
    pub fn new(
        model: impl Into<String>,
        temperature: f64,
        max_output_tokens: u64,
    ) -> Result<Self, AnalysisError> {
        let model = ModelId::new(model).ok_or_else(|| AnalysisError::ConfigurationError {
            message: "model identifier must not be empty".to_string(),
        })?;
        let temperature =
            Temperature::new(temperature).ok_or_else(|| AnalysisError::ConfigurationError {
                message: format!("temperature {temperature} is outside [0, 2]"),
            })?;
        if max_output_tokens == 0 {
            return Err(AnalysisError::ConfigurationError {
                message: "max_output_tokens must be greater than zero".to_string(),
            });
        }
        Ok(Self {
            model,
            temperature,
            max_output_tokens: TokenCount::new(max_output_tokens),
        })
    }
}

impl Default for GenerationSettings {
    fn default() -> Self {
        Self {
            model: ModelId::new(DEFAULT_MODEL).expect("default model id is non-empty"),
            temperature: Temperature::new(DEFAULT_TEMPERATURE)
                .expect("default temperature is in range"),
            max_output_tokens: TokenCount::new(DEFAULT_MAX_OUTPUT_TOKENS),
        }
    }
}

// ---------------------------------------------------------------------------
// Materiality policy
// ---------------------------------------------------------------------------

/// How `apply_materiality` derives its effective threshold.
///
/// With `percentage_filter_enabled == false` (the default) only the absolute
/// threshold is applied and the percentage is carried but inert. When enabled
/// and the project supplies an earnings base, the effective threshold becomes
/// `max(absolute, earnings_base × percentage / 100)`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MaterialityPolicy {
    pub percentage_filter_enabled: bool,
}

impl MaterialityPolicy {
    /// Returns the threshold to apply for `project`, starting from `absolute`.
    pub fn effective_threshold(
        self,
        absolute: MaterialityAmount,
        project: &ProjectContext,
    ) -> MaterialityAmount {
        if !self.percentage_filter_enabled {
            return absolute;
        }
        match project.earnings_base {
            Some(base) => {
                let relative = project.materiality_percentage.of(base);
                if relative > absolute.as_f64() {
                    MaterialityAmount::new(relative).unwrap_or(absolute)
                } else {
                    absolute
                }
            }
            None => absolute,
        }
    }
}

// ---------------------------------------------------------------------------
// Pipeline configuration
// ---------------------------------------------------------------------------

/// Tunables of one pipeline instance.
#[derive(Debug, Clone, PartialEq)]
pub struct PipelineConfig {
    /// Characters of document text included in the `analyze_document` prompt.
    pub analysis_char_budget: usize,
    /// Characters of document text included in each `calculate_amounts` prompt.
    pub calculation_char_budget: usize,
    /// Deadline for a single text-generation call.
    pub call_timeout: Duration,
    /// Upper bound on in-flight calls within one per-candidate stage.
    ///
    /// `1` reproduces strictly sequential behaviour.
    pub max_concurrent_calls: usize,
    pub materiality: MaterialityPolicy,
}

impl PipelineConfig {
    /// Rejects values that would make a run meaningless or hang.
    pub fn validate(&self) -> Result<(), AnalysisError> {
        let problem = if self.analysis_char_budget == 0 {
            Some("analysis_char_budget must be greater than zero")
        } else if self.calculation_char_budget == 0 {
            Some("calculation_char_budget must be greater than zero")
        } else if self.call_timeout.is_zero() {
            Some("call_timeout must be greater than zero")
        } else if self.max_concurrent_calls == 0 {
            Some("max_concurrent_calls must be at least 1")
        } else {
            None
        };
        match problem {
            Some(message) => Err(AnalysisError::ConfigurationError {
                message: message.to_string(),
            }),
            None => Ok(()),
        }
    }
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            analysis_char_budget: 5000,
            calculation_char_budget: 3000,
            call_timeout: Duration::from_secs(120),
            max_concurrent_calls: 1,
            materiality: MaterialityPolicy::default(),
        }
    }
}
