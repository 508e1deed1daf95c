//! Assistant configuration.
//!
//! A single JSON document; every field has a default, so an empty object (or
//! no file at all) yields the stock assistant.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info};
use validator::Validate;

use crate::bank::ResponseBank;
use crate::brain::{Category, Classifier, KeywordClassifier, KeywordRule};
use crate::error::AppError;
use crate::session::{OverlapPolicy, SessionOptions, StepDelays, DEFAULT_GREETING};
use crate::telemetry::LogFormat;

/// Environment variable naming the configuration file.
pub const CONFIG_ENV: &str = "MARKETPULSE_CONFIG";

/// Delays between the steps of a response sequence, in milliseconds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Validate)]
#[serde(default)]
pub struct EmissionConfig {
    #[validate(range(max = 60000))]
    pub trend_delay_ms: u64,
    #[validate(range(max = 60000))]
    pub insight_delay_ms: u64,
    #[validate(range(max = 60000))]
    pub recommendation_delay_ms: u64,
}

impl Default for EmissionConfig {
    fn default() -> Self {
        Self {
            trend_delay_ms: 1000,
            insight_delay_ms: 1000,
            recommendation_delay_ms: 1000,
        }
    }
}

impl From<EmissionConfig> for StepDelays {
    fn from(config: EmissionConfig) -> Self {
        Self {
            trend: Duration::from_millis(config.trend_delay_ms),
            insight: Duration::from_millis(config.insight_delay_ms),
            recommendation: Duration::from_millis(config.recommendation_delay_ms),
        }
    }
}

/// Top-level configuration of the assistant.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate)]
#[serde(default)]
pub struct AssistantConfig {
    /// Opening bot message. `null` starts the log empty.
    #[validate(length(min = 1, max = 500))]
    pub greeting: Option<String>,
    pub overlap_policy: OverlapPolicy,
    #[validate(nested)]
    pub emission: EmissionConfig,
    /// Category used when no keyword matches.
    pub default_category: Category,
    /// JSON response bank replacing the built-in content.
    pub bank_path: Option<PathBuf>,
    /// Keyword table in priority order, replacing the built-in one.
    pub keywords: Option<Vec<KeywordRule>>,
    pub log_format: LogFormat,
}

impl Default for AssistantConfig {
    fn default() -> Self {
        Self {
            greeting: Some(DEFAULT_GREETING.to_string()),
            overlap_policy: OverlapPolicy::default(),
            emission: EmissionConfig::default(),
            default_category: Category::default(),
            bank_path: None,
            keywords: None,
            log_format: LogFormat::default(),
        }
    }
}

impl AssistantConfig {
    /// Reads and validates a configuration file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, AppError> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path).map_err(|e| {
            AppError::Config(format!("Cannot read config {}: {}", path.display(), e))
        })?;
        let config: Self = serde_json::from_str(&raw)?;
        config.validate()?;
        info!(path = %path.display(), "Loaded configuration");
        Ok(config)
    }

    /// Loads the file named by `MARKETPULSE_CONFIG`, or the defaults when it is unset.
    pub fn from_env() -> Result<Self, AppError> {
        match std::env::var(CONFIG_ENV) {
            Ok(path) if !path.trim().is_empty() => Self::load(path.trim()),
            _ => {
                debug!("{} not set, using default configuration", CONFIG_ENV);
                Ok(Self::default())
            }
        }
    }

    pub fn build_classifier(&self) -> Result<Arc<dyn Classifier>, AppError> {
        let classifier = match &self.keywords {
            Some(rules) => KeywordClassifier::with_keywords(self.default_category, rules)?,
            None => KeywordClassifier::new().with_default(self.default_category),
        };
        Ok(Arc::new(classifier))
    }

    pub fn build_bank(&self) -> Result<Arc<ResponseBank>, AppError> {
        let bank = match &self.bank_path {
            Some(path) => ResponseBank::load(path)?,
            None => ResponseBank::builtin(),
        };
        Ok(Arc::new(bank))
    }

    pub fn session_options(&self) -> SessionOptions {
        SessionOptions {
            greeting: self.greeting.clone(),
            overlap_policy: self.overlap_policy,
            delays: self.emission.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_object_is_default() {
        let config: AssistantConfig = serde_json::from_str("{}").unwrap();
        assert_eq!(config, AssistantConfig::default());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_null_greeting_disables_it() {
        let config: AssistantConfig = serde_json::from_str(r#"{"greeting": null}"#).unwrap();
        assert_eq!(config.greeting, None);
        assert_eq!(config.session_options().greeting, None);
    }

    #[test]
    fn test_delay_out_of_range() {
        let config: AssistantConfig =
            serde_json::from_str(r#"{"emission": {"insight_delay_ms": 60001}}"#).unwrap();
        assert_eq!(config.emission.trend_delay_ms, 1000);
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_greeting_too_long() {
        let config = AssistantConfig {
            greeting: Some("x".repeat(501)),
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_session_options_from_config() {
        let config: AssistantConfig = serde_json::from_str(
            r#"{"overlap_policy": "preempt", "emission": {"trend_delay_ms": 0, "insight_delay_ms": 250, "recommendation_delay_ms": 500}}"#,
        )
        .unwrap();
        let options = config.session_options();

        assert_eq!(options.overlap_policy, OverlapPolicy::Preempt);
        assert_eq!(options.delays.trend, Duration::ZERO);
        assert_eq!(options.delays.insight, Duration::from_millis(250));
        assert_eq!(options.delays.recommendation, Duration::from_millis(500));
    }

    #[test]
    fn test_default_category_applies_to_builtin_keywords() {
        let config = AssistantConfig {
            default_category: Category::Website,
            ..Default::default()
        };
        let classifier = config.build_classifier().unwrap();
        assert_eq!(classifier.classify("xyz"), Category::Website);
        assert_eq!(classifier.classify("brand awareness"), Category::Marketing);
    }

    #[test]
    fn test_unknown_policy_is_rejected() {
        let result = serde_json::from_str::<AssistantConfig>(r#"{"overlap_policy": "drop"}"#);
        assert!(result.is_err());
    }
}
