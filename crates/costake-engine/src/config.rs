//! Module configuration

use crate::error::{CostakingError, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Complete co-staking module configuration
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CostakingConfig {
    /// Module account names
    #[serde(default)]
    pub modules: ModuleAccounts,

    /// Governance authority: a hex account address or a module name
    #[serde(default = "default_authority")]
    pub authority: String,

    /// Logging configuration
    #[serde(default)]
    pub logging: LoggingConfig,

    /// Metrics configuration
    #[serde(default)]
    pub metrics: MetricsConfig,
}

impl CostakingConfig {
    /// Parse a TOML document; missing sections take their defaults
    pub fn from_toml_str(s: &str) -> Result<Self> {
        toml::from_str(s).map_err(|e| CostakingError::Config(e.to_string()))
    }

    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let contents = std::fs::read_to_string(path)
            .map_err(|e| CostakingError::Config(format!("{}: {}", path.display(), e)))?;
        Self::from_toml_str(&contents)
    }

    pub fn to_toml_string(&self) -> Result<String> {
        toml::to_string(self).map_err(|e| CostakingError::Config(e.to_string()))
    }
}

fn default_authority() -> String {
    "gov".to_string()
}

/// Names of the module accounts funds move between
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModuleAccounts {
    /// Holds co-staking rewards until they are paid to gauges
    #[serde(default = "default_costaking_module")]
    pub costaking: String,

    /// Source of intercepted block fees
    #[serde(default = "default_fee_collector_module")]
    pub fee_collector: String,

    /// Receives direct validator rewards
    #[serde(default = "default_distribution_module")]
    pub distribution: String,

    /// Receives co-staker payouts
    #[serde(default = "default_incentive_module")]
    pub incentive: String,
}

fn default_costaking_module() -> String {
    crate::constants::MODULE_NAME.to_string()
}

fn default_fee_collector_module() -> String {
    "fee_collector".to_string()
}

fn default_distribution_module() -> String {
    "distribution".to_string()
}

fn default_incentive_module() -> String {
    "incentive".to_string()
}

impl Default for ModuleAccounts {
    fn default() -> Self {
        Self {
            costaking: default_costaking_module(),
            fee_collector: default_fee_collector_module(),
            distribution: default_distribution_module(),
            incentive: default_incentive_module(),
        }
    }
}

/// Logging configuration
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Filter directive, overridden by `RUST_LOG`
    #[serde(default = "default_log_level")]
    pub level: String,

    /// `text` or `json`
    #[serde(default = "default_log_format")]
    pub format: String,
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_log_format() -> String {
    "text".to_string()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: default_log_format(),
        }
    }
}

/// Metrics configuration
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct MetricsConfig {
    /// Register module metrics
    #[serde(default = "default_true")]
    pub enabled: bool,
}

fn default_true() -> bool {
    true
}

impl Default for MetricsConfig {
    fn default() -> Self {
        Self {
            enabled: default_true(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_empty_document_uses_defaults() {
        let config = CostakingConfig::from_toml_str("").unwrap();
        assert_eq!(config.modules.fee_collector, "fee_collector");
        assert_eq!(config.authority, "gov");
        assert_eq!(config.logging.format, "text");
        assert!(config.metrics.enabled);
    }

    #[test]
    fn test_partial_override() {
        let config = CostakingConfig::from_toml_str(
            r#"
            authority = "governance"

            [modules]
            incentive = "btc_incentive"

            [logging]
            level = "debug"
            "#,
        )
        .unwrap();
        assert_eq!(config.authority, "governance");
        assert_eq!(config.modules.incentive, "btc_incentive");
        assert_eq!(config.modules.costaking, "costaking");
        assert_eq!(config.logging.level, "debug");
    }

    #[test]
    fn test_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "[metrics]\nenabled = false").unwrap();
        let config = CostakingConfig::from_file(file.path()).unwrap();
        assert!(!config.metrics.enabled);
    }

    #[test]
    fn test_missing_file() {
        let err = CostakingConfig::from_file("/nonexistent/costaking.toml").unwrap_err();
        assert!(matches!(err, CostakingError::Config(_)));
    }

    #[test]
    fn test_toml_roundtrip() {
        let config = CostakingConfig::default();
        let s = config.to_toml_string().unwrap();
        assert_eq!(CostakingConfig::from_toml_str(&s).unwrap(), config);
    }
}
