//! TOML configuration for an analysis run.
//!
//! Every field has a default, so an empty file is valid. The file is
//! taken from `--config` when given, otherwise from the
//! `LUSAKA_WASTE_CONFIG` environment variable, otherwise defaults apply.

use std::path::{Path, PathBuf};
use std::time::Duration;

use chrono::NaiveDate;
use lusaka_waste_generation::WasteConfig;
use lusaka_waste_logistics::LogisticsConfig;
use lusaka_waste_population::EstimatorConfig;
use lusaka_waste_provider::cache::CacheSettings;
use lusaka_waste_provider::retry::RetryPolicy;
use lusaka_waste_provider_models::DEFAULT_CONFIDENCE_THRESHOLD;
use serde::{Deserialize, Serialize};

/// Environment variable naming a configuration file.
pub const CONFIG_ENV_VAR: &str = "LUSAKA_WASTE_CONFIG";

/// Errors loading configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// The file could not be read.
    #[error("Failed to read config {path}: {source}")]
    Io {
        /// File path.
        path: PathBuf,
        /// Underlying error.
        source: std::io::Error,
    },

    /// The file is not valid TOML for [`AnalysisConfig`].
    #[error("Failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),

    /// A value is out of range.
    #[error("Invalid config value for {name}: {message}")]
    Invalid {
        /// Dotted field name.
        name: &'static str,
        /// What is wrong.
        message: String,
    },
}

/// Retry, timeout and cache settings for the satellite provider.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProviderSettings {
    /// Retries after the first attempt for quota errors.
    pub max_retries: u32,
    /// Delay before the first retry, doubling afterwards.
    pub initial_backoff_secs: f64,
    /// Upper bound on a single provider request.
    pub request_timeout_secs: f64,
    /// Maximum cached responses per entry type.
    pub cache_capacity: usize,
    /// Lifetime of cached building summaries.
    pub building_ttl_secs: f64,
    /// Lifetime of cached population lookups.
    pub population_ttl_secs: f64,
    /// Lifetime of cached land-cover indices.
    pub land_cover_ttl_secs: f64,
}

impl Default for ProviderSettings {
    fn default() -> Self {
        Self {
            max_retries: 3,
            initial_backoff_secs: 1.0,
            request_timeout_secs: 60.0,
            cache_capacity: 1_024,
            building_ttl_secs: 24.0 * 60.0 * 60.0,
            population_ttl_secs: 60.0 * 60.0,
            land_cover_ttl_secs: 6.0 * 60.0 * 60.0,
        }
    }
}

fn seconds(name: &'static str, value: f64) -> Result<Duration, ConfigError> {
    Duration::try_from_secs_f64(value).map_err(|e| ConfigError::Invalid {
        name,
        message: format!("{value}: {e}"),
    })
}

impl ProviderSettings {
    /// Retry policy for provider calls.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Invalid`] for negative or non-finite durations.
    pub fn retry_policy(&self) -> Result<RetryPolicy, ConfigError> {
        Ok(RetryPolicy {
            max_retries: self.max_retries,
            initial_backoff: seconds("provider.initial_backoff_secs", self.initial_backoff_secs)?,
            request_timeout: seconds("provider.request_timeout_secs", self.request_timeout_secs)?,
        })
    }

    /// Cache capacity and TTLs.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Invalid`] for negative or non-finite durations.
    pub fn cache_settings(&self) -> Result<CacheSettings, ConfigError> {
        Ok(CacheSettings {
            capacity: self.cache_capacity,
            building_ttl: seconds("provider.building_ttl_secs", self.building_ttl_secs)?,
            population_ttl: seconds("provider.population_ttl_secs", self.population_ttl_secs)?,
            land_cover_ttl: seconds("provider.land_cover_ttl_secs", self.land_cover_ttl_secs)?,
        })
    }
}

/// Billing settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BillingSettings {
    /// Company type code revenue is projected at.
    pub company_type: u8,
}

impl Default for BillingSettings {
    fn default() -> Self {
        Self {
            company_type: lusaka_waste_billing::TIERED_COMPANY_TYPE,
        }
    }
}

/// Run-level settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RunSettings {
    /// Gridded population year for the main estimate.
    pub year: i32,
    /// Date selecting the waste season. Unset reports annual averages.
    pub date: Option<NaiveDate>,
    /// Extra years for temporal analysis.
    pub years: Vec<i32>,
    /// Footprint confidence threshold passed to the provider.
    pub building_confidence_threshold: f64,
    /// Zones analysed at once.
    pub concurrency: usize,
    /// Upper bound on an insight request.
    pub insight_timeout_secs: f64,
}

impl Default for RunSettings {
    fn default() -> Self {
        Self {
            year: 2020,
            date: None,
            years: Vec::new(),
            building_confidence_threshold: DEFAULT_CONFIDENCE_THRESHOLD,
            concurrency: 4,
            insight_timeout_secs: 5.0,
        }
    }
}

impl RunSettings {
    /// Insight timeout as a [`Duration`].
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Invalid`] for negative or non-finite values.
    pub fn insight_timeout(&self) -> Result<Duration, ConfigError> {
        seconds("analysis.insight_timeout_secs", self.insight_timeout_secs)
    }
}

/// Complete configuration for an analysis run.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AnalysisConfig {
    /// Population estimator constants.
    pub estimator: EstimatorConfig,
    /// Waste model constants.
    pub waste: WasteConfig,
    /// Logistics cost constants.
    pub logistics: LogisticsConfig,
    /// Provider retry and cache settings.
    pub provider: ProviderSettings,
    /// Billing settings.
    pub billing: BillingSettings,
    /// Run-level settings.
    pub analysis: RunSettings,
}

impl AnalysisConfig {
    /// Parses a TOML document.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] if the document is invalid.
    pub fn from_toml_str(source: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(source)?;
        config.validate()?;
        Ok(config)
    }

    /// Reads and parses a TOML file.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] if the file cannot be read or is invalid.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let source = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml_str(&source)
    }

    /// Loads from `path`, else from [`CONFIG_ENV_VAR`], else defaults.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] if a named file cannot be read or is invalid.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        if let Some(path) = path {
            log::info!("Loading config from {}", path.display());
            return Self::from_file(path);
        }
        match std::env::var_os(CONFIG_ENV_VAR) {
            Some(path) if !path.is_empty() => {
                let path = PathBuf::from(path);
                log::info!("Loading config from {} ({CONFIG_ENV_VAR})", path.display());
                Self::from_file(&path)
            }
            _ => {
                log::debug!("No config file given, using defaults");
                Ok(Self::default())
            }
        }
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.analysis.concurrency == 0 {
            return Err(ConfigError::Invalid {
                name: "analysis.concurrency",
                message: "must be at least 1".to_string(),
            });
        }
        let ratio = self.estimator.disagreement_ratio;
        if !(0.0..=1.0).contains(&ratio) {
            return Err(ConfigError::Invalid {
                name: "estimator.disagreement_ratio",
                message: format!("{ratio} is outside [0, 1]"),
            });
        }
        self.provider.retry_policy()?;
        self.provider.cache_settings()?;
        self.analysis.insight_timeout()?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_document_is_default() {
        assert_eq!(
            AnalysisConfig::from_toml_str("").unwrap(),
            AnalysisConfig::default()
        );
    }

    #[test]
    fn sections_override_defaults() {
        let config = AnalysisConfig::from_toml_str(
            r#"
[estimator]
disagreement_ratio = 0.5
fallback_density_per_sqkm = 5000.0

[waste]
base_rate_kg_per_capita_day = 0.6

[logistics]
disposal_site = [28.25, -15.38]

[provider]
max_retries = 5
population_ttl_secs = 120.0

[billing]
company_type = 7

[analysis]
year = 2023
years = [2015, 2020]
date = "2024-07-01"
concurrency = 8
"#,
        )
        .unwrap();

        assert!((config.estimator.disagreement_ratio - 0.5).abs() < f64::EPSILON);
        assert!((config.estimator.formal_people_per_100_sqm - 4.1).abs() < f64::EPSILON);
        assert!((config.waste.base_rate_kg_per_capita_day - 0.6).abs() < f64::EPSILON);
        assert!((config.waste.collection_efficiency - 0.85).abs() < f64::EPSILON);
        assert_eq!(config.logistics.disposal_site, [28.25, -15.38]);
        assert_eq!(config.provider.retry_policy().unwrap().max_retries, 5);
        assert_eq!(
            config.provider.cache_settings().unwrap().population_ttl,
            Duration::from_secs(120)
        );
        assert_eq!(config.billing.company_type, 7);
        assert_eq!(config.analysis.years, vec![2015, 2020]);
        assert_eq!(config.analysis.date, NaiveDate::from_ymd_opt(2024, 7, 1));
    }

    #[test]
    fn rejects_out_of_range_values() {
        assert!(matches!(
            AnalysisConfig::from_toml_str("[analysis]\nconcurrency = 0"),
            Err(ConfigError::Invalid { .. })
        ));
        assert!(matches!(
            AnalysisConfig::from_toml_str("[estimator]\ndisagreement_ratio = 1.5"),
            Err(ConfigError::Invalid { .. })
        ));
        assert!(matches!(
            AnalysisConfig::from_toml_str("[provider]\nrequest_timeout_secs = -1.0"),
            Err(ConfigError::Invalid { .. })
        ));
        assert!(matches!(
            AnalysisConfig::from_toml_str("[analysis]\nyear = \"soon\""),
            Err(ConfigError::Parse(_))
        ));
    }

    #[test]
    fn missing_file_is_an_io_error() {
        assert!(matches!(
            AnalysisConfig::load(Some(Path::new("/nonexistent/lusaka.toml"))),
            Err(ConfigError::Io { .. })
        ));
    }
}
