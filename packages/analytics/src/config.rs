//! Dashboard configuration.
//!
//! The Chicago configuration is embedded at compile time. A different
//! dataset can be pointed at by loading another TOML file with the same
//! layout.

use std::path::{Path, PathBuf};

use crime_dashboard_cleaning::BoundingBox;
use crime_dashboard_soql::YearRange;
use crime_dashboard_source::EndpointConfig;
use crime_dashboard_source::socrata::parse_endpoint;
use serde::Deserialize;
use thiserror::Error;

/// Configuration embedded at compile time.
const CHICAGO_TOML: &str = include_str!("../config/chicago.toml");

/// Overrides `[endpoint] base_url`.
pub const ENDPOINT_ENV: &str = "CRIME_DASHBOARD_ENDPOINT";

/// Supplies `[endpoint] app_token`.
pub const APP_TOKEN_ENV: &str = "SOCRATA_APP_TOKEN";

/// Errors raised while loading configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The file could not be read.
    #[error("Failed to read config {}: {source}", path.display())]
    Io {
        /// Path that failed.
        path: PathBuf,
        /// Underlying error.
        source: std::io::Error,
    },

    /// The TOML did not match the expected layout.
    #[error("Invalid config TOML: {0}")]
    Parse(#[from] toml::de::Error),

    /// A value failed validation.
    #[error("Invalid config: {message}")]
    Invalid {
        /// What was wrong.
        message: String,
    },
}

impl ConfigError {
    fn invalid(message: impl Into<String>) -> Self {
        Self::Invalid {
            message: message.into(),
        }
    }
}

/// Supported calendar years, inclusive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
pub struct YearsConfig {
    /// First supported year.
    pub start: i32,
    /// Last supported year.
    pub end: i32,
}

/// An integer parameter's allowed range and default.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
pub struct ParameterRange {
    /// Smallest accepted value.
    pub min: u32,
    /// Largest accepted value.
    pub max: u32,
    /// Value used when none is given.
    pub default: u32,
}

impl ParameterRange {
    /// Whether `value` is accepted.
    #[must_use]
    pub const fn contains(&self, value: u32) -> bool {
        value >= self.min && value <= self.max
    }

    fn validate(&self, name: &str) -> Result<(), ConfigError> {
        if self.min == 0 {
            return Err(ConfigError::invalid(format!("{name}.min must be positive")));
        }
        if self.min > self.max {
            return Err(ConfigError::invalid(format!(
                "{name}.min ({}) is greater than {name}.max ({})",
                self.min, self.max
            )));
        }
        if !self.contains(self.default) {
            return Err(ConfigError::invalid(format!(
                "{name}.default ({}) is outside {}..={}",
                self.default, self.min, self.max
            )));
        }
        Ok(())
    }
}

/// Bounds on the user-selectable recipe parameters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
pub struct LimitsConfig {
    /// Number of categories in the top-N and trend views.
    pub top_n: ParameterRange,
    /// Rows requested by the map sample.
    pub sample_limit: ParameterRange,
    /// Number of leading categories the trend view follows.
    pub trend_top_n: u32,
}

impl Default for LimitsConfig {
    fn default() -> Self {
        Self {
            top_n: ParameterRange {
                min: 5,
                max: 20,
                default: 10,
            },
            sample_limit: ParameterRange {
                min: 5_000,
                max: 50_000,
                default: 20_000,
            },
            trend_top_n: 5,
        }
    }
}

/// Complete dashboard configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct DashboardConfig {
    /// Remote dataset connection.
    pub endpoint: EndpointConfig,
    /// Supported year range.
    pub years: YearsConfig,
    /// Parameter bounds.
    #[serde(default)]
    pub limits: LimitsConfig,
    /// Geographic sanity filter applied by cleaning.
    #[serde(default)]
    pub bounds: BoundingBox,
}

impl DashboardConfig {
    /// Parses and validates a TOML configuration without applying
    /// environment overrides.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] if the TOML is malformed or fails validation.
    pub fn from_toml_str(toml_str: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::de::from_str(toml_str)?;
        config.validate()?;
        Ok(config)
    }

    /// The embedded Chicago configuration.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] if the embedded TOML fails to parse.
    pub fn chicago() -> Result<Self, ConfigError> {
        Self::from_toml_str(CHICAGO_TOML)
    }

    /// Reads a configuration file.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] if the file cannot be read, parsed, or
    /// validated.
    pub fn from_path(path: &Path) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml_str(&contents)
    }

    /// Loads `path` (or the embedded configuration when `None`) and applies
    /// environment overrides.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] if loading fails or an override is invalid.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let config = match path {
            Some(path) => Self::from_path(path)?,
            None => Self::chicago()?,
        };

        let config = config.with_overrides(
            std::env::var(ENDPOINT_ENV).ok(),
            std::env::var(APP_TOKEN_ENV).ok(),
        );
        config.validate()?;
        Ok(config)
    }

    /// Replaces the base URL and app token with the given values when set
    /// and non-empty.
    #[must_use]
    pub fn with_overrides(mut self, base_url: Option<String>, app_token: Option<String>) -> Self {
        if let Some(url) = base_url.filter(|v| !v.trim().is_empty()) {
            log::info!("Using endpoint from {ENDPOINT_ENV}: {url}");
            self.endpoint.base_url = url;
        }
        if let Some(token) = app_token.filter(|v| !v.trim().is_empty()) {
            self.endpoint.app_token = Some(token);
        }
        self
    }

    /// Supported years as a validated range.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Invalid`] if the start year is after the end.
    pub fn year_range(&self) -> Result<YearRange, ConfigError> {
        YearRange::new(self.years.start, self.years.end)
            .map_err(|e| ConfigError::invalid(format!("years: {e}")))
    }

    /// Checks every section for internal consistency.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Invalid`] describing the first violation.
    pub fn validate(&self) -> Result<(), ConfigError> {
        parse_endpoint(&self.endpoint.base_url)
            .map_err(|e| ConfigError::invalid(format!("endpoint.base_url: {e}")))?;

        if self.endpoint.timeout_secs == 0 {
            return Err(ConfigError::invalid("endpoint.timeout_secs must be positive"));
        }

        self.year_range()?;
        self.limits.top_n.validate("limits.top_n")?;
        self.limits.sample_limit.validate("limits.sample_limit")?;

        if !self.limits.top_n.contains(self.limits.trend_top_n) {
            return Err(ConfigError::invalid(format!(
                "limits.trend_top_n ({}) is outside limits.top_n {}..={}",
                self.limits.trend_top_n, self.limits.top_n.min, self.limits.top_n.max
            )));
        }

        if !self.bounds.is_valid() {
            return Err(ConfigError::invalid(
                "bounds must be finite with each minimum below its maximum",
            ));
        }

        Ok(())
    }
}
