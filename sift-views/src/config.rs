//! Configuration loading for sift list views.
//!
//! Connection and auth fields are required. Per-view tables are optional;
//! a view without one gets the default page size and debounce delay.

use crate::debounce::DEFAULT_DEBOUNCE_MS;
use crate::filter::ResyncPolicy;
use chrono::{Duration, NaiveDate};
use serde::Deserialize;
use std::collections::HashMap;
use std::path::{Path, PathBuf};

pub const DEFAULT_PAGE_SIZE: u32 = 20;
pub const MAX_PAGE_SIZE: u32 = 500;
pub const DEFAULT_WITHDRAWAL_MAX_RETRIES: u32 = 3;
const CONFIG_ENV: &str = "SIFT_CONFIG";

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SiftConfig {
    pub api_base_url: String,
    pub request_timeout_ms: u64,
    pub auth: AuthConfig,
    #[serde(default)]
    pub resync_policy: ResyncPolicy,
    #[serde(default = "default_withdrawal_max_retries")]
    pub withdrawal_max_retries: u32,
    #[serde(default)]
    pub views: HashMap<String, ViewConfig>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct AuthConfig {
    pub api_key: Option<String>,
    pub jwt: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ViewConfig {
    #[serde(default = "default_page_size")]
    pub page_size: u32,
    #[serde(default = "default_debounce_ms")]
    pub debounce_ms: u64,
    #[serde(default)]
    pub date_bounds: DateBounds,
}

impl Default for ViewConfig {
    fn default() -> Self {
        Self {
            page_size: DEFAULT_PAGE_SIZE,
            debounce_ms: DEFAULT_DEBOUNCE_MS,
            date_bounds: DateBounds::default(),
        }
    }
}

/// Selectable-date restriction for a view's date-range inputs.
///
/// Enforced by the input widgets only; compiled filters are not re-checked.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct DateBounds {
    pub past_days_limit: Option<u32>,
    #[serde(default)]
    pub disable_future: bool,
}

impl DateBounds {
    pub fn allows(&self, date: NaiveDate, today: NaiveDate) -> bool {
        if self.disable_future && date > today {
            return false;
        }
        match self.past_days_limit {
            Some(days) => date >= today - Duration::days(i64::from(days)),
            None => true,
        }
    }
}

fn default_page_size() -> u32 {
    DEFAULT_PAGE_SIZE
}

fn default_debounce_ms() -> u64 {
    DEFAULT_DEBOUNCE_MS
}

fn default_withdrawal_max_retries() -> u32 {
    DEFAULT_WITHDRAWAL_MAX_RETRIES
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing configuration file path (use --config or SIFT_CONFIG)")]
    MissingConfigPath,
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),
    #[error("Failed to parse config TOML: {0}")]
    Parse(#[from] toml::de::Error),
    #[error(transparent)]
    Invalid(#[from] sift_core::ConfigError),
}

fn invalid(field: impl Into<String>, value: impl ToString, reason: &str) -> ConfigError {
    ConfigError::Invalid(sift_core::ConfigError::InvalidValue {
        field: field.into(),
        value: value.to_string(),
        reason: reason.to_string(),
    })
}

impl SiftConfig {
    pub fn load() -> Result<Self, ConfigError> {
        let path = config_path_from_args().or_else(config_path_from_env);
        let path = path.ok_or(ConfigError::MissingConfigPath)?;
        Self::from_path(&path)
    }

    pub fn from_path(path: &Path) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path)?;
        Self::from_toml_str(&contents)
    }

    /// Parse and validate.
    pub fn from_toml_str(contents: &str) -> Result<Self, ConfigError> {
        let config: SiftConfig = toml::from_str(contents)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let base = self.api_base_url.trim();
        if base.is_empty() {
            return Err(invalid("api_base_url", base, "must not be empty"));
        }
        if !(base.starts_with("http://") || base.starts_with("https://")) {
            return Err(invalid("api_base_url", base, "must be an http(s) URL"));
        }
        if self.auth.api_key.is_none() && self.auth.jwt.is_none() {
            return Err(ConfigError::Invalid(sift_core::ConfigError::MissingRequired {
                field: "auth.api_key or auth.jwt".to_string(),
            }));
        }
        if self.request_timeout_ms == 0 {
            return Err(invalid("request_timeout_ms", 0, "must be > 0"));
        }
        if self.withdrawal_max_retries > 20 {
            return Err(invalid("withdrawal_max_retries", self.withdrawal_max_retries, "must be <= 20"));
        }
        for (name, view) in &self.views {
            if view.page_size == 0 || view.page_size > MAX_PAGE_SIZE {
                return Err(invalid(
                    format!("views.{}.page_size", name),
                    view.page_size,
                    "must be between 1 and 500",
                ));
            }
            if view.debounce_ms > 5_000 {
                return Err(invalid(
                    format!("views.{}.debounce_ms", name),
                    view.debounce_ms,
                    "must be <= 5000",
                ));
            }
        }
        Ok(())
    }

    /// Settings for `view`, or the defaults when it has no table.
    pub fn view(&self, view: &str) -> ViewConfig {
        self.views.get(view).cloned().unwrap_or_default()
    }
}

fn config_path_from_env() -> Option<PathBuf> {
    std::env::var(CONFIG_ENV).ok().map(PathBuf::from)
}

fn config_path_from_args() -> Option<PathBuf> {
    let mut args = std::env::args().skip(1);
    while let Some(arg) = args.next() {
        if arg == "--config" {
            return args.next().map(PathBuf::from);
        }
    }
    None
}
