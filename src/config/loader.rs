//! Configuration loading from disk.

use std::fs;
use std::path::Path;

use crate::config::schema::ServiceConfig;
use crate::config::validation::{validate_config, ValidationError};

/// Error type for configuration loading.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Parse error: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Validation failed: {}", join_errors(.0))]
    Validation(Vec<ValidationError>),
}

fn join_errors(errors: &[ValidationError]) -> String {
    errors.iter().map(ToString::to_string).collect::<Vec<_>>().join(", ")
}

/// Variable that turns debug output on at startup.
pub const DEBUG_ENV: &str = "DEBUG";

/// `true` (any case) enables debug output; anything else disables it.
pub fn parse_debug_flag(value: &str) -> bool {
    value.trim().eq_ignore_ascii_case("true")
}

/// Fields set on the command line or through the environment at startup.
///
/// Kept by the service and re-applied on top of every reloaded file, so a reload
/// never undoes them.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StartupOverrides {
    pub interval_secs: Option<u64>,
    pub debug: Option<bool>,
    pub log_level: Option<String>,
}

impl StartupOverrides {
    /// Overrides taken from the environment. Read once at startup, never on reload.
    pub fn from_env() -> Self {
        Self {
            debug: std::env::var(DEBUG_ENV).ok().map(|value| parse_debug_flag(&value)),
            ..Self::default()
        }
    }

    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }

    pub fn apply(&self, config: &mut ServiceConfig) {
        if let Some(secs) = self.interval_secs {
            config.service.interval_secs = secs;
        }
        if let Some(enabled) = self.debug {
            config.debug.enabled = enabled;
        }
        if let Some(level) = &self.log_level {
            config.observability.log_level = level.clone();
        }
    }
}

/// Load and validate configuration from a TOML file.
pub fn load_config(path: &Path) -> Result<ServiceConfig, ConfigError> {
    let content = fs::read_to_string(path)?;
    let config: ServiceConfig = toml::from_str(&content)?;

    validate_config(&config).map_err(ConfigError::Validation)?;

    Ok(config)
}
