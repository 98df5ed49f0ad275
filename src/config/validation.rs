//! Configuration validation.
//!
//! Returns every problem found, not just the first one.

use std::fmt;
use std::net::SocketAddr;

use crate::config::schema::ServiceConfig;

/// A single semantic problem with a configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationError {
    pub field: &'static str,
    pub message: String,
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.field, self.message)
    }
}

const LOG_LEVELS: [&str; 5] = ["trace", "debug", "info", "warn", "error"];

/// Check a deserialized config for values serde cannot reject on its own.
pub fn validate_config(config: &ServiceConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    if config.notify.socket_env.is_empty() || config.notify.socket_env.contains('=') {
        errors.push(ValidationError {
            field: "notify.socket_env",
            message: format!("{:?} is not a valid variable name", config.notify.socket_env),
        });
    }

    if config.service.interval_secs == 0 {
        errors.push(ValidationError {
            field: "service.interval_secs",
            message: "must be greater than zero".to_string(),
        });
    }

    if config.debug.listen_address.parse::<SocketAddr>().is_err() {
        errors.push(ValidationError {
            field: "debug.listen_address",
            message: format!("{:?} is not a socket address", config.debug.listen_address),
        });
    }

    if !LOG_LEVELS.contains(&config.observability.log_level.to_ascii_lowercase().as_str()) {
        errors.push(ValidationError {
            field: "observability.log_level",
            message: format!("unknown level {:?}", config.observability.log_level),
        });
    }

    if config.observability.metrics_enabled
        && config.observability.metrics_address.parse::<SocketAddr>().is_err()
    {
        errors.push(ValidationError {
            field: "observability.metrics_address",
            message: format!("{:?} is not a socket address", config.observability.metrics_address),
        });
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_valid() {
        assert!(validate_config(&ServiceConfig::default()).is_ok());
    }

    #[test]
    fn test_reports_all_errors() {
        let mut config = ServiceConfig::default();
        config.service.interval_secs = 0;
        config.debug.listen_address = "not-an-address".into();
        config.observability.log_level = "loud".into();

        let errors = validate_config(&config).unwrap_err();
        let fields: Vec<_> = errors.iter().map(|e| e.field).collect();
        assert_eq!(
            fields,
            vec!["service.interval_secs", "debug.listen_address", "observability.log_level"]
        );
    }

    #[test]
    fn test_metrics_address_only_checked_when_enabled() {
        let mut config = ServiceConfig::default();
        config.observability.metrics_address = "nope".into();
        assert!(validate_config(&config).is_ok());

        config.observability.metrics_enabled = true;
        assert!(validate_config(&config).is_err());
    }
}
