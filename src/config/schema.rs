//! Configuration schema definitions.
//!
//! All types derive Serde traits for deserialization from config files.

use serde::{Deserialize, Serialize};

use crate::notify::NOTIFY_SOCKET_ENV;

/// Root configuration for the service.
#[derive(Debug, Clone, Deserialize, Serialize, Default, PartialEq)]
#[serde(default)]
pub struct ServiceConfig {
    /// Supervisor notification settings.
    pub notify: NotifyConfig,

    /// Main loop settings.
    pub service: ServiceSettings,

    /// Remote debug settings.
    pub debug: DebugConfig,

    /// Observability settings.
    pub observability: ObservabilityConfig,
}

/// Supervisor notification settings.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
#[serde(default)]
pub struct NotifyConfig {
    /// Environment variable holding the supervisor socket address.
    pub socket_env: String,
}

impl Default for NotifyConfig {
    fn default() -> Self {
        Self {
            socket_env: NOTIFY_SOCKET_ENV.to_string(),
        }
    }
}

/// Main loop settings.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
#[serde(default)]
pub struct ServiceSettings {
    /// Sleep between loop iterations in seconds.
    pub interval_secs: u64,
}

impl Default for ServiceSettings {
    fn default() -> Self {
        Self { interval_secs: 5 }
    }
}

/// Remote debug settings.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
#[serde(default)]
pub struct DebugConfig {
    /// Start with debug output enabled. Overridden by the `DEBUG` variable.
    pub enabled: bool,

    /// Address the debug listener binds to on SIGUSR2.
    pub listen_address: String,
}

impl Default for DebugConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            listen_address: "127.0.0.1:5678".to_string(),
        }
    }
}

/// Observability configuration.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Log level (trace, debug, info, warn, error).
    pub log_level: String,

    /// Enable the Prometheus metrics endpoint.
    pub metrics_enabled: bool,

    /// Metrics endpoint address.
    pub metrics_address: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            metrics_enabled: false,
            metrics_address: "127.0.0.1:9090".to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_partial_file_keeps_defaults() {
        let config: ServiceConfig = toml::from_str(
            r#"
            [service]
            interval_secs = 2
            "#,
        )
        .unwrap();

        assert_eq!(config.service.interval_secs, 2);
        assert_eq!(config.notify.socket_env, "NOTIFY_SOCKET");
        assert_eq!(config.debug.listen_address, "127.0.0.1:5678");
        assert_eq!(config.observability.log_level, "info");
    }
}
