// Copyright (c) 2026 Bountyy Oy. All rights reserved.
// This software is proprietary and confidential.

use serde::{Deserialize, Serialize};
use std::time::Duration;
use validator::Validate;

use crate::errors::ConfigError;
use crate::puppet::UnknownTargetOsPolicy;

/// Runtime configuration for the agent core. The embedding process usually
/// receives this over its command channel; [`AgentConfig::from_env`] covers
/// standalone and test runs.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct AgentConfig {
    #[serde(default)]
    pub scan: ScanConfig,

    #[serde(default)]
    pub compatibility: CompatibilityConfig,

    #[serde(default)]
    pub observability: ObservabilityConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct ScanConfig {
    /// Per-port TCP connect timeout in milliseconds
    #[validate(range(min = 1, max = 600000))]
    #[serde(default = "default_connection_timeout_ms")]
    pub connection_timeout_ms: u64,

    /// Overall liveness probe timeout in milliseconds
    #[validate(range(min = 1, max = 600000))]
    #[serde(default = "default_ping_timeout_ms")]
    pub ping_timeout_ms: u64,
}

impl ScanConfig {
    pub fn connection_timeout(&self) -> Duration {
        Duration::from_millis(self.connection_timeout_ms)
    }

    pub fn ping_timeout(&self) -> Duration {
        Duration::from_millis(self.ping_timeout_ms)
    }
}

impl Default for ScanConfig {
    fn default() -> Self {
        Self {
            connection_timeout_ms: default_connection_timeout_ms(),
            ping_timeout_ms: default_ping_timeout_ms(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct CompatibilityConfig {
    /// Gate decision for exploiters facing a host whose operating system has
    /// not been established
    #[serde(default)]
    pub unknown_target_os: UnknownTargetOsPolicy,
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct ObservabilityConfig {
    #[validate(length(min = 1))]
    #[serde(default = "default_log_level")]
    pub log_level: String,

    #[serde(default = "default_true")]
    pub metrics_enabled: bool,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
            metrics_enabled: true,
        }
    }
}

impl AgentConfig {
    /// Defaults, overridden by any `RIHMASTO_*` variables present, then
    /// validated.
    pub fn from_env() -> Result<Self, ConfigError> {
        let mut config = Self::default();
        config.apply_env_overrides()?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        self.scan.validate()?;
        self.observability.validate()?;
        Ok(())
    }

    fn apply_env_overrides(&mut self) -> Result<(), ConfigError> {
        if let Ok(value) = std::env::var("RIHMASTO_CONNECTION_TIMEOUT_MS") {
            self.scan.connection_timeout_ms =
                parse_env("RIHMASTO_CONNECTION_TIMEOUT_MS", &value)?;
        }

        if let Ok(value) = std::env::var("RIHMASTO_PING_TIMEOUT_MS") {
            self.scan.ping_timeout_ms = parse_env("RIHMASTO_PING_TIMEOUT_MS", &value)?;
        }

        if let Ok(value) = std::env::var("RIHMASTO_UNKNOWN_TARGET_OS") {
            self.compatibility.unknown_target_os =
                parse_policy("RIHMASTO_UNKNOWN_TARGET_OS", &value)?;
        }

        if let Ok(value) = std::env::var("RIHMASTO_LOG_LEVEL") {
            self.observability.log_level = value;
        }

        if let Ok(value) = std::env::var("RIHMASTO_METRICS_ENABLED") {
            self.observability.metrics_enabled = parse_env("RIHMASTO_METRICS_ENABLED", &value)?;
        }

        Ok(())
    }
}

fn parse_env<T: std::str::FromStr>(variable: &str, value: &str) -> Result<T, ConfigError>
where
    T::Err: std::fmt::Display,
{
    value
        .parse()
        .map_err(|err: T::Err| ConfigError::InvalidEnvOverride {
            variable: variable.to_string(),
            reason: err.to_string(),
        })
}

fn parse_policy(variable: &str, value: &str) -> Result<UnknownTargetOsPolicy, ConfigError> {
    match value.to_lowercase().as_str() {
        "permissive" => Ok(UnknownTargetOsPolicy::Permissive),
        "strict" => Ok(UnknownTargetOsPolicy::Strict),
        other => Err(ConfigError::InvalidEnvOverride {
            variable: variable.to_string(),
            reason: format!("expected 'permissive' or 'strict', got '{other}'"),
        }),
    }
}

fn default_connection_timeout_ms() -> u64 {
    3000
}

fn default_ping_timeout_ms() -> u64 {
    1000
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_true() -> bool {
    true
}
