// Copyright (c) 2026 Bountyy Oy. All rights reserved.
// This software is proprietary and confidential.

/**
 * Bountyy Oy - Agent Error Types
 * Production-ready error handling with thiserror
 *
 * @copyright 2026 Bountyy Oy
 * @license Proprietary - Enterprise Edition
 */

use thiserror::Error;
use std::net::IpAddr;

use crate::types::{OperatingSystem, PluginKind, PluginName};

/// Errors raised by the plugin registry
#[derive(Error, Debug)]
pub enum RegistryError {
    /// A plugin with the same kind and name was already loaded
    #[error("A {kind} plugin named '{name}' is already registered")]
    DuplicateRegistration {
        kind: PluginKind,
        name: PluginName,
    },

    /// No plugin with this kind and name has been loaded
    #[error("No {kind} plugin named '{name}' is registered")]
    PluginNotFound {
        kind: PluginKind,
        name: PluginName,
    },
}

/// Errors raised by puppet operations
#[derive(Error, Debug)]
pub enum PuppetError {
    /// The plugin declares no support for the operating system the agent
    /// itself is running on
    #[error("The {kind} plugin '{name}' does not support the local operating system ({local_os})")]
    IncompatibleLocalOperatingSystem {
        kind: PluginKind,
        name: PluginName,
        local_os: OperatingSystem,
    },

    /// The exploiter declares no support for the target's operating system
    #[error("The {kind} plugin '{name}' cannot target the operating system on {ip}")]
    IncompatibleTargetOperatingSystem {
        kind: PluginKind,
        name: PluginName,
        ip: IpAddr,
    },

    /// Registry lookup failures surface unchanged
    #[error(transparent)]
    Registry(#[from] RegistryError),

    /// The plugin itself failed; the source chain carries whatever the
    /// plugin reported
    #[error("The {kind} plugin '{name}' failed: {source}")]
    PluginInvocation {
        kind: PluginKind,
        name: PluginName,
        #[source]
        source: anyhow::Error,
    },
}

impl PuppetError {
    /// True for the two compatibility-gate rejections, which mean the plugin
    /// was never invoked
    pub fn is_incompatibility(&self) -> bool {
        matches!(
            self,
            PuppetError::IncompatibleLocalOperatingSystem { .. }
                | PuppetError::IncompatibleTargetOperatingSystem { .. }
        )
    }
}

/// Raised when constructing a [`PluginName`](crate::types::PluginName) from a
/// malformed string
#[derive(Error, Debug)]
#[error("Invalid plugin name '{name}': expected ASCII letters, digits or underscores")]
pub struct InvalidPluginNameError {
    pub name: String,
}

/// Configuration loading and validation errors
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Invalid value for {variable}: {reason}")]
    InvalidEnvOverride {
        variable: String,
        reason: String,
    },

    #[error("Configuration validation failed: {0}")]
    Validation(#[from] validator::ValidationErrors),
}

/// Result type for puppet operations
pub type PuppetResult<T> = Result<T, PuppetError>;
