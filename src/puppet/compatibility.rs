// Copyright (c) 2025 Bountyy Oy. All rights reserved.
// This software is proprietary and confidential.

use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::trace;

use crate::errors::RegistryError;
use crate::puppet::plugin_registry::PluginRegistry;
use crate::types::{OperatingSystem, PluginKind, PluginName, TargetHost};

/// How to gate plugins against targets whose operating system is unknown
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum UnknownTargetOsPolicy {
    /// Let the attempt proceed. Exploiting before fingerprinting has
    /// established the OS is a normal part of propagation.
    Permissive,

    /// Refuse the attempt until some scan establishes the target OS
    Strict,
}

impl Default for UnknownTargetOsPolicy {
    fn default() -> Self {
        UnknownTargetOsPolicy::Permissive
    }
}

/// Answers "may this plugin run here, or against that host" from manifest
/// declarations alone. Verification is read-only and never touches plugin
/// state.
#[derive(Debug, Clone)]
pub struct PluginCompatibilityVerifier {
    registry: Arc<PluginRegistry>,
    local_os: OperatingSystem,
    unknown_target_os_policy: UnknownTargetOsPolicy,
}

impl PluginCompatibilityVerifier {
    pub fn new(
        registry: Arc<PluginRegistry>,
        local_os: OperatingSystem,
        unknown_target_os_policy: UnknownTargetOsPolicy,
    ) -> Self {
        Self {
            registry,
            local_os,
            unknown_target_os_policy,
        }
    }

    /// Operating system the verifier treats as the agent's own
    pub fn local_os(&self) -> OperatingSystem {
        self.local_os
    }

    /// Can the plugin execute on the machine this agent occupies?
    /// Fails with `PluginNotFound` when the name was never registered.
    pub fn verify_local_operating_system_compatibility(
        &self,
        kind: PluginKind,
        name: &PluginName,
    ) -> Result<bool, RegistryError> {
        let handle = self.registry.get_plugin(kind, name)?;
        let compatible = handle
            .supported_local_operating_systems()
            .contains(&self.local_os);

        trace!(
            kind = %kind,
            name = %name,
            local_os = %self.local_os,
            compatible,
            "Verified local operating system compatibility"
        );
        Ok(compatible)
    }

    /// Can the plugin attack `host`? Plugins that declare no target set pass
    /// unconditionally. An unknown target OS is governed by the configured
    /// policy, unless the plugin itself demands a known OS.
    pub fn verify_target_operating_system_compatibility(
        &self,
        kind: PluginKind,
        name: &PluginName,
        host: &TargetHost,
    ) -> Result<bool, RegistryError> {
        let handle = self.registry.get_plugin(kind, name)?;

        let supported = match handle.supported_target_operating_systems() {
            Some(supported) => supported,
            None => return Ok(true),
        };

        let compatible = match host.operating_system {
            Some(os) => supported.contains(&os),
            None if handle.requires_known_target_os() => false,
            None => self.unknown_target_os_policy == UnknownTargetOsPolicy::Permissive,
        };

        trace!(
            kind = %kind,
            name = %name,
            ip = %host.ip,
            target_os = ?host.operating_system,
            compatible,
            "Verified target operating system compatibility"
        );
        Ok(compatible)
    }
}
