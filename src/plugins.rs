// Copyright (c) 2025 Bountyy Oy. All rights reserved.
// This software is proprietary and confidential.

//! Plugin capability surface.
//!
//! One trait per capability kind. Concrete plugins arrive through the plugin
//! distribution pipeline already unpacked and linked; the agent core only
//! ever sees them as trait objects behind [`PluginHandle`].

use anyhow::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::net::{IpAddr, SocketAddr};

use crate::cancellation::CancellationSignal;
use crate::types::{
    Credentials, ExploiterResultData, FingerprintData, OperatingSystem, PingScanData, PluginKind,
    PluginName, PluginOptions, PluginVersion, PortScanDataMap, TargetHost,
};

// ---------------------------------------------------------------------------
// Manifest
// ---------------------------------------------------------------------------

/// Plugin-declared metadata, fixed when the plugin is built
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PluginManifest {
    pub name: PluginName,

    /// Must match the capability trait the plugin implements
    pub kind: PluginKind,

    pub version: PluginVersion,

    #[serde(default)]
    pub description: Option<String>,

    /// Operating systems the plugin can run on
    pub supported_local_operating_systems: Vec<OperatingSystem>,

    /// Operating systems the plugin can attack. `None` for capability kinds
    /// that have no notion of a target.
    #[serde(default)]
    pub supported_target_operating_systems: Option<Vec<OperatingSystem>>,

    /// When true the plugin refuses targets whose operating system has not
    /// been established, regardless of the verifier policy
    #[serde(default)]
    pub requires_known_target_os: bool,
}

impl PluginManifest {
    pub fn new(
        name: PluginName,
        kind: PluginKind,
        version: PluginVersion,
        supported_local_operating_systems: Vec<OperatingSystem>,
    ) -> Self {
        Self {
            name,
            kind,
            version,
            description: None,
            supported_local_operating_systems,
            supported_target_operating_systems: None,
            requires_known_target_os: false,
        }
    }

    pub fn with_target_operating_systems(
        mut self,
        supported_target_operating_systems: Vec<OperatingSystem>,
    ) -> Self {
        self.supported_target_operating_systems = Some(supported_target_operating_systems);
        self
    }

    pub fn with_requires_known_target_os(mut self) -> Self {
        self.requires_known_target_os = true;
        self
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }
}

// ---------------------------------------------------------------------------
// Capability traits
// ---------------------------------------------------------------------------

/// Harvests credentials from the machine the agent is running on
#[async_trait]
pub trait CredentialsCollector: Send + Sync {
    fn manifest(&self) -> &PluginManifest;

    /// Collect whatever the plugin can find. An empty vec is a successful
    /// run that found nothing.
    async fn run(
        &self,
        options: &PluginOptions,
        interrupt: &CancellationSignal,
    ) -> Result<Vec<Credentials>>;
}

/// Builds an OS and service profile of a remote host from prior scan data
#[async_trait]
pub trait Fingerprinter: Send + Sync {
    fn manifest(&self) -> &PluginManifest;

    async fn fingerprint(
        &self,
        host: IpAddr,
        ping_scan_data: &PingScanData,
        port_scan_data: &PortScanDataMap,
        options: &PluginOptions,
    ) -> Result<FingerprintData>;
}

/// Attempts to compromise a remote host and start an agent on it
#[async_trait]
pub trait Exploiter: Send + Sync {
    fn manifest(&self) -> &PluginManifest;

    /// `servers` lists callback addresses a newly started agent can reach
    /// back to, forwarded verbatim; `current_depth` is the propagation depth
    /// the new agent inherits. Returning `Ok(None)` violates the contract
    /// and is reported to the caller as a failed attempt, not an error.
    async fn run(
        &self,
        host: &TargetHost,
        current_depth: u32,
        servers: &[SocketAddr],
        options: &PluginOptions,
        interrupt: &CancellationSignal,
    ) -> Result<Option<ExploiterResultData>>;
}

/// Runs an effect on the local machine (encryption simulation, beacon, ...)
#[async_trait]
pub trait Payload: Send + Sync {
    fn manifest(&self) -> &PluginManifest;

    async fn run(&self, options: &PluginOptions, interrupt: &CancellationSignal) -> Result<()>;
}

// ---------------------------------------------------------------------------
// Handle
// ---------------------------------------------------------------------------

/// A loaded plugin of any capability kind. Owned by the registry; all other
/// components borrow through it.
pub enum PluginHandle {
    CredentialsCollector(Box<dyn CredentialsCollector>),
    Fingerprinter(Box<dyn Fingerprinter>),
    Exploiter(Box<dyn Exploiter>),
    Payload(Box<dyn Payload>),
}

impl PluginHandle {
    /// Capability kind, derived from the variant rather than the manifest
    pub fn kind(&self) -> PluginKind {
        match self {
            PluginHandle::CredentialsCollector(_) => PluginKind::CredentialsCollector,
            PluginHandle::Fingerprinter(_) => PluginKind::Fingerprinter,
            PluginHandle::Exploiter(_) => PluginKind::Exploiter,
            PluginHandle::Payload(_) => PluginKind::Payload,
        }
    }

    pub fn manifest(&self) -> &PluginManifest {
        match self {
            PluginHandle::CredentialsCollector(plugin) => plugin.manifest(),
            PluginHandle::Fingerprinter(plugin) => plugin.manifest(),
            PluginHandle::Exploiter(plugin) => plugin.manifest(),
            PluginHandle::Payload(plugin) => plugin.manifest(),
        }
    }

    pub fn name(&self) -> &PluginName {
        &self.manifest().name
    }

    pub fn supported_local_operating_systems(&self) -> &[OperatingSystem] {
        &self.manifest().supported_local_operating_systems
    }

    pub fn supported_target_operating_systems(&self) -> Option<&[OperatingSystem]> {
        self.manifest().supported_target_operating_systems.as_deref()
    }

    pub fn requires_known_target_os(&self) -> bool {
        self.manifest().requires_known_target_os
    }
}

impl std::fmt::Debug for PluginHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PluginHandle")
            .field("kind", &self.kind())
            .field("name", &self.name().as_str())
            .finish()
    }
}
