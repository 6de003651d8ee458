// Copyright (c) 2025 Bountyy Oy. All rights reserved.
// This software is proprietary and confidential.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::net::IpAddr;

use crate::errors::InvalidPluginNameError;

/// Unique identifier of a running agent process
pub type AgentId = uuid::Uuid;

/// Free-form per-call options forwarded to a plugin and interpreted only there
pub type PluginOptions = HashMap<String, serde_json::Value>;

/// Capability kind a plugin provides, one trait per kind
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum PluginKind {
    CredentialsCollector,
    Fingerprinter,
    Exploiter,
    Payload,
}

impl PluginKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            PluginKind::CredentialsCollector => "credentials collector",
            PluginKind::Fingerprinter => "fingerprinter",
            PluginKind::Exploiter => "exploiter",
            PluginKind::Payload => "payload",
        }
    }
}

impl std::fmt::Display for PluginKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Validated plugin identifier: ASCII alphanumerics and underscores only.
/// Surrounding whitespace is stripped on construction.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(try_from = "String")]
pub struct PluginName(String);

impl PluginName {
    pub fn new(name: impl Into<String>) -> Result<Self, InvalidPluginNameError> {
        let name = name.into();
        let trimmed = name.trim();

        if trimmed.is_empty() {
            return Err(InvalidPluginNameError { name });
        }

        if !trimmed.chars().all(|c| c.is_ascii_alphanumeric() || c == '_') {
            return Err(InvalidPluginNameError { name });
        }

        Ok(PluginName(trimmed.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for PluginName {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl TryFrom<String> for PluginName {
    type Error = InvalidPluginNameError;

    fn try_from(name: String) -> Result<Self, Self::Error> {
        PluginName::new(name)
    }
}

impl std::str::FromStr for PluginName {
    type Err = InvalidPluginNameError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        PluginName::new(s)
    }
}

impl AsRef<str> for PluginName {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// Plugin version following semantic versioning ("1.0.2", "2.15.3-alpha")
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[serde(transparent)]
pub struct PluginVersion(semver::Version);

impl PluginVersion {
    pub fn new(major: u64, minor: u64, patch: u64) -> Self {
        PluginVersion(semver::Version::new(major, minor, patch))
    }

    pub fn as_version(&self) -> &semver::Version {
        &self.0
    }
}

impl std::fmt::Display for PluginVersion {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl std::str::FromStr for PluginVersion {
    type Err = semver::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(PluginVersion(semver::Version::parse(s)?))
    }
}

/// Operating system classification used for compatibility gating
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum OperatingSystem {
    Linux,
    Windows,
}

impl OperatingSystem {
    /// Classification of the machine this agent runs on. Every non-Windows
    /// build target is treated as Linux.
    pub fn local() -> Self {
        if cfg!(target_os = "windows") {
            OperatingSystem::Windows
        } else {
            OperatingSystem::Linux
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            OperatingSystem::Linux => "linux",
            OperatingSystem::Windows => "windows",
        }
    }
}

impl std::fmt::Display for OperatingSystem {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A machine under assessment. The operating system stays `None` until some
/// scan or fingerprint establishes it.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TargetHost {
    pub ip: IpAddr,

    #[serde(default)]
    pub operating_system: Option<OperatingSystem>,
}

impl TargetHost {
    pub fn new(ip: IpAddr) -> Self {
        Self {
            ip,
            operating_system: None,
        }
    }

    pub fn with_operating_system(mut self, operating_system: OperatingSystem) -> Self {
        self.operating_system = Some(operating_system);
        self
    }
}

/// Outcome of a liveness probe against one host
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct PingScanData {
    pub response_received: bool,

    #[serde(default)]
    pub os: Option<OperatingSystem>,
}

impl PingScanData {
    pub fn no_response() -> Self {
        Self {
            response_received: false,
            os: None,
        }
    }
}

/// Observed state of one TCP port
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum PortStatus {
    Open,
    Closed,
    Filtered,
}

impl PortStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            PortStatus::Open => "open",
            PortStatus::Closed => "closed",
            PortStatus::Filtered => "filtered",
        }
    }
}

impl std::fmt::Display for PortStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Per-port result of a TCP sweep
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PortScanData {
    pub port: u16,
    pub status: PortStatus,

    #[serde(default)]
    pub banner: Option<String>,

    #[serde(default)]
    pub service: Option<String>,
}

impl PortScanData {
    pub fn open(port: u16, banner: Option<String>, service: Option<String>) -> Self {
        Self {
            port,
            status: PortStatus::Open,
            banner,
            service,
        }
    }

    pub fn closed(port: u16) -> Self {
        Self {
            port,
            status: PortStatus::Closed,
            banner: None,
            service: None,
        }
    }

    pub fn filtered(port: u16) -> Self {
        Self {
            port,
            status: PortStatus::Filtered,
            banner: None,
            service: None,
        }
    }
}

/// One entry per requested port, keyed by port number
pub type PortScanDataMap = HashMap<u16, PortScanData>;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum TransportProtocol {
    Tcp,
    Udp,
}

/// A service a fingerprinter identified on the target
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct DiscoveredService {
    pub port: u16,
    pub protocol: TransportProtocol,
    pub name: String,
}

/// What a fingerprinter learned about a target. The empty value doubles as
/// the failed-attempt sentinel; only the call's control flow tells a failed
/// attempt apart from a successful attempt that found nothing.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct FingerprintData {
    #[serde(default)]
    pub os_type: Option<OperatingSystem>,

    #[serde(default)]
    pub os_version: Option<String>,

    #[serde(default)]
    pub services: Vec<DiscoveredService>,
}

impl FingerprintData {
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.os_type.is_none() && self.os_version.is_none() && self.services.is_empty()
    }
}

/// Outcome of one exploitation attempt. Exploitation and propagation are
/// reported independently; neither flag implies the other.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ExploiterResultData {
    pub exploitation_success: bool,
    pub propagation_success: bool,

    #[serde(default)]
    pub error_message: Option<String>,

    #[serde(default)]
    pub artifacts: HashMap<String, serde_json::Value>,
}

impl ExploiterResultData {
    pub fn failure(error_message: impl Into<String>) -> Self {
        Self {
            exploitation_success: false,
            propagation_success: false,
            error_message: Some(error_message.into()),
            artifacts: HashMap::new(),
        }
    }
}

/// A credential pair harvested from the local machine. Either half may be
/// missing: a lone password or a username with no recovered secret are both
/// worth reporting.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Credentials {
    #[serde(default)]
    pub identity: Option<Identity>,

    #[serde(default)]
    pub secret: Option<Secret>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "identity_type", rename_all = "snake_case")]
pub enum Identity {
    Username { username: String },
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "secret_type", rename_all = "snake_case")]
pub enum Secret {
    Password { password: String },
    LmHash { lm_hash: String },
    NtHash { nt_hash: String },
    SshKeypair { private_key: String, public_key: String },
}
