// Copyright (c) 2025 Bountyy Oy. All rights reserved.
// This software is proprietary and confidential.

/**
 * Bountyy Oy - Capability Orchestrator
 * Single dispatch surface for scans and plugin-backed operations
 *
 * @copyright 2025 Bountyy Oy
 * @license Proprietary
 */

pub mod compatibility;
pub mod plugin_registry;

pub use compatibility::{PluginCompatibilityVerifier, UnknownTargetOsPolicy};
pub use plugin_registry::PluginRegistry;

use std::net::{IpAddr, SocketAddr};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, error, warn};

use crate::cancellation::CancellationSignal;
use crate::errors::{PuppetError, PuppetResult};
use crate::events::{AgentEvent, AgentEventData, AgentEventQueue, AgentLifecyclePhase};
use crate::metrics::AgentMetrics;
use crate::network_scanning;
use crate::types::{
    AgentId, Credentials, ExploiterResultData, FingerprintData, PingScanData, PluginKind,
    PluginName, PluginOptions, PortScanDataMap, PortStatus, TargetHost,
};

/// Front door for every capability the agent carries. Scan primitives are
/// built in; credentials collection, fingerprinting, exploitation and
/// payloads dispatch to registered plugins behind compatibility gates.
///
/// Shared across hosts and tasks behind an `Arc`; all operations take
/// `&self` and the orchestrator spawns no tasks of its own.
pub struct Puppet {
    registry: Arc<PluginRegistry>,
    compatibility_verifier: Arc<PluginCompatibilityVerifier>,
    event_queue: Arc<dyn AgentEventQueue>,
    agent_id: AgentId,
    metrics: AgentMetrics,
    cleaned_up: AtomicBool,
}

impl Puppet {
    /// The verifier is expected to wrap the same registry handed in here;
    /// gate checks and lookups then agree on which plugins exist.
    pub fn new(
        registry: Arc<PluginRegistry>,
        compatibility_verifier: Arc<PluginCompatibilityVerifier>,
        event_queue: Arc<dyn AgentEventQueue>,
        agent_id: AgentId,
        metrics: AgentMetrics,
    ) -> Self {
        Self {
            registry,
            compatibility_verifier,
            event_queue,
            agent_id,
            metrics,
            cleaned_up: AtomicBool::new(false),
        }
    }

    pub fn agent_id(&self) -> AgentId {
        self.agent_id
    }

    pub fn metrics(&self) -> &AgentMetrics {
        &self.metrics
    }

    // -----------------------------------------------------------------------
    // Scan primitives
    // -----------------------------------------------------------------------

    /// Liveness probe. Infallible; an unreachable host is data, not an error.
    pub async fn ping(&self, host: IpAddr, timeout: Duration) -> PingScanData {
        let data =
            network_scanning::ping(host, timeout, self.event_queue.as_ref(), self.agent_id).await;
        self.metrics.record_ping(data.response_received);
        data
    }

    /// Concurrent TCP connect sweep with an independent `timeout` per port.
    pub async fn scan_tcp_ports(
        &self,
        host: IpAddr,
        ports: &[u16],
        timeout: Duration,
    ) -> PortScanDataMap {
        let port_scan_data = network_scanning::scan_tcp_ports(
            host,
            ports,
            timeout,
            self.event_queue.as_ref(),
            self.agent_id,
        )
        .await;

        let open_ports = port_scan_data
            .values()
            .filter(|data| data.status == PortStatus::Open)
            .count();
        self.metrics.record_port_sweep(port_scan_data.len(), open_ports);
        port_scan_data
    }

    // -----------------------------------------------------------------------
    // Plugin dispatch
    // -----------------------------------------------------------------------

    /// Run a credentials collector on this machine. The local-OS gate is
    /// checked before the plugin is touched; an empty vec is a successful
    /// run that found nothing.
    pub async fn run_credentials_collector(
        &self,
        name: &PluginName,
        options: &PluginOptions,
        interrupt: &CancellationSignal,
    ) -> PuppetResult<Vec<Credentials>> {
        self.ensure_local_compatibility(PluginKind::CredentialsCollector, name)?;

        let collector = self.registry.credentials_collector(name)?;
        let credentials = collector.run(options, interrupt).await.map_err(|source| {
            PuppetError::PluginInvocation {
                kind: PluginKind::CredentialsCollector,
                name: name.clone(),
                source,
            }
        })?;

        debug!(plugin = %name, count = credentials.len(), "Credentials collector finished");
        self.metrics.record_credentials_collected(credentials.len());
        Ok(credentials)
    }

    /// Profile a remote host through a fingerprinter plugin.
    ///
    /// Never fails: gate rejections, unknown plugin names and plugin errors
    /// are logged at error level and collapse to [`FingerprintData::empty`].
    pub async fn fingerprint(
        &self,
        name: &PluginName,
        host: IpAddr,
        ping_scan_data: &PingScanData,
        port_scan_data: &PortScanDataMap,
        options: &PluginOptions,
    ) -> FingerprintData {
        match self
            .try_fingerprint(name, host, ping_scan_data, port_scan_data, options)
            .await
        {
            Ok(data) => {
                self.metrics.record_fingerprint(false);
                data
            }
            Err(err) => {
                error!(plugin = %name, host = %host, error = %err, "Fingerprinter failed, returning empty data");
                self.metrics.record_fingerprint(true);
                FingerprintData::empty()
            }
        }
    }

    async fn try_fingerprint(
        &self,
        name: &PluginName,
        host: IpAddr,
        ping_scan_data: &PingScanData,
        port_scan_data: &PortScanDataMap,
        options: &PluginOptions,
    ) -> PuppetResult<FingerprintData> {
        self.ensure_local_compatibility(PluginKind::Fingerprinter, name)?;

        let fingerprinter = self.registry.fingerprinter(name)?;
        fingerprinter
            .fingerprint(host, ping_scan_data, port_scan_data, options)
            .await
            .map_err(|source| PuppetError::PluginInvocation {
                kind: PluginKind::Fingerprinter,
                name: name.clone(),
                source,
            })
    }

    /// Attempt to compromise `host` with the named exploiter.
    ///
    /// The local-OS gate runs first, then the target-OS gate; the plugin is
    /// only invoked once both pass. An attempt that ran and failed is an
    /// `Ok` carrying a failure-shaped result, not an `Err`.
    pub async fn exploit_host(
        &self,
        name: &PluginName,
        host: &TargetHost,
        current_depth: u32,
        servers: &[SocketAddr],
        options: &PluginOptions,
        interrupt: &CancellationSignal,
    ) -> PuppetResult<ExploiterResultData> {
        self.ensure_local_compatibility(PluginKind::Exploiter, name)?;
        self.ensure_target_compatibility(PluginKind::Exploiter, name, host)?;

        let exploiter = self.registry.exploiter(name)?;
        let outcome = exploiter
            .run(host, current_depth, servers, options, interrupt)
            .await
            .map_err(|source| PuppetError::PluginInvocation {
                kind: PluginKind::Exploiter,
                name: name.clone(),
                source,
            })?;

        let result = match outcome {
            Some(result) => result,
            None => {
                // Plugins must report an outcome; treat silence as a failed attempt
                warn!(plugin = %name, host = %host.ip, "Exploiter returned no result data");
                ExploiterResultData::failure(format!("Exploiter '{name}' returned no result data"))
            }
        };

        self.metrics
            .record_exploit_attempt(result.exploitation_success);
        Ok(result)
    }

    /// Run a payload on this machine. Payloads carry no compatibility
    /// gating; a loaded payload is assumed runnable.
    pub async fn run_payload(
        &self,
        name: &PluginName,
        options: &PluginOptions,
        interrupt: &CancellationSignal,
    ) -> PuppetResult<()> {
        let payload = self.registry.payload(name)?;
        payload
            .run(options, interrupt)
            .await
            .map_err(|source| PuppetError::PluginInvocation {
                kind: PluginKind::Payload,
                name: name.clone(),
                source,
            })
    }

    /// Announce shutdown. Safe to call more than once; only the first call
    /// publishes the lifecycle event. Plugins themselves are released when
    /// the registry drops.
    pub fn cleanup(&self) {
        if self.cleaned_up.swap(true, Ordering::SeqCst) {
            return;
        }

        debug!(agent_id = %self.agent_id, "Orchestrator shutting down");
        self.event_queue.publish(AgentEvent::new(
            self.agent_id,
            None,
            AgentEventData::Lifecycle {
                phase: AgentLifecyclePhase::ShuttingDown,
            },
        ));
    }

    // -----------------------------------------------------------------------
    // Gates
    // -----------------------------------------------------------------------

    fn ensure_local_compatibility(&self, kind: PluginKind, name: &PluginName) -> PuppetResult<()> {
        let compatible = self
            .compatibility_verifier
            .verify_local_operating_system_compatibility(kind, name)?;
        if compatible {
            Ok(())
        } else {
            Err(PuppetError::IncompatibleLocalOperatingSystem {
                kind,
                name: name.clone(),
                local_os: self.compatibility_verifier.local_os(),
            })
        }
    }

    fn ensure_target_compatibility(
        &self,
        kind: PluginKind,
        name: &PluginName,
        host: &TargetHost,
    ) -> PuppetResult<()> {
        let compatible = self
            .compatibility_verifier
            .verify_target_operating_system_compatibility(kind, name, host)?;
        if compatible {
            Ok(())
        } else {
            Err(PuppetError::IncompatibleTargetOperatingSystem {
                kind,
                name: name.clone(),
                ip: host.ip,
            })
        }
    }
}

impl std::fmt::Debug for Puppet {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Puppet")
            .field("agent_id", &self.agent_id)
            .field("loaded_plugins", &self.registry.len())
            .finish()
    }
}
