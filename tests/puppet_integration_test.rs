// Copyright (c) 2025 Bountyy Oy. All rights reserved.
// This software is proprietary and confidential.

/**
 * Bountyy Oy - Orchestration Integration Tests
 * Registry, compatibility gating and dispatch driven end to end with
 * in-process plugins
 *
 * @copyright 2025 Bountyy Oy
 * @license Proprietary
 */

use async_trait::async_trait;
use rihmasto_agent::cancellation::CancellationSignal;
use rihmasto_agent::errors::{PuppetError, RegistryError};
use rihmasto_agent::events::{AgentEventData, AgentLifecyclePhase, ChannelAgentEventQueue};
use rihmasto_agent::metrics::AgentMetrics;
use rihmasto_agent::plugins::{
    CredentialsCollector, Exploiter, Fingerprinter, Payload, PluginHandle, PluginManifest,
};
use rihmasto_agent::puppet::{
    PluginCompatibilityVerifier, PluginRegistry, Puppet, UnknownTargetOsPolicy,
};
use rihmasto_agent::types::{
    AgentId, Credentials, ExploiterResultData, FingerprintData, Identity, OperatingSystem,
    PingScanData, PluginKind, PluginName, PluginOptions, PluginVersion, PortScanDataMap,
    PortStatus, Secret, TargetHost,
};
use std::collections::HashMap;
use std::net::{IpAddr, SocketAddr};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;
use tokio::sync::mpsc;

fn name(s: &str) -> PluginName {
    s.parse().unwrap()
}

fn manifest(kind: PluginKind, plugin_name: &str) -> PluginManifest {
    PluginManifest::new(
        name(plugin_name),
        kind,
        PluginVersion::new(1, 0, 0),
        vec![OperatingSystem::Linux, OperatingSystem::Windows],
    )
}

struct ShellCollector {
    manifest: PluginManifest,
}

#[async_trait]
impl CredentialsCollector for ShellCollector {
    fn manifest(&self) -> &PluginManifest {
        &self.manifest
    }

    async fn run(
        &self,
        _options: &PluginOptions,
        _interrupt: &CancellationSignal,
    ) -> anyhow::Result<Vec<Credentials>> {
        Ok(vec![Credentials {
            identity: Some(Identity::Username {
                username: "svc_backup".to_string(),
            }),
            secret: Some(Secret::NtHash {
                nt_hash: "a9fdfa038c4b75ebc76dc855dd74f0da".to_string(),
            }),
        }])
    }
}

/// Derives an OS guess from whichever ports the sweep found open
struct PortProfileFingerprinter {
    manifest: PluginManifest,
}

#[async_trait]
impl Fingerprinter for PortProfileFingerprinter {
    fn manifest(&self) -> &PluginManifest {
        &self.manifest
    }

    async fn fingerprint(
        &self,
        _host: IpAddr,
        _ping_scan_data: &PingScanData,
        port_scan_data: &PortScanDataMap,
        _options: &PluginOptions,
    ) -> anyhow::Result<FingerprintData> {
        let any_open = port_scan_data
            .values()
            .any(|data| data.status == PortStatus::Open);
        Ok(FingerprintData {
            os_type: any_open.then_some(OperatingSystem::Linux),
            os_version: any_open.then(|| "Ubuntu 22.04".to_string()),
            services: Vec::new(),
        })
    }
}

struct BrokenFingerprinter {
    manifest: PluginManifest,
}

#[async_trait]
impl Fingerprinter for BrokenFingerprinter {
    fn manifest(&self) -> &PluginManifest {
        &self.manifest
    }

    async fn fingerprint(
        &self,
        _host: IpAddr,
        _ping_scan_data: &PingScanData,
        _port_scan_data: &PortScanDataMap,
        _options: &PluginOptions,
    ) -> anyhow::Result<FingerprintData> {
        Err(anyhow::anyhow!("probe socket closed unexpectedly"))
    }
}

struct SmbExploiter {
    manifest: PluginManifest,
    invoked: Arc<AtomicBool>,
}

impl SmbExploiter {
    fn handle(requires_known_target_os: bool) -> (PluginHandle, Arc<AtomicBool>) {
        let mut manifest = manifest(PluginKind::Exploiter, "eternalblue")
            .with_target_operating_systems(vec![OperatingSystem::Windows]);
        if requires_known_target_os {
            manifest = manifest.with_requires_known_target_os();
        }
        let invoked = Arc::new(AtomicBool::new(false));
        let handle = PluginHandle::Exploiter(Box::new(Self {
            manifest,
            invoked: invoked.clone(),
        }));
        (handle, invoked)
    }
}

#[async_trait]
impl Exploiter for SmbExploiter {
    fn manifest(&self) -> &PluginManifest {
        &self.manifest
    }

    async fn run(
        &self,
        host: &TargetHost,
        current_depth: u32,
        servers: &[SocketAddr],
        _options: &PluginOptions,
        _interrupt: &CancellationSignal,
    ) -> anyhow::Result<Option<ExploiterResultData>> {
        self.invoked.store(true, Ordering::SeqCst);
        let mut artifacts = HashMap::new();
        artifacts.insert(
            "target".to_string(),
            serde_json::Value::String(host.ip.to_string()),
        );
        artifacts.insert("depth".to_string(), serde_json::json!(current_depth));
        artifacts.insert("callback_count".to_string(), serde_json::json!(servers.len()));
        Ok(Some(ExploiterResultData {
            exploitation_success: true,
            propagation_success: true,
            error_message: None,
            artifacts,
        }))
    }
}

struct EchoPayload {
    manifest: PluginManifest,
}

#[async_trait]
impl Payload for EchoPayload {
    fn manifest(&self) -> &PluginManifest {
        &self.manifest
    }

    async fn run(
        &self,
        _options: &PluginOptions,
        _interrupt: &CancellationSignal,
    ) -> anyhow::Result<()> {
        Ok(())
    }
}

fn build_puppet(
    handles: Vec<PluginHandle>,
    local_os: OperatingSystem,
    policy: UnknownTargetOsPolicy,
) -> (Puppet, mpsc::UnboundedReceiver<rihmasto_agent::events::AgentEvent>) {
    let mut registry = PluginRegistry::new();
    for handle in handles {
        registry.load_plugin(handle).unwrap();
    }
    let registry = Arc::new(registry);
    let verifier = Arc::new(PluginCompatibilityVerifier::new(
        registry.clone(),
        local_os,
        policy,
    ));
    let (queue, rx) = ChannelAgentEventQueue::channel();
    let puppet = Puppet::new(
        registry,
        verifier,
        Arc::new(queue),
        AgentId::new_v4(),
        AgentMetrics::new(true),
    );
    (puppet, rx)
}

#[tokio::test]
async fn test_full_propagation_step() {
    let (exploiter, _invoked) = SmbExploiter::handle(false);
    let (puppet, mut rx) = build_puppet(
        vec![
            PluginHandle::CredentialsCollector(Box::new(ShellCollector {
                manifest: manifest(PluginKind::CredentialsCollector, "shell_history"),
            })),
            PluginHandle::Fingerprinter(Box::new(PortProfileFingerprinter {
                manifest: manifest(PluginKind::Fingerprinter, "port_profile"),
            })),
            exploiter,
            PluginHandle::Payload(Box::new(EchoPayload {
                manifest: manifest(PluginKind::Payload, "beacon"),
            })),
        ],
        OperatingSystem::Linux,
        UnknownTargetOsPolicy::default(),
    );

    let interrupt = CancellationSignal::new();
    let options = PluginOptions::new();

    // An address from the documentation range never answers
    let dark_host: IpAddr = "203.0.113.10".parse().unwrap();
    let ping_data = puppet.ping(dark_host, Duration::from_millis(100)).await;
    assert!(!ping_data.response_received);

    // Sweep loopback with one listening port
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let open_port = listener.local_addr().unwrap().port();
    tokio::spawn(async move {
        loop {
            if listener.accept().await.is_err() {
                break;
            }
        }
    });
    let closed_port = {
        let probe = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = probe.local_addr().unwrap().port();
        drop(probe);
        port
    };

    let loopback: IpAddr = "127.0.0.1".parse().unwrap();
    let sweep = puppet
        .scan_tcp_ports(loopback, &[open_port, closed_port], Duration::from_millis(500))
        .await;
    assert_eq!(sweep[&open_port].status, PortStatus::Open);
    assert_eq!(sweep[&closed_port].status, PortStatus::Closed);

    // Fingerprint from the sweep results
    let fingerprint = puppet
        .fingerprint(
            &name("port_profile"),
            loopback,
            &ping_data,
            &sweep,
            &options,
        )
        .await;
    assert_eq!(fingerprint.os_type, Some(OperatingSystem::Linux));

    // Exploit a host whose OS the fingerprint established
    let target =
        TargetHost::new("10.30.0.7".parse().unwrap()).with_operating_system(OperatingSystem::Windows);
    let servers: Vec<SocketAddr> = vec!["10.30.0.1:5000".parse().unwrap()];
    let result = puppet
        .exploit_host(&name("eternalblue"), &target, 1, &servers, &options, &interrupt)
        .await
        .unwrap();
    assert!(result.exploitation_success);
    assert_eq!(
        result.artifacts["target"],
        serde_json::Value::String("10.30.0.7".to_string())
    );

    // Harvest and drop the follow-on payload locally
    let credentials = puppet
        .run_credentials_collector(&name("shell_history"), &options, &interrupt)
        .await
        .unwrap();
    assert_eq!(credentials.len(), 1);
    puppet
        .run_payload(&name("beacon"), &options, &interrupt)
        .await
        .unwrap();

    puppet.cleanup();

    // Events arrived in operation order
    let mut kinds = Vec::new();
    while let Ok(event) = rx.try_recv() {
        assert_eq!(event.source, puppet.agent_id());
        kinds.push(match event.data {
            AgentEventData::PingScan { .. } => "ping",
            AgentEventData::TcpScan { .. } => "tcp",
            AgentEventData::Lifecycle {
                phase: AgentLifecyclePhase::ShuttingDown,
            } => "shutdown",
            AgentEventData::Lifecycle { .. } => "lifecycle",
        });
    }
    assert_eq!(kinds, vec!["ping", "tcp", "shutdown"]);

    let summary = puppet.metrics().summary();
    assert_eq!(summary.pings_sent, 1);
    assert_eq!(summary.hosts_alive, 0);
    assert_eq!(summary.port_sweeps, 1);
    assert_eq!(summary.open_ports_found, 1);
    assert_eq!(summary.fingerprints_run, 1);
    assert_eq!(summary.fingerprint_failures_absorbed, 0);
    assert_eq!(summary.exploits_attempted, 1);
    assert_eq!(summary.exploits_succeeded, 1);
    assert_eq!(summary.credentials_collected, 1);
}

#[tokio::test]
async fn test_target_gate_matrix() {
    let options = PluginOptions::new();
    let interrupt = CancellationSignal::new();

    // Known Linux target, Windows-only exploiter: blocked before invocation
    let (handle, invoked) = SmbExploiter::handle(false);
    let (puppet, _rx) = build_puppet(
        vec![handle],
        OperatingSystem::Linux,
        UnknownTargetOsPolicy::default(),
    );
    let linux_target =
        TargetHost::new("10.0.0.5".parse().unwrap()).with_operating_system(OperatingSystem::Linux);
    let err = puppet
        .exploit_host(&name("eternalblue"), &linux_target, 1, &[], &options, &interrupt)
        .await
        .unwrap_err();
    assert!(err.is_incompatibility());
    match err {
        PuppetError::IncompatibleTargetOperatingSystem { ip, .. } => {
            assert_eq!(ip, linux_target.ip)
        }
        other => panic!("unexpected error: {other}"),
    }
    assert!(!invoked.load(Ordering::SeqCst));

    // Unknown target OS passes under the permissive default
    let (handle, invoked) = SmbExploiter::handle(false);
    let (puppet, _rx) = build_puppet(
        vec![handle],
        OperatingSystem::Linux,
        UnknownTargetOsPolicy::Permissive,
    );
    let unknown_target = TargetHost::new("10.0.0.5".parse().unwrap());
    puppet
        .exploit_host(&name("eternalblue"), &unknown_target, 1, &[], &options, &interrupt)
        .await
        .unwrap();
    assert!(invoked.load(Ordering::SeqCst));

    // Strict policy refuses the same attempt
    let (handle, invoked) = SmbExploiter::handle(false);
    let (puppet, _rx) = build_puppet(
        vec![handle],
        OperatingSystem::Linux,
        UnknownTargetOsPolicy::Strict,
    );
    let err = puppet
        .exploit_host(&name("eternalblue"), &unknown_target, 1, &[], &options, &interrupt)
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        PuppetError::IncompatibleTargetOperatingSystem { .. }
    ));
    assert!(!invoked.load(Ordering::SeqCst));

    // A plugin that insists on a known target OS overrides permissive
    let (handle, invoked) = SmbExploiter::handle(true);
    let (puppet, _rx) = build_puppet(
        vec![handle],
        OperatingSystem::Linux,
        UnknownTargetOsPolicy::Permissive,
    );
    let err = puppet
        .exploit_host(&name("eternalblue"), &unknown_target, 1, &[], &options, &interrupt)
        .await
        .unwrap_err();
    assert!(err.is_incompatibility());
    assert!(!invoked.load(Ordering::SeqCst));
}

#[tokio::test]
async fn test_fingerprint_failures_collapse_to_empty_data() {
    let (puppet, _rx) = build_puppet(
        vec![PluginHandle::Fingerprinter(Box::new(BrokenFingerprinter {
            manifest: manifest(PluginKind::Fingerprinter, "broken"),
        }))],
        OperatingSystem::Linux,
        UnknownTargetOsPolicy::default(),
    );

    let host: IpAddr = "10.0.0.5".parse().unwrap();
    let ping_data = PingScanData::no_response();
    let sweep = PortScanDataMap::new();
    let options = PluginOptions::new();

    let from_broken = puppet
        .fingerprint(&name("broken"), host, &ping_data, &sweep, &options)
        .await;
    assert!(from_broken.is_empty());

    let from_missing = puppet
        .fingerprint(&name("never_loaded"), host, &ping_data, &sweep, &options)
        .await;
    assert!(from_missing.is_empty());

    assert_eq!(puppet.metrics().summary().fingerprint_failures_absorbed, 2);
}

#[tokio::test]
async fn test_local_gate_blocks_mismatched_collector() {
    let collector = PluginHandle::CredentialsCollector(Box::new(ShellCollector {
        manifest: PluginManifest::new(
            name("sam_dump"),
            PluginKind::CredentialsCollector,
            PluginVersion::new(2, 1, 0),
            vec![OperatingSystem::Windows],
        ),
    }));
    let (puppet, _rx) = build_puppet(
        vec![collector],
        OperatingSystem::Linux,
        UnknownTargetOsPolicy::default(),
    );

    let err = puppet
        .run_credentials_collector(&name("sam_dump"), &PluginOptions::new(), &CancellationSignal::new())
        .await
        .unwrap_err();

    assert!(matches!(
        err,
        PuppetError::IncompatibleLocalOperatingSystem {
            local_os: OperatingSystem::Linux,
            ..
        }
    ));
}

#[tokio::test]
async fn test_registry_rejects_duplicate_names_per_kind() {
    let mut registry = PluginRegistry::new();
    registry
        .load_plugin(PluginHandle::Payload(Box::new(EchoPayload {
            manifest: manifest(PluginKind::Payload, "beacon"),
        })))
        .unwrap();

    let err = registry
        .load_plugin(PluginHandle::Payload(Box::new(EchoPayload {
            manifest: manifest(PluginKind::Payload, "beacon"),
        })))
        .unwrap_err();

    assert!(matches!(err, RegistryError::DuplicateRegistration { .. }));

    // The same name under a different kind is a distinct key
    registry
        .load_plugin(PluginHandle::Fingerprinter(Box::new(
            PortProfileFingerprinter {
                manifest: manifest(PluginKind::Fingerprinter, "beacon"),
            },
        )))
        .unwrap();
    assert_eq!(registry.len(), 2);
}
