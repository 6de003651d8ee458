// Copyright (c) 2025 Bountyy Oy. All rights reserved.
// This software is proprietary and confidential.

/**
 * Bountyy Oy - Propagation Metrics
 * Lightweight counters with tracing integration
 *
 * @copyright 2025 Bountyy Oy
 * @license Proprietary - Enterprise Edition
 */

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tracing::debug;

/// Counters covering one agent's scanning and exploitation activity.
/// Cloning shares the underlying counters.
#[derive(Debug, Clone)]
pub struct AgentMetrics {
    enabled: bool,
    pings_sent: Arc<AtomicU64>,
    hosts_alive: Arc<AtomicU64>,
    port_sweeps: Arc<AtomicU64>,
    open_ports_found: Arc<AtomicU64>,
    fingerprints_run: Arc<AtomicU64>,
    fingerprint_failures_absorbed: Arc<AtomicU64>,
    exploits_attempted: Arc<AtomicU64>,
    exploits_succeeded: Arc<AtomicU64>,
    credentials_collected: Arc<AtomicU64>,
}

impl AgentMetrics {
    pub fn new(enabled: bool) -> Self {
        Self {
            enabled,
            pings_sent: Arc::new(AtomicU64::new(0)),
            hosts_alive: Arc::new(AtomicU64::new(0)),
            port_sweeps: Arc::new(AtomicU64::new(0)),
            open_ports_found: Arc::new(AtomicU64::new(0)),
            fingerprints_run: Arc::new(AtomicU64::new(0)),
            fingerprint_failures_absorbed: Arc::new(AtomicU64::new(0)),
            exploits_attempted: Arc::new(AtomicU64::new(0)),
            exploits_succeeded: Arc::new(AtomicU64::new(0)),
            credentials_collected: Arc::new(AtomicU64::new(0)),
        }
    }

    /// Record one liveness probe and whether the host answered
    pub fn record_ping(&self, response_received: bool) {
        if !self.enabled {
            return;
        }

        self.pings_sent.fetch_add(1, Ordering::Relaxed);
        if response_received {
            self.hosts_alive.fetch_add(1, Ordering::Relaxed);
        }
    }

    /// Record one completed TCP sweep
    pub fn record_port_sweep(&self, ports_probed: usize, open_ports: usize) {
        if !self.enabled {
            return;
        }

        self.port_sweeps.fetch_add(1, Ordering::Relaxed);
        self.open_ports_found
            .fetch_add(open_ports as u64, Ordering::Relaxed);

        debug!(
            ports_probed = ports_probed,
            open_ports = open_ports,
            "TCP sweep completed"
        );
    }

    /// Record one fingerprint run; `absorbed_failure` marks runs where the
    /// plugin failed and the empty result was substituted
    pub fn record_fingerprint(&self, absorbed_failure: bool) {
        if !self.enabled {
            return;
        }

        self.fingerprints_run.fetch_add(1, Ordering::Relaxed);
        if absorbed_failure {
            self.fingerprint_failures_absorbed
                .fetch_add(1, Ordering::Relaxed);
        }
    }

    /// Record one exploitation attempt that ran to completion
    pub fn record_exploit_attempt(&self, exploitation_success: bool) {
        if !self.enabled {
            return;
        }

        self.exploits_attempted.fetch_add(1, Ordering::Relaxed);
        if exploitation_success {
            self.exploits_succeeded.fetch_add(1, Ordering::Relaxed);
        }
    }

    /// Record credentials harvested by a collector run
    pub fn record_credentials_collected(&self, count: usize) {
        if !self.enabled {
            return;
        }

        self.credentials_collected
            .fetch_add(count as u64, Ordering::Relaxed);

        debug!(count = count, "Credentials collected");
    }

    /// Get a point-in-time summary of all counters
    pub fn summary(&self) -> AgentMetricsSummary {
        AgentMetricsSummary {
            pings_sent: self.pings_sent.load(Ordering::Relaxed),
            hosts_alive: self.hosts_alive.load(Ordering::Relaxed),
            port_sweeps: self.port_sweeps.load(Ordering::Relaxed),
            open_ports_found: self.open_ports_found.load(Ordering::Relaxed),
            fingerprints_run: self.fingerprints_run.load(Ordering::Relaxed),
            fingerprint_failures_absorbed: self
                .fingerprint_failures_absorbed
                .load(Ordering::Relaxed),
            exploits_attempted: self.exploits_attempted.load(Ordering::Relaxed),
            exploits_succeeded: self.exploits_succeeded.load(Ordering::Relaxed),
            credentials_collected: self.credentials_collected.load(Ordering::Relaxed),
        }
    }
}

impl Default for AgentMetrics {
    fn default() -> Self {
        Self::new(true)
    }
}

/// Metrics summary for reporting
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AgentMetricsSummary {
    pub pings_sent: u64,
    pub hosts_alive: u64,
    pub port_sweeps: u64,
    pub open_ports_found: u64,
    pub fingerprints_run: u64,
    pub fingerprint_failures_absorbed: u64,
    pub exploits_attempted: u64,
    pub exploits_succeeded: u64,
    pub credentials_collected: u64,
}
