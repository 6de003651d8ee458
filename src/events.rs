// Copyright (c) 2025 Bountyy Oy. All rights reserved.
// This software is proprietary and confidential.

/**
 * Bountyy Oy - Agent Event Stream
 * Fire-and-forget observability events emitted while the agent works
 *
 * @copyright 2025 Bountyy Oy
 * @license Proprietary
 */

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::net::IpAddr;
use tokio::sync::mpsc;

use crate::types::{AgentId, OperatingSystem, PortStatus};

/// One observability event, tagged with the identity of the agent that
/// produced it so events from a whole propagation wave can be correlated.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AgentEvent {
    /// Agent that emitted the event
    pub source: AgentId,

    /// Host the event concerns, if any
    #[serde(default)]
    pub target: Option<IpAddr>,

    pub timestamp: DateTime<Utc>,

    pub data: AgentEventData,
}

impl AgentEvent {
    pub fn new(source: AgentId, target: Option<IpAddr>, data: AgentEventData) -> Self {
        Self {
            source,
            target,
            timestamp: Utc::now(),
            data,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "event_type", rename_all = "snake_case")]
pub enum AgentEventData {
    /// Outcome of a liveness probe
    PingScan {
        response_received: bool,
        os: Option<OperatingSystem>,
    },

    /// Outcome of one TCP sweep, all requested ports included
    TcpScan { ports: HashMap<u16, PortStatus> },

    /// Agent lifecycle transition
    Lifecycle { phase: AgentLifecyclePhase },
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum AgentLifecyclePhase {
    Started,
    ShuttingDown,
}

/// Sink for agent events. Publishing never blocks and never fails from the
/// caller's point of view; a sink that went away drops events silently.
pub trait AgentEventQueue: Send + Sync {
    fn publish(&self, event: AgentEvent);
}

/// Channel-backed sink. The receiving half usually lives on a forwarding
/// task owned by the embedding agent process.
#[derive(Debug, Clone)]
pub struct ChannelAgentEventQueue {
    tx: mpsc::UnboundedSender<AgentEvent>,
}

impl ChannelAgentEventQueue {
    pub fn channel() -> (Self, mpsc::UnboundedReceiver<AgentEvent>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx }, rx)
    }
}

impl AgentEventQueue for ChannelAgentEventQueue {
    fn publish(&self, event: AgentEvent) {
        // A closed receiver means shutdown is already underway
        let _ = self.tx.send(event);
    }
}

/// Sink that discards everything, for embedders that do not consume events
#[derive(Debug, Clone, Copy, Default)]
pub struct NullAgentEventQueue;

impl AgentEventQueue for NullAgentEventQueue {
    fn publish(&self, _event: AgentEvent) {}
}
