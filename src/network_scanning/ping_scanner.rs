// Copyright (c) 2025 Bountyy Oy. All rights reserved.
// This software is proprietary and confidential.

use once_cell::sync::Lazy;
use regex::Regex;
use std::net::IpAddr;
use std::time::Duration;
use tokio::process::Command;
use tracing::{debug, warn};

use crate::events::{AgentEvent, AgentEventData, AgentEventQueue};
use crate::types::{AgentId, OperatingSystem, PingScanData};

// TTL ceilings of the common network stacks. A reply TTL at or below the
// ceiling points at the matching OS family, assuming fewer than 64 hops.
const LINUX_TTL_CEILING: u32 = 64;
const WINDOWS_TTL_CEILING: u32 = 128;

static TTL_PATTERN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)ttl=(\d+)").expect("TTL pattern compiles"));

/// Probe `host` once using the system ping binary.
///
/// Never fails: an unreachable host, an expired timeout and a missing ping
/// binary all come back as a not-alive result, since absence of liveness is
/// data rather than an error. The outcome is published to `event_queue`
/// tagged with `agent_id`.
pub async fn ping(
    host: IpAddr,
    timeout: Duration,
    event_queue: &dyn AgentEventQueue,
    agent_id: AgentId,
) -> PingScanData {
    // The per-platform timeout flags are advisory; this cap is the real one
    let data = match tokio::time::timeout(timeout, run_system_ping(host, timeout)).await {
        Ok(data) => data,
        Err(_) => {
            debug!(host = %host, timeout_ms = timeout.as_millis() as u64, "Ping timed out");
            PingScanData::no_response()
        }
    };

    event_queue.publish(AgentEvent::new(
        agent_id,
        Some(host),
        AgentEventData::PingScan {
            response_received: data.response_received,
            os: data.os,
        },
    ));

    data
}

async fn run_system_ping(host: IpAddr, timeout: Duration) -> PingScanData {
    let output = match ping_command(host, timeout).output().await {
        Ok(output) => output,
        Err(err) => {
            warn!(host = %host, error = %err, "Failed to run system ping");
            return PingScanData::no_response();
        }
    };

    if !output.status.success() {
        return PingScanData::no_response();
    }

    let stdout = String::from_utf8_lossy(&output.stdout);
    let os = infer_os_from_ttl(&stdout);
    debug!(host = %host, os = ?os, "Ping reply received");

    PingScanData {
        response_received: true,
        os,
    }
}

fn ping_command(host: IpAddr, timeout: Duration) -> Command {
    let mut command = Command::new("ping");

    #[cfg(windows)]
    {
        command
            .arg("-n")
            .arg("1")
            .arg("-w")
            .arg(timeout.as_millis().to_string());
    }

    #[cfg(not(windows))]
    {
        command
            .arg("-c")
            .arg("1")
            .arg("-W")
            .arg(timeout.as_secs().max(1).to_string());
    }

    command.arg(host.to_string());
    command.kill_on_drop(true);
    command
}

/// Infer the reply sender's OS family from the TTL in ping output
fn infer_os_from_ttl(ping_output: &str) -> Option<OperatingSystem> {
    let captures = TTL_PATTERN.captures(ping_output)?;
    let ttl: u32 = captures.get(1)?.as_str().parse().ok()?;

    if ttl <= LINUX_TTL_CEILING {
        Some(OperatingSystem::Linux)
    } else if ttl <= WINDOWS_TTL_CEILING {
        Some(OperatingSystem::Windows)
    } else {
        None
    }
}
