// Copyright (c) 2025 Bountyy Oy. All rights reserved.
// This software is proprietary and confidential.

/**
 * Bountyy Oy - TCP Port Sweep
 * Concurrent connect scanning with passive banner capture
 *
 * @copyright 2025 Bountyy Oy
 * @license Proprietary
 */

use futures::stream::{self, StreamExt};
use std::collections::HashMap;
use std::net::{IpAddr, SocketAddr};
use std::time::Duration;
use tokio::io::AsyncReadExt;
use tokio::net::TcpStream;
use tokio::time::timeout;
use tracing::debug;

use crate::events::{AgentEvent, AgentEventData, AgentEventQueue};
use crate::types::{AgentId, PortScanData, PortScanDataMap, PortStatus};

/// Upper bound on simultaneous connect probes within one sweep
const MAX_CONCURRENT_PORT_PROBES: usize = 128;

const BANNER_READ_TIMEOUT: Duration = Duration::from_millis(1000);
const BANNER_MAX_BYTES: usize = 256;

/// Probe every port in `ports` once, concurrently, with an independent
/// `timeout` per probe. Returns one entry per requested port; duplicate
/// entries in `ports` collapse. One sweep event covering all ports is
/// published to `event_queue`.
pub async fn scan_tcp_ports(
    host: IpAddr,
    ports: &[u16],
    timeout: Duration,
    event_queue: &dyn AgentEventQueue,
    agent_id: AgentId,
) -> PortScanDataMap {
    let results: Vec<PortScanData> = stream::iter(ports.iter().copied())
        .map(|port| probe_tcp_port(host, port, timeout))
        .buffer_unordered(MAX_CONCURRENT_PORT_PROBES)
        .collect()
        .await;

    let mut port_scan_data: PortScanDataMap = HashMap::with_capacity(results.len());
    for data in results {
        if data.status == PortStatus::Open {
            debug!(host = %host, port = data.port, service = ?data.service, "Open TCP port");
        }
        port_scan_data.insert(data.port, data);
    }

    let statuses: HashMap<u16, PortStatus> = port_scan_data
        .iter()
        .map(|(port, data)| (*port, data.status))
        .collect();
    event_queue.publish(AgentEvent::new(
        agent_id,
        Some(host),
        AgentEventData::TcpScan { ports: statuses },
    ));

    port_scan_data
}

async fn probe_tcp_port(host: IpAddr, port: u16, timeout_duration: Duration) -> PortScanData {
    let socket_addr = SocketAddr::new(host, port);

    match timeout(timeout_duration, TcpStream::connect(socket_addr)).await {
        Ok(Ok(stream)) => {
            let banner = grab_banner(stream, timeout_duration).await;
            let service = well_known_service(port).map(str::to_string);
            PortScanData::open(port, banner, service)
        }
        Ok(Err(_)) => PortScanData::closed(port),
        // No answer within the timeout, something is dropping the SYN
        Err(_) => PortScanData::filtered(port),
    }
}

/// One passive read. Many services (SSH, SMTP, FTP) announce themselves
/// unprompted; nothing is ever written to the socket.
async fn grab_banner(mut stream: TcpStream, timeout_duration: Duration) -> Option<String> {
    let mut buffer = vec![0u8; BANNER_MAX_BYTES];
    let read_timeout = BANNER_READ_TIMEOUT.min(timeout_duration);

    match timeout(read_timeout, stream.read(&mut buffer)).await {
        Ok(Ok(n)) if n > 0 => {
            let banner = String::from_utf8_lossy(&buffer[..n]).trim().to_string();
            if banner.is_empty() {
                None
            } else {
                Some(banner)
            }
        }
        _ => None,
    }
}

/// Service conventionally bound to a well-known port
fn well_known_service(port: u16) -> Option<&'static str> {
    let service = match port {
        20 | 21 => "FTP",
        22 => "SSH",
        23 => "Telnet",
        25 => "SMTP",
        53 => "DNS",
        80 => "HTTP",
        110 => "POP3",
        135 => "MSRPC",
        139 => "NetBIOS",
        143 => "IMAP",
        443 => "HTTPS",
        445 => "SMB",
        1433 => "MSSQL",
        3306 => "MySQL",
        3389 => "RDP",
        5432 => "PostgreSQL",
        5900 => "VNC",
        5985 => "WinRM",
        6379 => "Redis",
        8080 => "HTTP-Proxy",
        _ => return None,
    };
    Some(service)
}
