// Copyright (c) 2025 Bountyy Oy. All rights reserved.
// This software is proprietary and confidential.

pub mod ping_scanner;
pub mod tcp_scanner;

pub use ping_scanner::ping;
pub use tcp_scanner::scan_tcp_ports;
