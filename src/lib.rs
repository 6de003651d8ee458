// Copyright (c) 2026 Bountyy Oy. All rights reserved.
// This software is proprietary and confidential.

/**
 * Bountyy Oy - Rihmasto Agent Core
 * Plugin orchestration and scan primitives for the internal network agent
 *
 * @copyright 2026 Bountyy Oy
 * @license Proprietary
 */

pub mod cancellation;
pub mod config;
pub mod errors;
pub mod events;
pub mod types;

// Plugin capability surface
pub mod plugins;

// Orchestration: registry, compatibility gating, dispatch
pub mod puppet;

// Liveness probe and TCP sweep primitives
pub mod network_scanning;

// Production logging and metrics
pub mod logging;
pub mod metrics;
