// Copyright (c) 2025 Bountyy Oy. All rights reserved.
// This software is proprietary and confidential.

use std::time::Duration;
use tokio_util::sync::CancellationToken;

/// Cooperative stop signal shared between the agent and every operation it
/// drives. Cancellation is best-effort: code observes the signal at its own
/// checkpoints, and an operation that never polls runs to completion.
///
/// Cloning is cheap and all clones observe the same signal. Once set, the
/// signal never resets.
#[derive(Debug, Clone, Default)]
pub struct CancellationSignal {
    token: CancellationToken,
}

impl CancellationSignal {
    pub fn new() -> Self {
        Self {
            token: CancellationToken::new(),
        }
    }

    /// Raise the signal. Idempotent.
    pub fn set(&self) {
        self.token.cancel();
    }

    /// Synchronous poll for use at checkpoints in otherwise-busy code
    pub fn is_set(&self) -> bool {
        self.token.is_cancelled()
    }

    /// Wait until the signal is raised
    pub async fn cancelled(&self) {
        self.token.cancelled().await;
    }

    /// Wait up to `timeout` for the signal; returns true if it was raised in
    /// time. Replaces poll-sleep loops in plugins that pause between steps.
    pub async fn wait_timeout(&self, timeout: Duration) -> bool {
        tokio::time::timeout(timeout, self.token.cancelled())
            .await
            .is_ok()
    }
}
