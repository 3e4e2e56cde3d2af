//! Shutdown coordination
//!
//! Turns SIGINT / SIGTERM into cancellation of a shared token. The worker
//! loop polls the token between iterations; the API server uses it to drain
//! connections.

use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

/// Owns the process-wide shutdown token
#[derive(Debug, Clone, Default)]
pub struct ShutdownCoordinator {
    token: CancellationToken,
}

impl ShutdownCoordinator {
    pub fn new() -> Self {
        Self::default()
    }

    /// A handle that observes shutdown
    pub fn token(&self) -> CancellationToken {
        self.token.clone()
    }

    /// Requests shutdown; calling it again has no effect
    pub fn trigger(&self) {
        self.token.cancel();
    }

    pub fn is_triggered(&self) -> bool {
        self.token.is_cancelled()
    }

    /// Spawns a task that triggers shutdown on the first termination signal
    pub fn listen_for_signals(&self) -> tokio::task::JoinHandle<()> {
        let coordinator = self.clone();

        tokio::spawn(async move {
            tokio::select! {
                _ = wait_for_signal() => {
                    info!("Received shutdown signal");
                    coordinator.trigger();
                }
                _ = coordinator.token.cancelled() => {}
            }
        })
    }
}

#[cfg(unix)]
async fn wait_for_signal() {
    use tokio::signal::unix::{SignalKind, signal};

    let mut terminate = match signal(SignalKind::terminate()) {
        Ok(stream) => stream,
        Err(e) => {
            warn!("Failed to install SIGTERM handler: {}", e);
            wait_for_ctrl_c().await;
            return;
        }
    };

    tokio::select! {
        _ = wait_for_ctrl_c() => {}
        _ = terminate.recv() => {}
    }
}

#[cfg(not(unix))]
async fn wait_for_signal() {
    wait_for_ctrl_c().await;
}

async fn wait_for_ctrl_c() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!("Failed to listen for Ctrl-C: {}", e);
        std::future::pending::<()>().await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn test_trigger_cancels_tokens() {
        let coordinator = ShutdownCoordinator::new();
        let token = coordinator.token();

        assert!(!coordinator.is_triggered());
        coordinator.trigger();
        coordinator.trigger();

        assert!(coordinator.is_triggered());
        assert!(token.is_cancelled());
    }

    #[tokio::test]
    async fn test_listener_exits_after_manual_trigger() {
        let coordinator = ShutdownCoordinator::new();
        let listener = coordinator.listen_for_signals();

        coordinator.trigger();

        tokio::time::timeout(Duration::from_secs(1), listener)
            .await
            .unwrap()
            .unwrap();
    }
}
