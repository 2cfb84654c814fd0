//! Periodic background probing.
//!
//! # Responsibilities
//! - Probe every configured chain on an interval
//! - Let the dispatcher recreate clients that stopped answering
//! - Publish the observed heights as metrics

use std::time::Duration;

use tokio::sync::broadcast;
use tokio::time;

use crate::config::schema::HealthCheckConfig;
use crate::dispatch::TransactionDispatcher;

pub struct HealthMonitor {
    dispatcher: TransactionDispatcher,
    config: HealthCheckConfig,
}

impl HealthMonitor {
    pub fn new(dispatcher: TransactionDispatcher, config: HealthCheckConfig) -> Self {
        Self { dispatcher, config }
    }

    pub async fn run(self, mut shutdown: broadcast::Receiver<()>) {
        if !self.config.enabled {
            tracing::info!("Background health checks disabled");
            return;
        }

        tracing::info!(interval = self.config.interval_secs, "Health monitor starting");

        let interval = Duration::from_secs(self.config.interval_secs.max(1));
        let mut ticker = time::interval(interval);

        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    self.check_all().await;
                }
                _ = shutdown.recv() => {
                    tracing::info!("Health monitor received shutdown signal, exiting loop");
                    break;
                }
            }
        }
    }

    async fn check_all(&self) {
        match self.dispatcher.check_and_reconnect_clients(true).await {
            Ok(report) => {
                for chain in report.iter().filter(|c| c.latest_block == 0) {
                    tracing::warn!(chain = %chain.chain, "Chain unreachable");
                }
            }
            Err(e) => tracing::error!(error = %e, "Background probe failed"),
        }
    }
}
