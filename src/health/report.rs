//! Health report assembly.

use std::time::Instant;

use serde::{Deserialize, Serialize};

use crate::dispatch::{ChainHealth, TransactionDispatcher};
use crate::security::clock::Clock;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum HealthStatus {
    Ok,
    Degraded,
    Error,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HealthReport {
    /// Seconds since the service started.
    pub uptime: f64,
    pub message: HealthStatus,
    pub blockchains: Vec<ChainHealth>,
    /// Milliseconds since the Unix epoch.
    pub timestamp: u64,
}

impl HealthReport {
    /// Classify a probe result: any chain at height 0 degrades the report.
    pub fn from_probe(started: Instant, blockchains: Vec<ChainHealth>, timestamp: u64) -> Self {
        let message = if blockchains.iter().all(|c| c.latest_block > 0) {
            HealthStatus::Ok
        } else {
            HealthStatus::Degraded
        };

        Self {
            uptime: started.elapsed().as_secs_f64(),
            message,
            blockchains,
            timestamp,
        }
    }

    pub fn error(started: Instant, timestamp: u64) -> Self {
        Self {
            uptime: started.elapsed().as_secs_f64(),
            message: HealthStatus::Error,
            blockchains: Vec::new(),
            timestamp,
        }
    }

    pub fn is_error(&self) -> bool {
        self.message == HealthStatus::Error
    }

    /// Probe every chain through the dispatcher and build a report.
    pub async fn collect(
        dispatcher: &TransactionDispatcher,
        started: Instant,
        clock: &dyn Clock,
    ) -> Self {
        let report = match dispatcher.check_and_reconnect_clients(true).await {
            Ok(blockchains) => Self::from_probe(started, blockchains, clock.now_ms()),
            Err(e) => {
                tracing::error!(error = %e, "Health probe failed");
                Self::error(started, clock.now_ms())
            }
        };
        tracing::info!(
            message = ?report.message,
            chains = report.blockchains.len(),
            uptime = report.uptime,
            "[HEALTH CHECK]"
        );
        report
    }
}
