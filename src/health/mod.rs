//! Health checking subsystem.
//!
//! # Data Flow
//! ```text
//! GET /healthz (report.rs):
//!     dispatcher.check_and_reconnect_clients(true)
//!     → per-chain {chain, latestBlock}
//!     → OK | DEGRADED | ERROR
//!
//! Background probe (active.rs):
//!     Periodic timer
//!     → dispatcher.check_and_reconnect_clients(true)
//!     → faucet_chain_latest_block gauge
//! ```
//!
//! # Design Decisions
//! - Probes go through the dispatcher queue, so they never race a send
//!   on the cached clients
//! - A chain at height 0 degrades the service but does not fail it

pub mod active;
pub mod report;

pub use active::HealthMonitor;
pub use report::{HealthReport, HealthStatus};
