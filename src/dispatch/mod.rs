//! Transaction dispatch subsystem.
//!
//! # Data Flow
//! ```text
//! enqueue_send(recipient, chain)
//!     → queue.rs (FIFO channel, single worker task)
//!     → sender.rs (per-chain send routine)
//!         ledger-native: cached client + account → sign → broadcast
//!             ok:   sequence += 1
//!             fail: clear all caches, resync, retry (bounded)
//!         evm: normalize recipient → value transfer
//!     → TxResult delivered back over a oneshot
//! ```
//!
//! # Design Decisions
//! - Exactly one send executes at a time, across all chains
//! - Caches live inside the worker, so they need no locks
//! - Signing always uses the cached sequence, never a node-fetched one
//! - Any broadcast failure invalidates every chain's cache, not just one
//! - The queue is in memory only; pending sends are lost on crash

pub mod queue;
pub mod sender;
pub mod state;

pub use queue::{DispatchError, TransactionDispatcher, TxExecutor};
pub use sender::{ChainSender, MAX_BROADCASTS};
pub use state::{ChainAccountState, ChainHealth, TxResult};
