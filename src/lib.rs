//! Token faucet service library.
//!
//! Dispenses a fixed amount of tokens per request on Cosmos SDK
//! (ledger-native) and EVM chains, gated by CAPTCHA, proof-of-work and
//! per-address / per-IP rolling daily limits. All chain access is
//! serialised through a single dispatcher task that owns the cached
//! account state.

pub mod blockchain;
pub mod config;
pub mod dispatch;
pub mod health;
pub mod http;
pub mod lifecycle;
pub mod observability;
pub mod security;
pub mod storage;

pub use config::schema::FaucetConfig;
pub use dispatch::{ChainSender, TransactionDispatcher, TxResult};
pub use http::{AppState, HttpServer};
pub use lifecycle::Shutdown;
pub use storage::Store;
