//! Blockchain integration subsystem.
//!
//! # Data Flow
//! ```text
//! ChainConfig (mnemonic, derivation path, prefix)
//!     → wallet.rs (key derivation, prehash signing)
//!     → ledger.rs (capability traits the dispatcher drives)
//!         → cosmos.rs (REST gateway: account, sign, broadcast, height)
//!     → transaction.rs (EVM value transfer)
//!         → client.rs (JSON-RPC reads with timeouts)
//! address.rs converts recipients between bech32 and 0x-hex forms.
//! ```
//!
//! # Security Constraints
//! - Mnemonics only come from config or the environment variable it names
//! - Never log keys or mnemonics
//! - All RPC calls have configurable timeouts

pub mod address;
pub mod client;
pub mod cosmos;
pub mod ledger;
pub mod transaction;
pub mod types;
pub mod wallet;

pub use address::AddressError;
pub use client::EvmClient;
pub use cosmos::RestLedgerConnector;
pub use ledger::{LedgerClient, LedgerConnector};
pub use transaction::{AlloyTransfer, EvmTransfer};
pub use types::{BlockchainError, BlockchainResult};
pub use wallet::SenderWallet;
