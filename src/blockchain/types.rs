//! Chain-specific types and error definitions.

use serde::{Deserialize, Serialize};
use thiserror::Error;

pub use crate::config::schema::{AccountModel, ChainConfig, Coin};

/// Errors that can occur during blockchain operations.
#[derive(Debug, Error)]
pub enum BlockchainError {
    /// RPC connection or request failed.
    #[error("RPC error: {0}")]
    Rpc(String),

    /// RPC request timed out.
    #[error("RPC timeout after {0} seconds")]
    Timeout(u64),

    /// The node refused the transaction before inclusion.
    #[error("Transaction rejected (code {code}): {log}")]
    Rejected { code: u32, log: String },

    /// Invalid mnemonic, derivation path or signing failure.
    #[error("Wallet error: {0}")]
    Wallet(String),

    /// Recipient or sender address could not be parsed.
    #[error("Address error: {0}")]
    Address(#[from] crate::blockchain::address::AddressError),

    /// Account number / sequence could not be fetched.
    #[error("Account lookup failed for {address}: {reason}")]
    AccountLookup { address: String, reason: String },

    /// Transaction or response could not be encoded or decoded.
    #[error("Encoding error: {0}")]
    Encoding(String),
}

/// Result type for blockchain operations.
pub type BlockchainResult<T> = Result<T, BlockchainError>;

/// On-chain identity of the sending account on a ledger-native chain.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccountInfo {
    pub account_number: u64,
    pub sequence: u64,
}

/// A fully specified ledger-native bank transfer, ready to be signed.
#[derive(Debug, Clone)]
pub struct TransferRequest {
    pub from: String,
    pub to: String,
    pub amount: Vec<Coin>,
    pub fee: Vec<Coin>,
    pub gas_limit: u64,
    pub memo: String,
}

/// Signed transaction bytes ready for broadcast.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignedTx(pub Vec<u8>);

/// Outcome of a broadcast the node accepted into its mempool.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BroadcastOutcome {
    /// Ledger result code; 0 means success.
    pub code: u32,
    pub tx_hash: String,
    pub raw_log: String,
}

/// Result of an EVM value transfer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EvmReceipt {
    pub nonce: u64,
    pub value: String,
    pub hash: String,
}
