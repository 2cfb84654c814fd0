//! Results and cached per-chain state of the dispatcher.

use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::blockchain::types::EvmReceipt;
use crate::blockchain::wallet::SenderWallet;

/// Non-zero code returned when the EVM path fails.
pub const CODE_EVM_FAILURE: u32 = 1;
/// Retry budget exhausted.
pub const CODE_MAX_ATTEMPTS: u32 = 997;
/// Resync after a failed broadcast could not complete.
pub const CODE_RECOVERY_FAILED: u32 = 998;
/// No chain with the requested name is configured.
pub const CODE_UNKNOWN_CHAIN: u32 = 999;

/// Outcome of one send, as returned to the requester.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TxResult {
    pub code: u32,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub transaction_hash: Option<String>,

    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub message: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub nonce: Option<u64>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hash: Option<String>,
}

impl TxResult {
    fn with_code(code: u32, message: impl Into<String>) -> Self {
        Self {
            code,
            transaction_hash: None,
            message: message.into(),
            nonce: None,
            value: None,
            hash: None,
        }
    }

    pub fn broadcast_ok(tx_hash: String) -> Self {
        Self {
            transaction_hash: Some(tx_hash),
            ..Self::with_code(0, "Transaction successfully broadcast.")
        }
    }

    /// Accepted by the node but failed with a ledger error code.
    pub fn ledger_error(code: u32, tx_hash: String, log: String) -> Self {
        Self {
            transaction_hash: Some(tx_hash),
            ..Self::with_code(code, log)
        }
    }

    pub fn max_attempts() -> Self {
        Self::with_code(CODE_MAX_ATTEMPTS, "max attempts reached")
    }

    pub fn recovery_failed(reason: impl std::fmt::Display) -> Self {
        Self::with_code(CODE_RECOVERY_FAILED, format!("recovery failed: {}", reason))
    }

    pub fn unknown_chain(chain: &str) -> Self {
        Self::with_code(
            CODE_UNKNOWN_CHAIN,
            format!("Blockchain Config [{}] not found", chain),
        )
    }

    pub fn evm_ok(receipt: EvmReceipt) -> Self {
        Self {
            nonce: Some(receipt.nonce),
            value: Some(receipt.value),
            hash: Some(receipt.hash),
            ..Self::with_code(0, "")
        }
    }

    pub fn evm_failure(reason: impl std::fmt::Display) -> Self {
        Self::with_code(CODE_EVM_FAILURE, reason.to_string())
    }

    pub fn is_success(&self) -> bool {
        self.code == 0
    }
}

/// Liveness of one chain; a `latest_block` of 0 means unreachable.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChainHealth {
    pub chain: String,
    pub latest_block: u64,
}

/// Cached signer and account data of one ledger-native chain.
#[derive(Debug, Clone)]
pub struct ChainAccountState {
    pub wallet: Arc<SenderWallet>,
    pub sender_address: String,
    pub account_number: u64,
    pub sequence: u64,
}
