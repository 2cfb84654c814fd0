//! Ledger-client capability used by the dispatcher.
//!
//! The dispatcher never talks to a node directly. It asks a
//! `LedgerConnector` for a client bound to a chain and a sender wallet,
//! and drives that client through account lookup, offline signing and
//! broadcast. Tests substitute their own connector.

use std::sync::Arc;

use async_trait::async_trait;

use crate::blockchain::types::{
    AccountInfo, BlockchainResult, BroadcastOutcome, ChainConfig, Coin, SignedTx, TransferRequest,
};
use crate::blockchain::wallet::SenderWallet;

#[async_trait]
pub trait LedgerClient: Send + Sync {
    /// Current account number and sequence of `address`.
    async fn account(&self, address: &str) -> BlockchainResult<AccountInfo>;

    /// Sign `request` with exactly the given account number and sequence.
    /// Never consults the node.
    async fn sign(
        &self,
        request: &TransferRequest,
        account: AccountInfo,
        chain_id: &str,
    ) -> BlockchainResult<SignedTx>;

    /// Submit a signed transaction.
    ///
    /// `Err` means the node refused it and the sequence was not consumed.
    /// `Ok` means it was accepted; a non-zero `code` is a ledger error that
    /// still consumed the sequence. Clients that only see CheckTx, such as
    /// the REST client in sync mode, never return a non-zero `Ok` code.
    async fn broadcast(&self, tx: SignedTx) -> BlockchainResult<BroadcastOutcome>;

    /// Height of the latest block, used as a liveness probe.
    async fn latest_height(&self) -> BlockchainResult<u64>;

    /// Balance of `address` in `denom`.
    async fn balance(&self, address: &str, denom: &str) -> BlockchainResult<Coin>;
}

#[async_trait]
pub trait LedgerConnector: Send + Sync {
    /// Create a client for `chain` that signs with `wallet`.
    async fn connect(
        &self,
        chain: &ChainConfig,
        wallet: Arc<SenderWallet>,
    ) -> BlockchainResult<Arc<dyn LedgerClient>>;
}
