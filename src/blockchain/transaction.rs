//! EVM value transfers.
//!
//! # Responsibilities
//! - Sync the sender nonce from the chain before each transfer
//! - Build, sign and broadcast a plain value transfer
//! - Report `{nonce, value, hash}` of the submitted transaction

use alloy::network::{EthereumWallet, TransactionBuilder};
use alloy::primitives::{Address, U256};
use alloy::providers::{Provider, ProviderBuilder};
use alloy::rpc::types::TransactionRequest;
use async_trait::async_trait;
use tokio::time::timeout;

use crate::blockchain::client::EvmClient;
use crate::blockchain::types::{BlockchainError, BlockchainResult, ChainConfig, EvmReceipt};
use crate::blockchain::wallet::SenderWallet;

/// Capability to move native tokens on an EVM chain.
#[async_trait]
pub trait EvmTransfer: Send + Sync {
    /// Send `value` wei from `wallet` to `to`.
    async fn transfer(
        &self,
        chain: &ChainConfig,
        wallet: &SenderWallet,
        to: Address,
        value: U256,
    ) -> BlockchainResult<EvmReceipt>;

    /// Latest block number, used as a liveness probe.
    async fn latest_block(&self, chain: &ChainConfig) -> BlockchainResult<u64>;

    /// Balance of `address` in wei.
    async fn balance(&self, chain: &ChainConfig, address: Address) -> BlockchainResult<U256>;
}

/// Build a value transfer request with an explicit nonce.
pub fn build_transfer(to: Address, value: U256, nonce: u64) -> TransactionRequest {
    TransactionRequest::default()
        .with_to(to)
        .with_value(value)
        .with_nonce(nonce)
}

/// Parse a configured decimal amount into wei.
pub fn parse_amount(amount: &str) -> BlockchainResult<U256> {
    amount
        .parse::<U256>()
        .map_err(|e| BlockchainError::Encoding(format!("Invalid amount '{}': {}", amount, e)))
}

/// `EvmTransfer` over alloy HTTP providers.
#[derive(Debug, Clone, Default)]
pub struct AlloyTransfer;

#[async_trait]
impl EvmTransfer for AlloyTransfer {
    async fn transfer(
        &self,
        chain: &ChainConfig,
        wallet: &SenderWallet,
        to: Address,
        value: U256,
    ) -> BlockchainResult<EvmReceipt> {
        let client = EvmClient::new(chain)?;

        // Get current nonce from chain
        let nonce = client.get_transaction_count(wallet.evm_address()).await?;
        let tx = build_transfer(to, value, nonce);

        let provider = ProviderBuilder::new()
            .wallet(EthereumWallet::from(wallet.signer().clone()))
            .connect_http(client.rpc_url().clone());

        let pending = match timeout(client.timeout(), provider.send_transaction(tx)).await {
            Ok(Ok(pending)) => pending,
            Ok(Err(e)) => return Err(BlockchainError::Rpc(format!("send_transaction failed: {}", e))),
            Err(_) => return Err(BlockchainError::Timeout(chain.endpoint.timeout_secs)),
        };
        let hash = *pending.tx_hash();

        tracing::info!(
            chain = %chain.name,
            to = %to,
            nonce,
            tx_hash = %hash,
            "EVM transfer submitted"
        );

        Ok(EvmReceipt {
            nonce,
            value: value.to_string(),
            hash: hash.to_string(),
        })
    }

    async fn latest_block(&self, chain: &ChainConfig) -> BlockchainResult<u64> {
        EvmClient::new(chain)?.get_block_number().await
    }

    async fn balance(&self, chain: &ChainConfig, address: Address) -> BlockchainResult<U256> {
        EvmClient::new(chain)?.get_balance(address).await
    }
}
