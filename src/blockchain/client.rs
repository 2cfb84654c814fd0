//! EVM JSON-RPC client with timeout and error handling.
//!
//! # Responsibilities
//! - Connect to a chain's JSON-RPC endpoint
//! - Query chain state (block number, balances, nonces)
//! - Map timeouts and transport errors onto `BlockchainError`

use std::future::IntoFuture;
use std::sync::Arc;
use std::time::Duration;

use alloy::primitives::{Address, U256};
use alloy::providers::{Provider, ProviderBuilder};
use tokio::time::timeout;

use crate::blockchain::types::{BlockchainError, BlockchainResult, ChainConfig};

/// Read-only EVM RPC client for one chain.
#[derive(Clone)]
pub struct EvmClient {
    provider: Arc<dyn Provider + Send + Sync>,
    rpc_url: url::Url,
    timeout_secs: u64,
}

impl EvmClient {
    /// Create a client for `chain`. Does not touch the network.
    pub fn new(chain: &ChainConfig) -> BlockchainResult<Self> {
        let rpc_url: url::Url = chain.endpoint.rpc_url.parse().map_err(|e| {
            BlockchainError::Rpc(format!("Invalid RPC URL '{}': {}", chain.endpoint.rpc_url, e))
        })?;
        let provider = Arc::new(ProviderBuilder::new().connect_http(rpc_url.clone()))
            as Arc<dyn Provider + Send + Sync>;

        Ok(Self {
            provider,
            rpc_url,
            timeout_secs: chain.endpoint.timeout_secs,
        })
    }

    pub fn rpc_url(&self) -> &url::Url {
        &self.rpc_url
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    async fn call<T, E, F>(&self, what: &str, fut: F) -> BlockchainResult<T>
    where
        F: IntoFuture<Output = Result<T, E>>,
        E: std::fmt::Display,
    {
        match timeout(self.timeout(), fut).await {
            Ok(Ok(result)) => Ok(result),
            Ok(Err(e)) => {
                tracing::warn!(rpc_url = %self.rpc_url, error = %e, "RPC error during {}", what);
                Err(BlockchainError::Rpc(format!("{} failed: {}", what, e)))
            }
            Err(_) => {
                tracing::warn!(rpc_url = %self.rpc_url, "RPC timeout during {}", what);
                Err(BlockchainError::Timeout(self.timeout_secs))
            }
        }
    }

    /// Get the latest block number.
    pub async fn get_block_number(&self) -> BlockchainResult<u64> {
        self.call("get_block_number", self.provider.get_block_number())
            .await
    }

    /// Get the balance of an address in wei.
    pub async fn get_balance(&self, address: Address) -> BlockchainResult<U256> {
        self.call("get_balance", self.provider.get_balance(address))
            .await
    }

    /// Get the transaction count (nonce) for an address.
    pub async fn get_transaction_count(&self, address: Address) -> BlockchainResult<u64> {
        self.call(
            "get_transaction_count",
            self.provider.get_transaction_count(address),
        )
        .await
    }

    /// Check if the chain is reachable.
    pub async fn is_healthy(&self) -> bool {
        self.get_block_number().await.is_ok()
    }
}

impl std::fmt::Debug for EvmClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EvmClient")
            .field("rpc_url", &self.rpc_url.as_str())
            .field("timeout_secs", &self.timeout_secs)
            .finish()
    }
}
