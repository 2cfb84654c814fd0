//! Per-chain send routines and their cached state.

use std::collections::HashMap;
use std::sync::Arc;

use alloy::primitives::Address;
use async_trait::async_trait;

use crate::blockchain::address::{self, AddressError};
use crate::blockchain::ledger::{LedgerClient, LedgerConnector};
use crate::blockchain::transaction::{parse_amount, EvmTransfer};
use crate::blockchain::types::{
    AccountInfo, AccountModel, BlockchainError, BlockchainResult, ChainConfig, Coin, EvmReceipt,
    TransferRequest,
};
use crate::blockchain::wallet::SenderWallet;
use crate::config::FaucetConfig;
use crate::dispatch::queue::{DispatchError, TxExecutor};
use crate::dispatch::state::{ChainAccountState, ChainHealth, TxResult};
use crate::observability::metrics;

/// Broadcasts a single send may make before it gives up with code 997.
pub const MAX_BROADCASTS: u32 = 2;

/// Production executor: signs and submits transfers for every configured
/// chain, caching clients and account data between sends.
pub struct ChainSender {
    chains: Vec<ChainConfig>,
    connector: Arc<dyn LedgerConnector>,
    evm: Arc<dyn EvmTransfer>,
    accounts: HashMap<String, ChainAccountState>,
    clients: HashMap<String, Arc<dyn LedgerClient>>,
}

impl ChainSender {
    pub fn new(
        config: &FaucetConfig,
        connector: Arc<dyn LedgerConnector>,
        evm: Arc<dyn EvmTransfer>,
    ) -> Self {
        Self {
            chains: config.blockchains.clone(),
            connector,
            evm,
            accounts: HashMap::new(),
            clients: HashMap::new(),
        }
    }

    fn chain(&self, name: &str) -> Option<ChainConfig> {
        self.chains.iter().find(|c| c.name == name).cloned()
    }

    /// Drop every cached account and client, on all chains.
    fn invalidate_all(&mut self) {
        self.accounts.clear();
        self.clients.clear();
    }

    fn wallet_for(&self, chain: &ChainConfig) -> BlockchainResult<Arc<SenderWallet>> {
        match self.accounts.get(&chain.name) {
            Some(state) => Ok(state.wallet.clone()),
            None => Ok(Arc::new(SenderWallet::from_chain(chain)?)),
        }
    }

    async fn client_for(&mut self, chain: &ChainConfig) -> BlockchainResult<Arc<dyn LedgerClient>> {
        if let Some(client) = self.clients.get(&chain.name) {
            return Ok(client.clone());
        }
        let wallet = self.wallet_for(chain)?;
        let client = self.connector.connect(chain, wallet).await?;
        self.clients.insert(chain.name.clone(), client.clone());
        Ok(client)
    }

    /// Cached client and account state, fetching whatever is missing.
    async fn ensure_ready(
        &mut self,
        chain: &ChainConfig,
    ) -> BlockchainResult<(Arc<dyn LedgerClient>, ChainAccountState)> {
        let client = self.client_for(chain).await?;

        if let Some(state) = self.accounts.get(&chain.name) {
            return Ok((client, state.clone()));
        }

        let wallet = self.wallet_for(chain)?;
        let sender_address = wallet.address()?;
        let info = client.account(&sender_address).await?;
        tracing::info!(
            chain = %chain.name,
            sender = %sender_address,
            account_number = info.account_number,
            sequence = info.sequence,
            "Account data fetched"
        );

        let state = ChainAccountState {
            wallet,
            sender_address,
            account_number: info.account_number,
            sequence: info.sequence,
        };
        self.accounts.insert(chain.name.clone(), state.clone());
        Ok((client, state))
    }

    fn alert(chain: &ChainConfig, recipient: &str, reason: &str) {
        metrics::record_dispatch_alert(&chain.name);
        tracing::error!(
            alert = true,
            chain = %chain.name,
            recipient = %recipient,
            reason = %reason,
            "Send failed terminally; sender state may need operator attention"
        );
    }

    async fn send_raw_cosmos_tx(
        &mut self,
        recipient: &str,
        chain: &ChainConfig,
    ) -> Result<TxResult, DispatchError> {
        let recipient = if address::is_evm_address(recipient) {
            address::to_bech32(&chain.sender.address_prefix, recipient).map_err(BlockchainError::from)?
        } else {
            recipient.to_string()
        };

        let mut attempt = 1;
        loop {
            let (client, state) = match self.ensure_ready(chain).await {
                Ok(ready) => ready,
                Err(e) if attempt == 1 => return Err(e.into()),
                Err(e) => {
                    Self::alert(chain, &recipient, &e.to_string());
                    return Ok(TxResult::recovery_failed(e));
                }
            };

            let request = TransferRequest {
                from: state.sender_address.clone(),
                to: recipient.clone(),
                amount: vec![chain.transfer.coin()],
                fee: chain.fee.amount_list.clone(),
                gas_limit: chain.fee.gas_limit,
                memo: String::new(),
            };
            let account = AccountInfo {
                account_number: state.account_number,
                sequence: state.sequence,
            };

            let outcome = match client.sign(&request, account, chain.chain_id()).await {
                Ok(signed) => client.broadcast(signed).await,
                Err(e) => Err(e),
            };
            metrics::record_broadcast_attempt(&chain.name, outcome.is_ok());

            match outcome {
                Ok(outcome) => {
                    if let Some(cached) = self.accounts.get_mut(&chain.name) {
                        cached.sequence += 1;
                    }
                    tracing::info!(
                        chain = %chain.name,
                        recipient = %recipient,
                        attempt,
                        sequence = state.sequence,
                        code = outcome.code,
                        tx_hash = %outcome.tx_hash,
                        "Transaction broadcast"
                    );
                    return Ok(if outcome.code == 0 {
                        TxResult::broadcast_ok(outcome.tx_hash)
                    } else {
                        TxResult::ledger_error(outcome.code, outcome.tx_hash, outcome.raw_log)
                    });
                }
                Err(e) => {
                    tracing::warn!(
                        chain = %chain.name,
                        recipient = %recipient,
                        attempt,
                        sequence = state.sequence,
                        error = %e,
                        "Broadcast failed"
                    );
                    if attempt >= MAX_BROADCASTS {
                        Self::alert(chain, &recipient, "max attempts reached");
                        return Ok(TxResult::max_attempts());
                    }
                    self.invalidate_all();
                    attempt += 1;
                }
            }
        }
    }

    async fn evm_transfer(&self, recipient: &str, chain: &ChainConfig) -> BlockchainResult<EvmReceipt> {
        let wallet = SenderWallet::from_chain(chain)?;
        let to = address::normalize_to_evm(recipient)?
            .parse::<Address>()
            .map_err(|e| AddressError::InvalidHex(e.to_string()))?;
        let value = parse_amount(&chain.transfer.amount)?;
        self.evm.transfer(chain, &wallet, to, value).await
    }

    async fn send_evm_tx(&self, recipient: &str, chain: &ChainConfig) -> TxResult {
        match self.evm_transfer(recipient, chain).await {
            Ok(receipt) => TxResult::evm_ok(receipt),
            Err(e) => {
                tracing::error!(chain = %chain.name, recipient = %recipient, error = %e, "EVM transfer failed");
                TxResult::evm_failure(e)
            }
        }
    }

    async fn probe(&mut self, chain: &ChainConfig, reconnect: bool) -> u64 {
        if chain.account_model == AccountModel::Evm {
            return match self.evm.latest_block(chain).await {
                Ok(height) => height,
                Err(e) => {
                    tracing::warn!(chain = %chain.name, error = %e, "EVM probe failed");
                    0
                }
            };
        }

        match self.probe_ledger(chain).await {
            Ok(height) => height,
            Err(e) if reconnect => {
                tracing::warn!(chain = %chain.name, error = %e, "Probe failed, reconnecting");
                self.clients.remove(&chain.name);
                self.probe_ledger(chain).await.unwrap_or_else(|e| {
                    tracing::warn!(chain = %chain.name, error = %e, "Probe failed after reconnect");
                    0
                })
            }
            Err(e) => {
                tracing::warn!(chain = %chain.name, error = %e, "Probe failed");
                0
            }
        }
    }

    async fn probe_ledger(&mut self, chain: &ChainConfig) -> BlockchainResult<u64> {
        let client = self.client_for(chain).await?;
        client.latest_height().await
    }
}

#[async_trait]
impl TxExecutor for ChainSender {
    async fn send_tx(&mut self, recipient: &str, chain: &str) -> Result<TxResult, DispatchError> {
        let Some(chain_conf) = self.chain(chain) else {
            tracing::warn!(chain = %chain, "Send requested for unknown chain");
            return Ok(TxResult::unknown_chain(chain));
        };

        match chain_conf.account_model {
            AccountModel::LedgerNative => self.send_raw_cosmos_tx(recipient, &chain_conf).await,
            AccountModel::Evm => Ok(self.send_evm_tx(recipient, &chain_conf).await),
        }
    }

    async fn check_and_reconnect_clients(&mut self, reconnect: bool) -> Vec<ChainHealth> {
        let mut report = Vec::with_capacity(self.chains.len());
        for chain in self.chains.clone() {
            let latest_block = self.probe(&chain, reconnect).await;
            metrics::record_latest_block(&chain.name, latest_block);
            report.push(ChainHealth {
                chain: chain.name.clone(),
                latest_block,
            });
        }
        report
    }

    async fn balance(&mut self, chain: &str) -> Result<Option<Coin>, DispatchError> {
        let Some(chain_conf) = self.chain(chain) else {
            return Ok(None);
        };
        let denom = chain_conf.transfer.denom.clone();

        let coin = match chain_conf.account_model {
            AccountModel::LedgerNative => {
                let client = self.client_for(&chain_conf).await?;
                let sender = self.wallet_for(&chain_conf)?.address()?;
                client.balance(&sender, &denom).await?
            }
            AccountModel::Evm => {
                let wallet = SenderWallet::from_chain(&chain_conf)?;
                let wei = self.evm.balance(&chain_conf, wallet.evm_address()).await?;
                Coin::new(denom, wei.to_string())
            }
        };
        Ok(Some(coin))
    }
}
