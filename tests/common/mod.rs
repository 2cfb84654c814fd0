//! Shared utilities for integration testing.
//!
//! `MockLedger` stands in for a ledger node: it tracks the true on-chain
//! sequence and only accepts transactions signed with it, so sequence
//! drift and recovery can be driven from tests.

use std::sync::atomic::{AtomicBool, AtomicU32, AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

use alloy::primitives::{Address, U256};
use async_trait::async_trait;

use token_faucet::blockchain::ledger::{LedgerClient, LedgerConnector};
use token_faucet::blockchain::types::{
    AccountInfo, BlockchainError, BlockchainResult, BroadcastOutcome, EvmReceipt, SignedTx,
    TransferRequest,
};
use token_faucet::blockchain::{EvmTransfer, SenderWallet};
use token_faucet::config::{ChainConfig, Coin, FaucetConfig};
use token_faucet::dispatch::{ChainSender, TransactionDispatcher};

pub const MNEMONIC: &str = "test test test test test test test test test test test junk";
pub const LEDGER_CHAIN: &str = "mantra-devnet";
pub const EVM_CHAIN: &str = "mantra-evm";
pub const LEDGER_HEIGHT: u64 = 100;
pub const EVM_HEIGHT: u64 = 50;

/// Bech32 form of `0x1448b2449076672aCD167b91406c09552101C5C9`.
pub const RECIPIENT: &str = "mantra1z3yty3yswenj4ngk0wg5qmqf25ssr3wfqayuhv";
pub const RECIPIENT_EVM: &str = "0x1448b2449076672aCD167b91406c09552101C5C9";

/// Faucet config with one ledger-native and one EVM chain.
pub fn test_config() -> FaucetConfig {
    let content = format!(
        r#"
        [pow]
        enabled = false
        difficulty = 2

        [[blockchains]]
        name = "{LEDGER_CHAIN}"
        account_model = "ledger-native"

        [blockchains.endpoint]
        rpc_url = "http://127.0.0.1:1317"

        [blockchains.sender]
        mnemonic = "{MNEMONIC}"
        address_prefix = "mantra"

        [blockchains.transfer]
        amount = "10000000"
        denom = "uom"

        [blockchains.limit]
        address = 1
        ip = 2

        [[blockchains]]
        name = "{EVM_CHAIN}"
        account_model = "evm"

        [blockchains.endpoint]
        rpc_url = "http://127.0.0.1:8545"

        [blockchains.sender]
        mnemonic = "{MNEMONIC}"
        address_prefix = "mantra"

        [blockchains.transfer]
        amount = "1000000000000000000"
        denom = "aom"
    "#
    );
    token_faucet::config::loader::parse_config(&content).unwrap()
}

/// Shared, test-controlled state of the fake ledger.
#[derive(Debug)]
pub struct LedgerState {
    /// Next sequence the chain will accept.
    pub sequence: AtomicU64,
    /// Refuse every broadcast.
    pub reject_all: AtomicBool,
    /// Remaining successful account lookups; `u32::MAX` is unlimited.
    pub lookups_left: AtomicU32,
    /// Result code of accepted transactions.
    pub deliver_code: AtomicU32,
    /// Number of upcoming height probes that fail.
    pub probe_failures: AtomicU32,
    pub connects: AtomicU32,
    /// Sequence of every broadcast, in order.
    pub broadcasts: Mutex<Vec<u64>>,
    /// Recipient of every signed transfer.
    pub recipients: Mutex<Vec<String>>,
}

impl Default for LedgerState {
    fn default() -> Self {
        Self {
            sequence: AtomicU64::new(0),
            reject_all: AtomicBool::new(false),
            lookups_left: AtomicU32::new(u32::MAX),
            deliver_code: AtomicU32::new(0),
            probe_failures: AtomicU32::new(0),
            connects: AtomicU32::new(0),
            broadcasts: Mutex::new(Vec::new()),
            recipients: Mutex::new(Vec::new()),
        }
    }
}

#[allow(dead_code)]
impl LedgerState {
    pub fn broadcasts(&self) -> Vec<u64> {
        self.broadcasts.lock().unwrap().clone()
    }

    pub fn recipients(&self) -> Vec<String> {
        self.recipients.lock().unwrap().clone()
    }

    pub fn connects(&self) -> u32 {
        self.connects.load(Ordering::SeqCst)
    }
}

#[derive(Clone, Default)]
pub struct MockConnector {
    pub state: Arc<LedgerState>,
}

#[async_trait]
impl LedgerConnector for MockConnector {
    async fn connect(
        &self,
        _chain: &ChainConfig,
        _wallet: Arc<SenderWallet>,
    ) -> BlockchainResult<Arc<dyn LedgerClient>> {
        self.state.connects.fetch_add(1, Ordering::SeqCst);
        Ok(Arc::new(MockLedgerClient {
            state: self.state.clone(),
        }))
    }
}

pub struct MockLedgerClient {
    state: Arc<LedgerState>,
}

#[async_trait]
impl LedgerClient for MockLedgerClient {
    async fn account(&self, address: &str) -> BlockchainResult<AccountInfo> {
        let allowed = self
            .state
            .lookups_left
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |left| match left {
                0 => None,
                u32::MAX => Some(u32::MAX),
                n => Some(n - 1),
            })
            .is_ok();
        if !allowed {
            return Err(BlockchainError::AccountLookup {
                address: address.to_string(),
                reason: "node unavailable".to_string(),
            });
        }
        Ok(AccountInfo {
            account_number: 7,
            sequence: self.state.sequence.load(Ordering::SeqCst),
        })
    }

    async fn sign(
        &self,
        request: &TransferRequest,
        account: AccountInfo,
        _chain_id: &str,
    ) -> BlockchainResult<SignedTx> {
        self.state.recipients.lock().unwrap().push(request.to.clone());
        Ok(SignedTx(account.sequence.to_le_bytes().to_vec()))
    }

    async fn broadcast(&self, tx: SignedTx) -> BlockchainResult<BroadcastOutcome> {
        let bytes: [u8; 8] = tx.0.as_slice().try_into().unwrap();
        let sequence = u64::from_le_bytes(bytes);
        self.state.broadcasts.lock().unwrap().push(sequence);

        let expected = self.state.sequence.load(Ordering::SeqCst);
        if self.state.reject_all.load(Ordering::SeqCst) || sequence != expected {
            return Err(BlockchainError::Rejected {
                code: 32,
                log: format!("account sequence mismatch, expected {expected}, got {sequence}"),
            });
        }

        self.state.sequence.fetch_add(1, Ordering::SeqCst);
        let code = self.state.deliver_code.load(Ordering::SeqCst);
        Ok(BroadcastOutcome {
            code,
            tx_hash: format!("HASH{sequence}"),
            raw_log: if code == 0 { String::new() } else { "insufficient funds".to_string() },
        })
    }

    async fn latest_height(&self) -> BlockchainResult<u64> {
        let failing = self
            .state
            .probe_failures
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok();
        if failing {
            return Err(BlockchainError::Rpc("connection reset".to_string()));
        }
        Ok(LEDGER_HEIGHT)
    }

    async fn balance(&self, _address: &str, denom: &str) -> BlockchainResult<Coin> {
        Ok(Coin::new(denom, "1000"))
    }
}

/// Fake EVM chain.
#[derive(Default)]
pub struct MockEvm {
    pub fail: AtomicBool,
    pub nonce: AtomicU64,
    pub transfers: Mutex<Vec<(Address, U256)>>,
}

#[async_trait]
impl EvmTransfer for MockEvm {
    async fn transfer(
        &self,
        _chain: &ChainConfig,
        _wallet: &SenderWallet,
        to: Address,
        value: U256,
    ) -> BlockchainResult<EvmReceipt> {
        if self.fail.load(Ordering::SeqCst) {
            return Err(BlockchainError::Rpc("nonce too low".to_string()));
        }
        self.transfers.lock().unwrap().push((to, value));
        let nonce = self.nonce.fetch_add(1, Ordering::SeqCst);
        Ok(EvmReceipt {
            nonce,
            value: value.to_string(),
            hash: format!("0x{nonce:064x}"),
        })
    }

    async fn latest_block(&self, _chain: &ChainConfig) -> BlockchainResult<u64> {
        Ok(EVM_HEIGHT)
    }

    async fn balance(&self, _chain: &ChainConfig, _address: Address) -> BlockchainResult<U256> {
        Ok(U256::from(5u64))
    }
}

/// Mocks plus a running dispatcher over them.
#[allow(dead_code)]
pub struct Harness {
    pub config: FaucetConfig,
    pub ledger: Arc<LedgerState>,
    pub evm: Arc<MockEvm>,
    pub dispatcher: TransactionDispatcher,
    pub worker: tokio::task::JoinHandle<()>,
}

#[allow(dead_code)]
pub fn harness() -> Harness {
    harness_with(test_config())
}

pub fn harness_with(config: FaucetConfig) -> Harness {
    let connector = MockConnector::default();
    let ledger = connector.state.clone();
    let evm = Arc::new(MockEvm::default());
    let sender = ChainSender::new(&config, Arc::new(connector), evm.clone());
    let (dispatcher, worker) = TransactionDispatcher::spawn(sender);
    Harness {
        config,
        ledger,
        evm,
        dispatcher,
        worker,
    }
}
