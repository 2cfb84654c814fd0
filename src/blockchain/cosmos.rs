//! Ledger-native transfers over the Cosmos SDK REST gateway.
//!
//! # Data Flow
//! ```text
//! TransferRequest + AccountInfo
//!     → MsgSend / TxBody / AuthInfo (protobuf)
//!     → SignDoc → keccak256 → eth_secp256k1 signature
//!     → TxRaw → base64 → POST /cosmos/tx/v1beta1/txs (BROADCAST_MODE_SYNC)
//! ```

use std::sync::Arc;
use std::time::Duration;

use alloy::primitives::keccak256;
use async_trait::async_trait;
use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use prost::Message;
use serde::Deserialize;
use serde_json::Value;

use crate::blockchain::ledger::{LedgerClient, LedgerConnector};
use crate::blockchain::types::{
    AccountInfo, BlockchainError, BlockchainResult, BroadcastOutcome, ChainConfig, Coin, SignedTx,
    TransferRequest,
};
use crate::blockchain::wallet::SenderWallet;

const MSG_SEND_TYPE_URL: &str = "/cosmos.bank.v1beta1.MsgSend";
const SIGN_MODE_DIRECT: i32 = 1;

/// Protobuf messages of the Cosmos SDK transaction format.
pub mod proto {
    #[derive(Clone, PartialEq, ::prost::Message)]
    pub struct Any {
        #[prost(string, tag = "1")]
        pub type_url: ::prost::alloc::string::String,
        #[prost(bytes = "vec", tag = "2")]
        pub value: ::prost::alloc::vec::Vec<u8>,
    }

    #[derive(Clone, PartialEq, ::prost::Message)]
    pub struct Coin {
        #[prost(string, tag = "1")]
        pub denom: ::prost::alloc::string::String,
        #[prost(string, tag = "2")]
        pub amount: ::prost::alloc::string::String,
    }

    #[derive(Clone, PartialEq, ::prost::Message)]
    pub struct MsgSend {
        #[prost(string, tag = "1")]
        pub from_address: ::prost::alloc::string::String,
        #[prost(string, tag = "2")]
        pub to_address: ::prost::alloc::string::String,
        #[prost(message, repeated, tag = "3")]
        pub amount: ::prost::alloc::vec::Vec<Coin>,
    }

    #[derive(Clone, PartialEq, ::prost::Message)]
    pub struct TxBody {
        #[prost(message, repeated, tag = "1")]
        pub messages: ::prost::alloc::vec::Vec<Any>,
        #[prost(string, tag = "2")]
        pub memo: ::prost::alloc::string::String,
        #[prost(uint64, tag = "3")]
        pub timeout_height: u64,
    }

    #[derive(Clone, PartialEq, ::prost::Message)]
    pub struct PubKey {
        #[prost(bytes = "vec", tag = "1")]
        pub key: ::prost::alloc::vec::Vec<u8>,
    }

    #[derive(Clone, PartialEq, ::prost::Message)]
    pub struct ModeInfoSingle {
        #[prost(int32, tag = "1")]
        pub mode: i32,
    }

    /// Only the `single` arm of the mode oneof is ever produced.
    #[derive(Clone, PartialEq, ::prost::Message)]
    pub struct ModeInfo {
        #[prost(message, optional, tag = "1")]
        pub single: ::core::option::Option<ModeInfoSingle>,
    }

    #[derive(Clone, PartialEq, ::prost::Message)]
    pub struct SignerInfo {
        #[prost(message, optional, tag = "1")]
        pub public_key: ::core::option::Option<Any>,
        #[prost(message, optional, tag = "2")]
        pub mode_info: ::core::option::Option<ModeInfo>,
        #[prost(uint64, tag = "3")]
        pub sequence: u64,
    }

    #[derive(Clone, PartialEq, ::prost::Message)]
    pub struct Fee {
        #[prost(message, repeated, tag = "1")]
        pub amount: ::prost::alloc::vec::Vec<Coin>,
        #[prost(uint64, tag = "2")]
        pub gas_limit: u64,
        #[prost(string, tag = "3")]
        pub payer: ::prost::alloc::string::String,
        #[prost(string, tag = "4")]
        pub granter: ::prost::alloc::string::String,
    }

    #[derive(Clone, PartialEq, ::prost::Message)]
    pub struct AuthInfo {
        #[prost(message, repeated, tag = "1")]
        pub signer_infos: ::prost::alloc::vec::Vec<SignerInfo>,
        #[prost(message, optional, tag = "2")]
        pub fee: ::core::option::Option<Fee>,
    }

    #[derive(Clone, PartialEq, ::prost::Message)]
    pub struct SignDoc {
        #[prost(bytes = "vec", tag = "1")]
        pub body_bytes: ::prost::alloc::vec::Vec<u8>,
        #[prost(bytes = "vec", tag = "2")]
        pub auth_info_bytes: ::prost::alloc::vec::Vec<u8>,
        #[prost(string, tag = "3")]
        pub chain_id: ::prost::alloc::string::String,
        #[prost(uint64, tag = "4")]
        pub account_number: u64,
    }

    #[derive(Clone, PartialEq, ::prost::Message)]
    pub struct TxRaw {
        #[prost(bytes = "vec", tag = "1")]
        pub body_bytes: ::prost::alloc::vec::Vec<u8>,
        #[prost(bytes = "vec", tag = "2")]
        pub auth_info_bytes: ::prost::alloc::vec::Vec<u8>,
        #[prost(bytes = "vec", repeated, tag = "3")]
        pub signatures: ::prost::alloc::vec::Vec<::prost::alloc::vec::Vec<u8>>,
    }
}

fn proto_coins(coins: &[Coin]) -> Vec<proto::Coin> {
    coins
        .iter()
        .map(|c| proto::Coin {
            denom: c.denom.clone(),
            amount: c.amount.clone(),
        })
        .collect()
}

/// Build and sign a `MsgSend` transaction with the given account state.
pub fn build_signed_tx(
    wallet: &SenderWallet,
    pubkey_type_url: &str,
    request: &TransferRequest,
    account: AccountInfo,
    chain_id: &str,
) -> BlockchainResult<SignedTx> {
    let msg = proto::MsgSend {
        from_address: request.from.clone(),
        to_address: request.to.clone(),
        amount: proto_coins(&request.amount),
    };
    let body = proto::TxBody {
        messages: vec![proto::Any {
            type_url: MSG_SEND_TYPE_URL.to_string(),
            value: msg.encode_to_vec(),
        }],
        memo: request.memo.clone(),
        timeout_height: 0,
    };
    let pubkey = proto::PubKey {
        key: wallet.public_key(),
    };
    let auth_info = proto::AuthInfo {
        signer_infos: vec![proto::SignerInfo {
            public_key: Some(proto::Any {
                type_url: pubkey_type_url.to_string(),
                value: pubkey.encode_to_vec(),
            }),
            mode_info: Some(proto::ModeInfo {
                single: Some(proto::ModeInfoSingle {
                    mode: SIGN_MODE_DIRECT,
                }),
            }),
            sequence: account.sequence,
        }],
        fee: Some(proto::Fee {
            amount: proto_coins(&request.fee),
            gas_limit: request.gas_limit,
            payer: String::new(),
            granter: String::new(),
        }),
    };

    let body_bytes = body.encode_to_vec();
    let auth_info_bytes = auth_info.encode_to_vec();
    let sign_doc = proto::SignDoc {
        body_bytes: body_bytes.clone(),
        auth_info_bytes: auth_info_bytes.clone(),
        chain_id: chain_id.to_string(),
        account_number: account.account_number,
    };

    let signature = wallet.sign_prehash(&keccak256(sign_doc.encode_to_vec()))?;
    let raw = proto::TxRaw {
        body_bytes,
        auth_info_bytes,
        signatures: vec![signature.to_vec()],
    };

    Ok(SignedTx(raw.encode_to_vec()))
}

/// Parse a `u64` that the REST gateway may render as a string or a number.
fn json_u64(value: &Value) -> Option<u64> {
    match value {
        Value::String(s) => s.parse().ok(),
        Value::Number(n) => n.as_u64(),
        _ => None,
    }
}

/// Extract account number and sequence from an auth query response.
///
/// Plain accounts carry the fields directly; EVM-flavoured accounts nest
/// them under `base_account`.
pub fn parse_account(body: &Value) -> Option<AccountInfo> {
    let account = body.get("account")?;
    let base = account.get("base_account").unwrap_or(account);
    Some(AccountInfo {
        account_number: base.get("account_number").and_then(json_u64).unwrap_or(0),
        sequence: base.get("sequence").and_then(json_u64).unwrap_or(0),
    })
}

/// Extract the height from a latest-block response.
pub fn parse_latest_height(body: &Value) -> Option<u64> {
    ["block", "sdk_block"]
        .iter()
        .find_map(|k| body.get(k)?.get("header")?.get("height").and_then(json_u64))
}

#[derive(Debug, Deserialize)]
struct BroadcastResponse {
    tx_response: TxResponse,
}

#[derive(Debug, Deserialize)]
struct TxResponse {
    #[serde(default)]
    code: u32,
    #[serde(default)]
    txhash: String,
    #[serde(default)]
    raw_log: String,
}

/// Interpret a `BROADCAST_MODE_SYNC` response.
///
/// Sync mode only reports CheckTx. A non-zero code means the tx never
/// entered the mempool and the sequence is still free, so it is an `Err`.
/// The `Ok` outcome therefore always carries code 0; DeliverTx failures
/// are not observed by this client.
fn sync_outcome(tx: TxResponse) -> BlockchainResult<BroadcastOutcome> {
    if tx.code != 0 {
        return Err(BlockchainError::Rejected {
            code: tx.code,
            log: tx.raw_log,
        });
    }

    Ok(BroadcastOutcome {
        code: 0,
        tx_hash: tx.txhash,
        raw_log: tx.raw_log,
    })
}

#[derive(Debug, Deserialize)]
struct BalanceResponse {
    balance: Option<Coin>,
}

/// Connector producing `RestLedgerClient`s.
#[derive(Debug, Clone, Default)]
pub struct RestLedgerConnector;

#[async_trait]
impl LedgerConnector for RestLedgerConnector {
    async fn connect(
        &self,
        chain: &ChainConfig,
        wallet: Arc<SenderWallet>,
    ) -> BlockchainResult<Arc<dyn LedgerClient>> {
        let client = RestLedgerClient::new(chain, wallet)?;
        // Fail early when the gateway is unreachable
        let height = client.latest_height().await?;
        tracing::info!(chain = %chain.name, rpc_url = %chain.endpoint.rpc_url, height, "Ledger client connected");
        Ok(Arc::new(client))
    }
}

/// Ledger client over the REST gateway of one chain.
pub struct RestLedgerClient {
    http: reqwest::Client,
    base_url: String,
    wallet: Arc<SenderWallet>,
    pubkey_type_url: String,
    timeout_secs: u64,
}

impl RestLedgerClient {
    pub fn new(chain: &ChainConfig, wallet: Arc<SenderWallet>) -> BlockchainResult<Self> {
        let base_url: url::Url = chain.endpoint.rpc_url.parse().map_err(|e| {
            BlockchainError::Rpc(format!("Invalid RPC URL '{}': {}", chain.endpoint.rpc_url, e))
        })?;
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(chain.endpoint.timeout_secs))
            .build()
            .map_err(|e| BlockchainError::Rpc(e.to_string()))?;

        Ok(Self {
            http,
            base_url: base_url.as_str().trim_end_matches('/').to_string(),
            wallet,
            pubkey_type_url: chain.sender.pubkey_type_url.clone(),
            timeout_secs: chain.endpoint.timeout_secs,
        })
    }

    fn map_err(&self, e: reqwest::Error) -> BlockchainError {
        if e.is_timeout() {
            BlockchainError::Timeout(self.timeout_secs)
        } else {
            BlockchainError::Rpc(e.to_string())
        }
    }

    async fn get_json(&self, path: &str) -> BlockchainResult<Value> {
        let url = format!("{}{}", self.base_url, path);
        let resp = self.http.get(&url).send().await.map_err(|e| self.map_err(e))?;
        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(BlockchainError::Rpc(format!("GET {} returned {}: {}", path, status, body)));
        }
        resp.json().await.map_err(|e| BlockchainError::Encoding(e.to_string()))
    }
}

#[async_trait]
impl LedgerClient for RestLedgerClient {
    async fn account(&self, address: &str) -> BlockchainResult<AccountInfo> {
        let body = self
            .get_json(&format!("/cosmos/auth/v1beta1/accounts/{}", address))
            .await
            .map_err(|e| BlockchainError::AccountLookup {
                address: address.to_string(),
                reason: e.to_string(),
            })?;

        parse_account(&body).ok_or_else(|| BlockchainError::AccountLookup {
            address: address.to_string(),
            reason: "response has no account".to_string(),
        })
    }

    async fn sign(
        &self,
        request: &TransferRequest,
        account: AccountInfo,
        chain_id: &str,
    ) -> BlockchainResult<SignedTx> {
        build_signed_tx(&self.wallet, &self.pubkey_type_url, request, account, chain_id)
    }

    async fn broadcast(&self, tx: SignedTx) -> BlockchainResult<BroadcastOutcome> {
        let url = format!("{}/cosmos/tx/v1beta1/txs", self.base_url);
        let payload = serde_json::json!({
            "tx_bytes": BASE64.encode(&tx.0),
            "mode": "BROADCAST_MODE_SYNC",
        });

        let resp = self
            .http
            .post(&url)
            .json(&payload)
            .send()
            .await
            .map_err(|e| self.map_err(e))?;
        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(BlockchainError::Rpc(format!("broadcast returned {}: {}", status, body)));
        }

        let body: BroadcastResponse = resp
            .json()
            .await
            .map_err(|e| BlockchainError::Encoding(e.to_string()))?;
        sync_outcome(body.tx_response)
    }

    async fn latest_height(&self) -> BlockchainResult<u64> {
        let body = self
            .get_json("/cosmos/base/tendermint/v1beta1/blocks/latest")
            .await?;
        parse_latest_height(&body)
            .ok_or_else(|| BlockchainError::Encoding("latest block has no height".to_string()))
    }

    async fn balance(&self, address: &str, denom: &str) -> BlockchainResult<Coin> {
        let body = self
            .get_json(&format!(
                "/cosmos/bank/v1beta1/balances/{}/by_denom?denom={}",
                address, denom
            ))
            .await?;
        let parsed: BalanceResponse =
            serde_json::from_value(body).map_err(|e| BlockchainError::Encoding(e.to_string()))?;
        Ok(parsed.balance.unwrap_or_else(|| Coin::new(denom, "0")))
    }
}
