//! Configuration schema definitions.
//!
//! This module defines the complete configuration structure for the faucet.
//! All types derive Serde traits for deserialization from config files.

use serde::{Deserialize, Serialize};

/// Root configuration for the faucet service.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct FaucetConfig {
    /// Listener configuration (bind address).
    pub listener: ListenerConfig,

    /// Timeout configuration.
    pub timeouts: TimeoutConfig,

    /// Persistent store location and policy.
    pub db: DbConfig,

    /// Project branding shown by the web front-end.
    pub project: ProjectConfig,

    /// Proof-of-work gate.
    pub pow: PowConfig,

    /// CAPTCHA gate.
    pub captcha: CaptchaConfig,

    /// Background chain liveness probing.
    pub health_check: HealthCheckConfig,

    /// Observability settings.
    pub observability: ObservabilityConfig,

    /// Chains the faucet can dispense on.
    pub blockchains: Vec<ChainConfig>,
}

impl FaucetConfig {
    /// Look up a chain entry by name.
    pub fn chain(&self, name: &str) -> Option<&ChainConfig> {
        self.blockchains.iter().find(|c| c.name == name)
    }
}

/// Listener configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ListenerConfig {
    /// Bind address (e.g., "0.0.0.0:8000").
    pub bind_address: String,
}

impl Default for ListenerConfig {
    fn default() -> Self {
        Self {
            bind_address: "0.0.0.0:8000".to_string(),
        }
    }
}

/// Timeout configuration for inbound requests.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct TimeoutConfig {
    /// Request timeout in seconds. Covers the whole send, including queueing.
    pub request_secs: u64,
}

impl Default for TimeoutConfig {
    fn default() -> Self {
        Self { request_secs: 120 }
    }
}

/// Persistent store configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct DbConfig {
    /// Directory of the sled database.
    pub path: String,

    /// Drop rate-limit history older than the window whenever a key is updated.
    pub compact_on_write: bool,
}

impl Default for DbConfig {
    fn default() -> Self {
        Self {
            path: "./db/faucet.db".to_string(),
            compact_on_write: false,
        }
    }
}

/// Project information served to the front-end.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ProjectConfig {
    pub name: String,
    pub logo: String,
    pub deployer: String,
    pub explorer: String,
    pub discord_invite: String,
}

impl Default for ProjectConfig {
    fn default() -> Self {
        Self {
            name: "Mantrachain".to_string(),
            logo: String::new(),
            deployer: String::new(),
            explorer: String::new(),
            discord_invite: String::new(),
        }
    }
}

/// Proof-of-work configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct PowConfig {
    /// Require a solved challenge before a send is accepted.
    pub enabled: bool,

    /// Number of leading zero hex characters required.
    pub difficulty: u32,
}

impl Default for PowConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            difficulty: 5,
        }
    }
}

/// CAPTCHA configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct CaptchaConfig {
    pub enabled: bool,

    /// Public site key handed to the front-end.
    pub site_key: String,

    /// Server-side secret used for verification.
    pub site_secret: String,

    /// Verification endpoint.
    pub verify_url: String,

    /// Timeout for one verification request, in seconds.
    pub timeout_secs: u64,
}

impl Default for CaptchaConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            site_key: String::new(),
            site_secret: String::new(),
            verify_url: "https://www.google.com/recaptcha/api/siteverify".to_string(),
            timeout_secs: 10,
        }
    }
}

/// Background health probe configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct HealthCheckConfig {
    /// Enable periodic probing of every configured chain.
    pub enabled: bool,

    /// Probe interval in seconds.
    pub interval_secs: u64,
}

impl Default for HealthCheckConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            interval_secs: 60,
        }
    }
}

/// Log output format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Pretty,
    Json,
}

/// Observability configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Log level (trace, debug, info, warn, error).
    pub log_level: String,

    /// Log output format.
    pub log_format: LogFormat,

    /// Enable metrics endpoint.
    pub metrics_enabled: bool,

    /// Metrics endpoint bind address.
    pub metrics_address: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            log_format: LogFormat::Pretty,
            metrics_enabled: false,
            metrics_address: "0.0.0.0:9090".to_string(),
        }
    }
}

/// Transaction-construction and addressing scheme of a chain.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize, Default)]
#[serde(rename_all = "kebab-case")]
pub enum AccountModel {
    /// Cosmos SDK accounts: account number + sequence, bech32 addresses.
    #[default]
    #[serde(alias = "cosmos")]
    LedgerNative,
    /// EVM accounts: nonce, 0x-prefixed hex addresses.
    #[serde(alias = "Ethermint", alias = "ethermint")]
    Evm,
}

/// A single denomination/amount pair.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct Coin {
    pub denom: String,
    pub amount: String,
}

impl Coin {
    pub fn new(denom: impl Into<String>, amount: impl Into<String>) -> Self {
        Self {
            denom: denom.into(),
            amount: amount.into(),
        }
    }
}

/// Per-chain configuration entry.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ChainConfig {
    /// Unique chain name used in routes and rate-limit keys.
    pub name: String,

    /// Chain id used when signing; defaults to `name`.
    #[serde(default)]
    pub chain_id: Option<String>,

    #[serde(default)]
    pub account_model: AccountModel,

    pub endpoint: EndpointConfig,

    pub sender: SenderConfig,

    pub transfer: TransferConfig,

    #[serde(default)]
    pub fee: FeeConfig,

    #[serde(default)]
    pub limit: LimitConfig,
}

impl ChainConfig {
    /// Chain id used in sign documents.
    pub fn chain_id(&self) -> &str {
        self.chain_id.as_deref().unwrap_or(&self.name)
    }
}

/// Chain RPC endpoint.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct EndpointConfig {
    /// REST gateway for ledger-native chains, JSON-RPC for EVM chains.
    pub rpc_url: String,

    /// Per-call timeout in seconds.
    #[serde(default = "default_rpc_timeout")]
    pub timeout_secs: u64,
}

fn default_rpc_timeout() -> u64 {
    10
}

/// Sending account configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct SenderConfig {
    /// BIP-39 mnemonic of the faucet account.
    #[serde(default)]
    pub mnemonic: String,

    /// Environment variable that, when set, overrides `mnemonic`.
    #[serde(default)]
    pub mnemonic_env: Option<String>,

    /// BIP-44 derivation path.
    #[serde(default = "default_derivation_path")]
    pub derivation_path: String,

    /// Bech32 human-readable prefix of the chain.
    pub address_prefix: String,

    /// Protobuf type URL of the sender public key.
    #[serde(default = "default_pubkey_type_url")]
    pub pubkey_type_url: String,
}

fn default_derivation_path() -> String {
    "m/44'/60'/0'/0/0".to_string()
}

fn default_pubkey_type_url() -> String {
    "/ethermint.crypto.v1.ethsecp256k1.PubKey".to_string()
}

/// Amount dispensed per successful request.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct TransferConfig {
    pub amount: String,
    pub denom: String,
}

impl TransferConfig {
    pub fn coin(&self) -> Coin {
        Coin::new(self.denom.clone(), self.amount.clone())
    }
}

/// Fee attached to ledger-native transfers.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct FeeConfig {
    pub amount_list: Vec<Coin>,
    pub gas_limit: u64,
}

impl Default for FeeConfig {
    fn default() -> Self {
        Self {
            amount_list: Vec::new(),
            gas_limit: 200_000,
        }
    }
}

/// Requests allowed per rolling day.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct LimitConfig {
    /// Per recipient address.
    pub address: u32,

    /// Per client IP on this chain.
    pub ip: u32,
}

impl Default for LimitConfig {
    fn default() -> Self {
        Self { address: 1, ip: 10 }
    }
}
