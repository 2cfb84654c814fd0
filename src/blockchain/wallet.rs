//! Sender wallet derived from a mnemonic.
//!
//! # Security
//! - Mnemonics come from config or an environment variable named there
//! - Keys are never logged or serialized
//! - Only coin type 60 (eth_secp256k1) derivation paths are supported, so
//!   the same key signs both ledger-native and EVM transfers

use alloy::primitives::{Address, B256};
use alloy::signers::local::{coins_bip39::English, MnemonicBuilder, PrivateKeySigner};
use alloy::signers::SignerSync;

use crate::blockchain::address;
use crate::blockchain::types::{BlockchainError, BlockchainResult, ChainConfig};

/// SLIP-44 coin type of Ethereum-compatible keys.
pub const ETH_COIN_TYPE: u32 = 60;

/// Extract the coin type from a BIP-44 path such as `m/44'/60'/0'/0/0`.
pub fn coin_type(path: &str) -> Option<u32> {
    let mut parts = path.split('/');
    if parts.next()? != "m" || parts.next()? != "44'" {
        return None;
    }
    parts.next()?.strip_suffix('\'')?.parse().ok()
}

/// Signing account of one chain.
#[derive(Clone)]
pub struct SenderWallet {
    signer: PrivateKeySigner,
    prefix: String,
}

impl SenderWallet {
    /// Derive the wallet at `path` from `mnemonic`.
    pub fn from_mnemonic(mnemonic: &str, path: &str, prefix: &str) -> BlockchainResult<Self> {
        match coin_type(path) {
            Some(ETH_COIN_TYPE) => {}
            other => {
                return Err(BlockchainError::Wallet(format!(
                    "Unsupported derivation path '{}' (coin type {:?})",
                    path, other
                )))
            }
        }

        let signer = MnemonicBuilder::<English>::default()
            .phrase(mnemonic.trim())
            .derivation_path(path)
            .map_err(|e| BlockchainError::Wallet(format!("Invalid derivation path: {}", e)))?
            .build()
            .map_err(|e| BlockchainError::Wallet(format!("Invalid mnemonic: {}", e)))?;

        let wallet = Self {
            signer,
            prefix: prefix.to_string(),
        };

        tracing::debug!(address = %wallet.evm_address(), prefix = %prefix, "Wallet derived");
        Ok(wallet)
    }

    /// Derive the sender wallet configured for `chain`.
    pub fn from_chain(chain: &ChainConfig) -> BlockchainResult<Self> {
        Self::from_mnemonic(
            &chain.sender.mnemonic,
            &chain.sender.derivation_path,
            &chain.sender.address_prefix,
        )
    }

    pub fn evm_address(&self) -> Address {
        self.signer.address()
    }

    /// Bech32 address under the chain prefix.
    pub fn address(&self) -> BlockchainResult<String> {
        Ok(address::encode_bech32(&self.prefix, self.evm_address().as_slice())?)
    }

    /// Compressed SEC1 public key.
    pub fn public_key(&self) -> Vec<u8> {
        self.signer
            .credential()
            .verifying_key()
            .to_encoded_point(true)
            .as_bytes()
            .to_vec()
    }

    /// Sign a 32-byte digest, returning `r ‖ s`.
    pub fn sign_prehash(&self, hash: &B256) -> BlockchainResult<[u8; 64]> {
        let signature = self
            .signer
            .sign_hash_sync(hash)
            .map_err(|e| BlockchainError::Wallet(format!("Signing failed: {}", e)))?;

        let bytes = signature.as_bytes();
        let mut out = [0u8; 64];
        out.copy_from_slice(&bytes[..64]);
        Ok(out)
    }

    /// The underlying signer, for EVM transaction signing.
    pub fn signer(&self) -> &PrivateKeySigner {
        &self.signer
    }
}

impl std::fmt::Debug for SenderWallet {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SenderWallet")
            .field("address", &self.evm_address())
            .field("prefix", &self.prefix)
            .finish()
    }
}
