//! Single-use proof-of-work challenges.
//!
//! A challenge is a random nonce recorded with its issue time. A client
//! solves it by finding a `solution` such that `SHA256(nonce ‖ solution)`
//! starts with `difficulty` hex zeros. Verification consumes the nonce
//! whatever the outcome, so each challenge can succeed at most once.

use std::sync::Arc;

use rand::RngCore;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::config::schema::PowConfig;
use crate::observability::metrics;
use crate::security::clock::Clock;
use crate::storage::{Namespace, Store, StoreError};

/// Hash rate assumed when estimating how long a solve may take.
pub const ASSUMED_HASH_RATE: f64 = 90_000.0;

/// Store namespace holding outstanding nonces.
pub const NAMESPACE: &str = "pow";

const NONCE_BYTES: usize = 16;

/// Issued challenge as handed to the client.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Challenge {
    pub nonce: String,
    pub timestamp: u64,
    pub difficulty: u32,
}

/// Upper bound in milliseconds on the expected solve time at `difficulty`.
pub fn estimate_time(difficulty: u32) -> f64 {
    16f64.powi(difficulty as i32) / ASSUMED_HASH_RATE * 1000.0
}

/// Hex SHA-256 of `nonce ‖ solution`.
pub fn pow_hash(nonce: &str, solution: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(nonce.as_bytes());
    hasher.update(solution.as_bytes());
    hex::encode(hasher.finalize())
}

/// True when `hash` starts with `difficulty` hex zeros.
pub fn meets_target(hash: &str, difficulty: u32) -> bool {
    let difficulty = difficulty as usize;
    hash.len() >= difficulty && hash.bytes().take(difficulty).all(|b| b == b'0')
}

/// Brute-force a solution by counting up from zero.
pub fn solve(nonce: &str, difficulty: u32) -> u64 {
    (0u64..)
        .find(|n| meets_target(&pow_hash(nonce, &n.to_string()), difficulty))
        .unwrap_or(u64::MAX)
}

pub struct PowChallenge {
    nonces: Namespace,
    clock: Arc<dyn Clock>,
    enabled: bool,
    difficulty: u32,
}

impl PowChallenge {
    pub fn new(store: &Store, config: &PowConfig, clock: Arc<dyn Clock>) -> Result<Self, StoreError> {
        Ok(Self {
            nonces: store.namespace(NAMESPACE)?,
            clock,
            enabled: config.enabled,
            difficulty: config.difficulty,
        })
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    pub fn difficulty(&self) -> u32 {
        self.difficulty
    }

    /// Issue a fresh challenge, or `None` when PoW is disabled.
    pub fn issue(&self) -> Result<Option<Challenge>, StoreError> {
        if !self.enabled {
            return Ok(None);
        }

        let mut bytes = [0u8; NONCE_BYTES];
        rand::thread_rng().fill_bytes(&mut bytes);
        let nonce = hex::encode(bytes);
        let timestamp = self.clock.now_ms();

        self.nonces.put_json(&nonce, &timestamp)?;
        metrics::record_pow_challenge();
        tracing::debug!(nonce = %nonce, difficulty = self.difficulty, "PoW challenge issued");

        Ok(Some(Challenge {
            nonce,
            timestamp,
            difficulty: self.difficulty,
        }))
    }

    /// Consume `nonce` and check `solution` against it.
    ///
    /// `timestamp` is the client's echo of the issue time; the stored value
    /// is authoritative.
    pub fn verify(&self, nonce: &str, timestamp: Option<u64>, solution: &str) -> bool {
        let issued_at = match self.nonces.take_json::<u64>(nonce) {
            Ok(Some(issued_at)) => issued_at,
            Ok(None) => {
                tracing::info!(nonce = %nonce, "Did not find nonce in the store");
                metrics::record_pow_verification("missing");
                return false;
            }
            Err(e) => {
                tracing::warn!(nonce = %nonce, error = %e, "Nonce lookup failed");
                metrics::record_pow_verification("missing");
                return false;
            }
        };

        if timestamp.is_some_and(|t| t != issued_at) {
            tracing::debug!(nonce = %nonce, client_timestamp = ?timestamp, issued_at, "Client timestamp differs from issue time");
        }

        if !meets_target(&pow_hash(nonce, solution), self.difficulty) {
            metrics::record_pow_verification("invalid");
            return false;
        }

        let elapsed = self.clock.now_ms().saturating_sub(issued_at);
        if (elapsed as f64) >= estimate_time(self.difficulty) {
            tracing::info!(nonce = %nonce, elapsed_ms = elapsed, "PoW solution expired");
            metrics::record_pow_verification("expired");
            return false;
        }

        metrics::record_pow_verification("valid");
        true
    }
}

impl std::fmt::Debug for PowChallenge {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PowChallenge")
            .field("enabled", &self.enabled)
            .field("difficulty", &self.difficulty)
            .finish()
    }
}
