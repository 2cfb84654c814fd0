//! Persistent sliding-window rate limiter.
//!
//! Each identity maps to the list of millisecond timestamps at which it was
//! served. A check counts only the entries inside the trailing window, so
//! nothing needs to expire for the limit to recover.

use std::collections::HashMap;
use std::sync::Arc;

use crate::config::schema::{FaucetConfig, LimitConfig};
use crate::observability::metrics;
use crate::security::clock::Clock;
use crate::storage::{Namespace, Store, StoreError};

/// Length of the sliding window: one day.
pub const WINDOW_MS: u64 = 86_400_000;

/// Store namespace holding request histories.
pub const NAMESPACE: &str = "rate_limit";

pub struct RateLimiter {
    history: Namespace,
    clock: Arc<dyn Clock>,
    limits: HashMap<String, LimitConfig>,
    compact_on_write: bool,
}

impl RateLimiter {
    pub fn new(
        store: &Store,
        config: &FaucetConfig,
        clock: Arc<dyn Clock>,
    ) -> Result<Self, StoreError> {
        let limits = config
            .blockchains
            .iter()
            .map(|c| (c.name.clone(), c.limit.clone()))
            .collect();

        Ok(Self {
            history: store.namespace(NAMESPACE)?,
            clock,
            limits,
            compact_on_write: config.db.compact_on_write,
        })
    }

    /// True iff `key` was served fewer than `limit` times in the window.
    ///
    /// A read error counts as an empty history.
    pub fn check(&self, key: &str, limit: u32) -> bool {
        let history = match self.history.get_json::<Vec<u64>>(key) {
            Ok(Some(history)) => history,
            Ok(None) => return true,
            Err(e) => {
                tracing::warn!(key = %key, error = %e, "Rate limit read failed, allowing");
                return true;
            }
        };

        let now = self.clock.now_ms();
        let recent = history
            .iter()
            .filter(|&&t| now.saturating_sub(t) < WINDOW_MS)
            .count();

        recent < limit as usize
    }

    /// Record that `key` was served now.
    pub fn update(&self, key: &str) -> Result<(), StoreError> {
        let now = self.clock.now_ms();
        let compact = self.compact_on_write;

        self.history.update_json::<Vec<u64>, _>(key, |history| {
            let mut history = history.unwrap_or_default();
            if compact {
                history.retain(|&t| now.saturating_sub(t) < WINDOW_MS);
            }
            history.push(now);
            Some(history)
        })?;

        tracing::debug!(key = %key, "Rate limit history updated");
        Ok(())
    }

    /// Forget `key` entirely.
    pub fn remove(&self, key: &str) -> Result<(), StoreError> {
        if !self.history.remove(key)? {
            tracing::info!(key = %key, "Key not found, nothing to remove");
        }
        Ok(())
    }

    /// Per-address budget check. Unknown chains are denied.
    pub fn check_address(&self, address: &str, chain: &str) -> bool {
        let allowed = match self.limits.get(chain) {
            Some(limit) => self.check(address, limit.address),
            None => false,
        };
        if !allowed {
            metrics::record_rate_limited("address");
        }
        allowed
    }

    /// Per-IP budget check on one chain. Unknown chains are denied.
    pub fn check_ip(&self, ip: &str, chain: &str) -> bool {
        let allowed = match self.limits.get(chain) {
            Some(limit) => self.check(&Self::ip_key(chain, ip), limit.ip),
            None => false,
        };
        if !allowed {
            metrics::record_rate_limited("ip");
        }
        allowed
    }

    /// Storage key of the per-chain IP history.
    pub fn ip_key(chain: &str, ip: &str) -> String {
        format!("{chain}{ip}")
    }

    /// Record a successful send for both identities.
    pub fn record_send(&self, address: &str, ip: &str, chain: &str) -> Result<(), StoreError> {
        self.update(&Self::ip_key(chain, ip))?;
        self.update(address)
    }
}

impl std::fmt::Debug for RateLimiter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RateLimiter")
            .field("chains", &self.limits.len())
            .field("compact_on_write", &self.compact_on_write)
            .finish()
    }
}
