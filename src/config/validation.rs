//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Check value ranges (difficulty, gas limit, amounts)
//! - Check that addresses, URLs and derivation paths parse
//! - Detect duplicate chain names
//!
//! # Design Decisions
//! - Returns all validation errors, not just the first
//! - Validation is a pure function: FaucetConfig → Result<(), Vec<ValidationError>>
//! - Runs before config is accepted into the system

use std::collections::HashSet;
use std::fmt;
use std::net::SocketAddr;

use crate::blockchain::wallet::{coin_type, ETH_COIN_TYPE};
use crate::config::schema::{ChainConfig, FaucetConfig};

/// A single semantic problem, tagged with the offending field.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationError {
    pub field: String,
    pub message: String,
}

impl ValidationError {
    fn new(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            message: message.into(),
        }
    }
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.field, self.message)
    }
}

impl std::error::Error for ValidationError {}

/// Validate a parsed configuration, collecting every problem found.
pub fn validate_config(config: &FaucetConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    if config.listener.bind_address.parse::<SocketAddr>().is_err() {
        errors.push(ValidationError::new(
            "listener.bind_address",
            format!("invalid socket address '{}'", config.listener.bind_address),
        ));
    }

    if config.observability.metrics_enabled
        && config.observability.metrics_address.parse::<SocketAddr>().is_err()
    {
        errors.push(ValidationError::new(
            "observability.metrics_address",
            format!("invalid socket address '{}'", config.observability.metrics_address),
        ));
    }

    if config.timeouts.request_secs == 0 {
        errors.push(ValidationError::new("timeouts.request_secs", "must be greater than 0"));
    }

    if config.pow.enabled && !(1..=16).contains(&config.pow.difficulty) {
        errors.push(ValidationError::new(
            "pow.difficulty",
            format!("must be within 1..=16, got {}", config.pow.difficulty),
        ));
    }

    if config.captcha.enabled && config.captcha.site_secret.is_empty() {
        errors.push(ValidationError::new(
            "captcha.site_secret",
            "required when captcha is enabled",
        ));
    }

    if config.captcha.enabled && config.captcha.timeout_secs == 0 {
        errors.push(ValidationError::new("captcha.timeout_secs", "must be greater than 0"));
    }

    if config.health_check.enabled && config.health_check.interval_secs == 0 {
        errors.push(ValidationError::new(
            "health_check.interval_secs",
            "must be greater than 0",
        ));
    }

    if config.blockchains.is_empty() {
        errors.push(ValidationError::new("blockchains", "at least one chain is required"));
    }

    let mut names = HashSet::new();
    for chain in &config.blockchains {
        if !names.insert(chain.name.as_str()) {
            errors.push(ValidationError::new(
                format!("blockchains.{}", chain.name),
                "duplicate chain name",
            ));
        }
        validate_chain(chain, &mut errors);
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

fn validate_chain(chain: &ChainConfig, errors: &mut Vec<ValidationError>) {
    let field = |name: &str| format!("blockchains.{}.{}", chain.name, name);

    if chain.name.trim().is_empty() {
        errors.push(ValidationError::new("blockchains.name", "must not be empty"));
    }

    if let Err(e) = url::Url::parse(&chain.endpoint.rpc_url) {
        errors.push(ValidationError::new(
            field("endpoint.rpc_url"),
            format!("invalid url '{}': {}", chain.endpoint.rpc_url, e),
        ));
    }

    if chain.endpoint.timeout_secs == 0 {
        errors.push(ValidationError::new(field("endpoint.timeout_secs"), "must be greater than 0"));
    }

    if chain.sender.mnemonic.trim().is_empty() {
        errors.push(ValidationError::new(field("sender.mnemonic"), "must not be empty"));
    }

    if chain.sender.address_prefix.is_empty() {
        errors.push(ValidationError::new(field("sender.address_prefix"), "must not be empty"));
    }

    match coin_type(&chain.sender.derivation_path) {
        Some(ETH_COIN_TYPE) => {}
        Some(other) => errors.push(ValidationError::new(
            field("sender.derivation_path"),
            format!("unsupported coin type {other}, only {ETH_COIN_TYPE}' is supported"),
        )),
        None => errors.push(ValidationError::new(
            field("sender.derivation_path"),
            format!("cannot parse '{}'", chain.sender.derivation_path),
        )),
    }

    if chain.transfer.denom.is_empty() {
        errors.push(ValidationError::new(field("transfer.denom"), "must not be empty"));
    }

    if !is_amount(&chain.transfer.amount) {
        errors.push(ValidationError::new(
            field("transfer.amount"),
            format!("not a whole number: '{}'", chain.transfer.amount),
        ));
    }

    for coin in &chain.fee.amount_list {
        if !is_amount(&coin.amount) {
            errors.push(ValidationError::new(
                field("fee.amount_list"),
                format!("not a whole number: '{}'", coin.amount),
            ));
        }
    }

    if chain.fee.gas_limit == 0 {
        errors.push(ValidationError::new(field("fee.gas_limit"), "must be greater than 0"));
    }
}

fn is_amount(s: &str) -> bool {
    !s.is_empty() && s.bytes().all(|b| b.is_ascii_digit())
}
