//! Metrics collection and exposition.
//!
//! # Metrics
//! - `faucet_http_requests_total` (counter): requests by route, status
//! - `faucet_http_request_duration_seconds` (histogram): handler latency
//! - `faucet_rate_limited_total` (counter): rejections by kind (address, ip)
//! - `faucet_pow_verifications_total` (counter): outcomes (valid, invalid, missing, expired)
//! - `faucet_pow_challenges_total` (counter): challenges issued
//! - `faucet_transactions_total` (counter): sends by chain, outcome
//! - `faucet_broadcast_attempts_total` (counter): broadcasts by chain, result
//! - `faucet_dispatch_alerts_total` (counter): terminal send failures by chain
//! - `faucet_queue_depth` (gauge): pending sends
//! - `faucet_chain_latest_block` (gauge): last probed height per chain

use std::net::SocketAddr;
use std::time::Instant;

use metrics::{counter, gauge, histogram};
use metrics_exporter_prometheus::PrometheusBuilder;

/// Install the Prometheus recorder and its HTTP listener.
///
/// Must be called from within a tokio runtime.
pub fn init_metrics(addr: SocketAddr) -> Result<(), Box<dyn std::error::Error>> {
    PrometheusBuilder::new().with_http_listener(addr).install()?;
    tracing::info!(address = %addr, "Metrics exporter listening");
    Ok(())
}

pub fn record_request(route: &str, status: u16, start: Instant) {
    counter!(
        "faucet_http_requests_total",
        "route" => route.to_string(),
        "status" => status.to_string()
    )
    .increment(1);
    histogram!("faucet_http_request_duration_seconds", "route" => route.to_string())
        .record(start.elapsed().as_secs_f64());
}

pub fn record_rate_limited(kind: &'static str) {
    counter!("faucet_rate_limited_total", "kind" => kind).increment(1);
}

pub fn record_pow_challenge() {
    counter!("faucet_pow_challenges_total").increment(1);
}

pub fn record_pow_verification(outcome: &'static str) {
    counter!("faucet_pow_verifications_total", "outcome" => outcome).increment(1);
}

pub fn record_transaction(chain: &str, code: u32) {
    let outcome = match code {
        0 => "success",
        997 => "max_attempts",
        998 => "recovery_failed",
        999 => "unknown_chain",
        _ => "ledger_error",
    };
    counter!(
        "faucet_transactions_total",
        "chain" => chain.to_string(),
        "outcome" => outcome
    )
    .increment(1);
}

pub fn record_broadcast_attempt(chain: &str, ok: bool) {
    let result = if ok { "ok" } else { "failed" };
    counter!(
        "faucet_broadcast_attempts_total",
        "chain" => chain.to_string(),
        "result" => result
    )
    .increment(1);
}

pub fn record_dispatch_alert(chain: &str) {
    counter!("faucet_dispatch_alerts_total", "chain" => chain.to_string()).increment(1);
}

pub fn record_queue_depth(depth: usize) {
    gauge!("faucet_queue_depth").set(depth as f64);
}

pub fn record_latest_block(chain: &str, height: u64) {
    gauge!("faucet_chain_latest_block", "chain" => chain.to_string()).set(height as f64);
}
