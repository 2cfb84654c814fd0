//! Token faucet (v1)
//!
//! # Architecture Overview
//!
//! ```text
//!     Client Request
//!     ──────────────▶ http server ──▶ captcha ──▶ pow ──▶ rate limiter
//!                                                              │
//!                                                              ▼
//!                                                   transaction dispatcher
//!                                                   (single worker, FIFO)
//!                                                              │
//!                                         ┌────────────────────┴───────────┐
//!                                         ▼                                ▼
//!                                 ledger-native REST               EVM JSON-RPC
//!
//!     Cross-cutting: config, storage (sled), observability, lifecycle
//! ```

use std::path::PathBuf;
use std::sync::Arc;

use clap::Parser;
use tokio::net::TcpListener;

use token_faucet::blockchain::{AlloyTransfer, RestLedgerConnector};
use token_faucet::config::load_config;
use token_faucet::dispatch::{ChainSender, TransactionDispatcher};
use token_faucet::health::HealthMonitor;
use token_faucet::lifecycle::{signals::spawn_signal_handler, Shutdown};
use token_faucet::observability::{logging, metrics};
use token_faucet::security::{
    CaptchaVerifier, Clock, PowChallenge, RateLimiter, RecaptchaVerifier, SystemClock,
};
use token_faucet::storage::Store;
use token_faucet::{AppState, HttpServer};

#[derive(Parser)]
#[command(name = "token-faucet", version, about = "Token faucet service")]
struct Args {
    /// Path to the TOML configuration file
    #[arg(short, long, default_value = "faucet.toml")]
    config: PathBuf,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();
    let config = Arc::new(load_config(&args.config)?);

    logging::init_logging(&config.observability)?;
    tracing::info!("token-faucet v{} starting", env!("CARGO_PKG_VERSION"));
    tracing::info!(
        bind_address = %config.listener.bind_address,
        chains = config.blockchains.len(),
        pow = config.pow.enabled,
        captcha = config.captcha.enabled,
        "Configuration loaded"
    );

    if config.observability.metrics_enabled {
        match config.observability.metrics_address.parse() {
            Ok(addr) => metrics::init_metrics(addr)?,
            Err(e) => tracing::error!(
                metrics_address = %config.observability.metrics_address,
                error = %e,
                "Failed to parse metrics address"
            ),
        }
    }

    let store = Store::open(&config.db.path)?;
    let clock: Arc<dyn Clock> = Arc::new(SystemClock);
    let limiter = Arc::new(RateLimiter::new(&store, &config, clock.clone())?);
    let pow = Arc::new(PowChallenge::new(&store, &config.pow, clock.clone())?);
    let captcha: Option<Arc<dyn CaptchaVerifier>> = if config.captcha.enabled {
        Some(Arc::new(RecaptchaVerifier::new(&config.captcha)?))
    } else {
        None
    };

    let sender = ChainSender::new(
        &config,
        Arc::new(RestLedgerConnector),
        Arc::new(AlloyTransfer),
    );
    let (dispatcher, worker) = TransactionDispatcher::spawn(sender);

    let shutdown = Shutdown::new();
    spawn_signal_handler(shutdown.clone());

    let monitor = if config.health_check.enabled {
        let monitor = HealthMonitor::new(dispatcher.clone(), config.health_check.clone());
        Some(tokio::spawn(monitor.run(shutdown.subscribe())))
    } else {
        None
    };

    let listener = TcpListener::bind(&config.listener.bind_address).await?;
    tracing::info!(address = %listener.local_addr()?, "Listening for connections");

    let state = AppState::new(config.clone(), dispatcher, limiter, pow, captcha, clock);
    HttpServer::new(state).run(listener, shutdown.clone()).await?;

    // The server returned, so make sure everything else stops too.
    shutdown.trigger();
    if let Some(monitor) = monitor {
        let _ = monitor.await;
    }
    // Dropping the last dispatcher handles lets the worker drain and exit.
    let _ = worker.await;

    store.flush().await?;
    tracing::info!("Shutdown complete");
    Ok(())
}
