//! HTTP server setup and handlers.
//!
//! # Responsibilities
//! - Create the Axum router with all faucet routes
//! - Wire up middleware (request ID, tracing, timeout, metrics)
//! - Gate sends behind CAPTCHA, proof-of-work, address and rate checks
//! - Bind to the listener and stop on shutdown

use std::collections::BTreeMap;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::{Duration, Instant};

use axum::{
    body::{Body, Bytes},
    extract::{Path, State},
    http::{Request, StatusCode},
    middleware,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde_json::json;
use tokio::net::TcpListener;
use tower_http::{timeout::TimeoutLayer, trace::TraceLayer};

use crate::blockchain::address::{canonical_recipient, validate_recipient};
use crate::blockchain::wallet::SenderWallet;
use crate::config::{AccountModel, FaucetConfig};
use crate::dispatch::{DispatchError, TransactionDispatcher};
use crate::health::HealthReport;
use crate::http::middleware::{request_id_middleware, track_metrics, RequestId};
use crate::http::request::{ClientIp, SendRequest};
use crate::http::response::ApiError;
use crate::lifecycle::Shutdown;
use crate::security::{CaptchaVerifier, Clock, PowChallenge, RateLimiter};

/// Application state injected into handlers.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<FaucetConfig>,
    pub dispatcher: TransactionDispatcher,
    pub limiter: Arc<RateLimiter>,
    pub pow: Arc<PowChallenge>,
    pub captcha: Option<Arc<dyn CaptchaVerifier>>,
    pub clock: Arc<dyn Clock>,
    pub started: Instant,
    /// Sender address per chain, shown by the front-end.
    pub samples: Arc<BTreeMap<String, String>>,
}

impl AppState {
    pub fn new(
        config: Arc<FaucetConfig>,
        dispatcher: TransactionDispatcher,
        limiter: Arc<RateLimiter>,
        pow: Arc<PowChallenge>,
        captcha: Option<Arc<dyn CaptchaVerifier>>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        let samples = Arc::new(sender_samples(&config));
        Self {
            config,
            dispatcher,
            limiter,
            pow,
            captcha,
            clock,
            started: Instant::now(),
            samples,
        }
    }
}

fn sender_samples(config: &FaucetConfig) -> BTreeMap<String, String> {
    let mut samples = BTreeMap::new();
    for chain in &config.blockchains {
        let wallet = match SenderWallet::from_chain(chain) {
            Ok(w) => w,
            Err(e) => {
                tracing::warn!(chain = %chain.name, error = %e, "Cannot derive sender address");
                continue;
            }
        };
        let address = match chain.account_model {
            AccountModel::Evm => Ok(wallet.evm_address().to_checksum(None)),
            AccountModel::LedgerNative => wallet.address(),
        };
        match address {
            Ok(a) => {
                samples.insert(chain.name.clone(), a);
            }
            Err(e) => tracing::warn!(chain = %chain.name, error = %e, "Cannot encode sender address"),
        }
    }
    samples
}

/// HTTP server for the faucet.
pub struct HttpServer {
    router: Router,
}

impl HttpServer {
    pub fn new(state: AppState) -> Self {
        let timeout = Duration::from_secs(state.config.timeouts.request_secs);
        Self {
            router: Self::build_router(state, timeout),
        }
    }

    /// Build the Axum router with all middleware layers.
    #[allow(deprecated)]
    pub fn build_router(state: AppState, request_timeout: Duration) -> Router {
        Router::new()
            .route("/pow-challenge", get(pow_challenge_handler))
            .route("/send/{chain}/{address}", post(send_handler))
            .route("/healthz", get(health_handler))
            .route("/config.json", get(config_handler))
            .route("/balance/{chain}", get(balance_handler))
            .route_layer(middleware::from_fn(track_metrics))
            .with_state(state)
            .layer(TimeoutLayer::new(request_timeout))
            .layer(TraceLayer::new_for_http().make_span_with(|req: &Request<Body>| {
                let request_id = req
                    .extensions()
                    .get::<RequestId>()
                    .map(|id| id.0.clone())
                    .unwrap_or_default();
                tracing::info_span!(
                    "request",
                    method = %req.method(),
                    uri = %req.uri(),
                    request_id = %request_id,
                )
            }))
            .layer(middleware::from_fn(request_id_middleware))
    }

    /// Router for in-process testing.
    pub fn router(&self) -> Router {
        self.router.clone()
    }

    /// Run the server until `shutdown` fires.
    pub async fn run(self, listener: TcpListener, shutdown: Shutdown) -> Result<(), std::io::Error> {
        let addr = listener.local_addr()?;
        tracing::info!(address = %addr, "HTTP server starting");

        let app = self.router.into_make_service_with_connect_info::<SocketAddr>();
        axum::serve(listener, app)
            .with_graceful_shutdown(async move { shutdown.wait().await })
            .await?;

        tracing::info!("HTTP server stopped");
        Ok(())
    }
}

async fn pow_challenge_handler(State(state): State<AppState>) -> Result<Response, ApiError> {
    match state.pow.issue() {
        Ok(Some(challenge)) => Ok(Json(challenge).into_response()),
        Ok(None) => Ok(Json(json!({ "result": "disabled" })).into_response()),
        Err(e) => Err(ApiError::Internal(e.to_string())),
    }
}

async fn send_handler(
    State(state): State<AppState>,
    Path((chain, address)): Path<(String, String)>,
    ClientIp(ip): ClientIp,
    body: Bytes,
) -> Result<Response, ApiError> {
    let request = SendRequest::parse(&body).map_err(|e| ApiError::BadBody(e.to_string()))?;

    tracing::info!(chain = %chain, address = %address, ip = %ip, "Send request");

    if let Some(captcha) = &state.captcha {
        let response = request.recaptcha_response.as_deref().unwrap_or_default();
        if !captcha.verify(response).await {
            tracing::warn!(ip = %ip, "CAPTCHA rejected");
            return Err(ApiError::Captcha);
        }
    }

    if state.pow.is_enabled() {
        let nonce = request.nonce.as_deref().unwrap_or_default();
        if !state
            .pow
            .verify(nonce, request.timestamp_ms(), &request.solution_text())
        {
            return Err(ApiError::Pow);
        }
    }

    let chain_config = state
        .config
        .chain(&chain)
        .ok_or_else(|| ApiError::UnsupportedAddress(address.clone()))?;
    let key = match validate_recipient(&address, &chain_config.sender.address_prefix)
        .and_then(|()| canonical_recipient(&address))
    {
        Ok(key) => key,
        Err(e) => {
            tracing::info!(chain = %chain, address = %address, error = %e, "Unsupported address");
            return Err(ApiError::UnsupportedAddress(address));
        }
    };

    if !state.limiter.check_address(&key, &chain) || !state.limiter.check_ip(&ip, &chain) {
        tracing::info!(chain = %chain, address = %address, ip = %ip, "Rate limited");
        return Err(ApiError::RateLimited);
    }

    // The transfer and its accounting run detached: once queued, a send is
    // recorded even if the client goes away or the request times out.
    let dispatcher = state.dispatcher.clone();
    let limiter = state.limiter.clone();
    let send = tokio::spawn(async move {
        let result = dispatcher.enqueue_send(&address, &chain).await?;
        if result.is_success() {
            if let Err(e) = limiter.record_send(&key, &ip, &chain) {
                tracing::error!(error = %e, address = %address, "Failed to record send");
            }
        }
        Ok::<_, DispatchError>(result)
    });

    let result = send
        .await
        .map_err(|e| ApiError::Internal(e.to_string()))?
        .map_err(|e| ApiError::Send(e.to_string()))?;

    Ok(Json(json!({ "result": result })).into_response())
}

async fn health_handler(State(state): State<AppState>) -> Response {
    let report =
        HealthReport::collect(&state.dispatcher, state.started, state.clock.as_ref()).await;
    let status = if report.is_error() {
        StatusCode::SERVICE_UNAVAILABLE
    } else {
        StatusCode::OK
    };
    (status, Json(report)).into_response()
}

async fn config_handler(State(state): State<AppState>) -> Json<serde_json::Value> {
    let config = &state.config;
    let blockchains: Vec<&str> = config.blockchains.iter().map(|c| c.name.as_str()).collect();
    Json(json!({
        "name": config.project.name,
        "logo": config.project.logo,
        "deployer": config.project.deployer,
        "explorer": config.project.explorer,
        "discordInvite": config.project.discord_invite,
        "sample": state.samples.as_ref(),
        "blockchains": blockchains,
        "difficulty": if config.pow.enabled { config.pow.difficulty } else { 0 },
        "siteKey": if config.captcha.enabled { Some(&config.captcha.site_key) } else { None },
    }))
}

async fn balance_handler(
    State(state): State<AppState>,
    Path(chain): Path<String>,
) -> Json<serde_json::Value> {
    match state.dispatcher.balance(&chain).await {
        Ok(Some(coin)) => Json(json!(coin)),
        Ok(None) => Json(json!({})),
        Err(e) => {
            tracing::error!(chain = %chain, error = %e, "Balance lookup failed");
            Json(json!({}))
        }
    }
}
