//! HTTP surface driven in-process through the router.

mod common;

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use axum::body::Body;
use axum::http::{Request, StatusCode};
use axum::Router;
use serde_json::{json, Value};
use tower::ServiceExt;

use common::*;
use token_faucet::blockchain::address::to_bech32;
use token_faucet::config::FaucetConfig;
use token_faucet::security::pow::{self, Challenge};
use token_faucet::security::{CaptchaVerifier, Clock, ManualClock, PowChallenge, RateLimiter};
use token_faucet::storage::Store;
use token_faucet::{AppState, HttpServer};

struct FixedCaptcha;

#[async_trait]
impl CaptchaVerifier for FixedCaptcha {
    async fn verify(&self, response: &str) -> bool {
        response == "human"
    }
}

struct App {
    router: Router,
    harness: Harness,
    limiter: Arc<RateLimiter>,
}

fn app(config: FaucetConfig, captcha: bool) -> App {
    let harness = harness_with(config.clone());
    let store = Store::temporary().unwrap();
    let clock: Arc<dyn Clock> = Arc::new(ManualClock::new(1_700_000_000_000));
    let limiter = Arc::new(RateLimiter::new(&store, &config, clock.clone()).unwrap());
    let pow = Arc::new(PowChallenge::new(&store, &config.pow, clock.clone()).unwrap());
    let captcha: Option<Arc<dyn CaptchaVerifier>> = if captcha {
        Some(Arc::new(FixedCaptcha))
    } else {
        None
    };

    let state = AppState::new(
        Arc::new(config),
        harness.dispatcher.clone(),
        limiter.clone(),
        pow,
        captcha,
        clock,
    );
    App {
        router: HttpServer::build_router(state, Duration::from_secs(5)),
        harness,
        limiter,
    }
}

fn pow_config() -> FaucetConfig {
    let mut config = test_config();
    config.pow.enabled = true;
    config
}

async fn call(router: &Router, request: Request<Body>) -> (StatusCode, Value) {
    let response = router.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let body = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap()
    };
    (status, body)
}

fn get(uri: &str) -> Request<Body> {
    Request::builder().uri(uri).body(Body::empty()).unwrap()
}

fn send(chain: &str, address: &str, ip: &str, body: Value) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(format!("/send/{chain}/{address}"))
        .header("content-type", "application/json")
        .header("x-real-ip", ip)
        .body(Body::from(body.to_string()))
        .unwrap()
}

async fn solved_body(router: &Router) -> Value {
    let (status, body) = call(router, get("/pow-challenge")).await;
    assert_eq!(status, StatusCode::OK);
    let challenge: Challenge = serde_json::from_value(body).unwrap();
    let solution = pow::solve(&challenge.nonce, challenge.difficulty);
    json!({
        "nonce": challenge.nonce,
        "timestamp": challenge.timestamp,
        "solution": solution,
    })
}

fn recipient(i: u64) -> String {
    to_bech32("mantra", &format!("0x{i:040x}")).unwrap()
}

#[tokio::test]
async fn test_pow_challenge() {
    let app = app(pow_config(), false);

    let (status, body) = call(&app.router, get("/pow-challenge")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["nonce"].as_str().unwrap().len(), 32);
    assert_eq!(body["difficulty"], 2);
    assert_eq!(body["timestamp"], 1_700_000_000_000u64);
}

#[tokio::test]
async fn test_pow_challenge_disabled() {
    let app = app(test_config(), false);

    let (status, body) = call(&app.router, get("/pow-challenge")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({ "result": "disabled" }));
}

#[tokio::test]
async fn test_send_with_solved_challenge() {
    let app = app(pow_config(), false);

    let body = solved_body(&app.router).await;
    let (status, body) = call(&app.router, send(LEDGER_CHAIN, RECIPIENT, "1.2.3.4", body)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["result"]["code"], 0);
    assert_eq!(body["result"]["transactionHash"], "HASH0");
}

#[tokio::test]
async fn test_send_without_solution_is_rejected() {
    let app = app(pow_config(), false);

    let (status, body) = call(&app.router, send(LEDGER_CHAIN, RECIPIENT, "1.2.3.4", json!({}))).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["result"], "POW Challenge was not solved or incorrect.");
    assert!(app.harness.ledger.broadcasts().is_empty());
}

#[tokio::test]
async fn test_challenge_is_single_use() {
    let app = app(pow_config(), false);

    let body = solved_body(&app.router).await;
    let (status, _) = call(
        &app.router,
        send(LEDGER_CHAIN, RECIPIENT, "1.2.3.4", body.clone()),
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    let (status, _) = call(&app.router, send(LEDGER_CHAIN, &recipient(9), "5.6.7.8", body)).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(app.harness.ledger.broadcasts().len(), 1);
}

#[tokio::test]
async fn test_captcha_gate() {
    let app = app(test_config(), true);

    let (status, body) = call(
        &app.router,
        send(LEDGER_CHAIN, RECIPIENT, "1.2.3.4", json!({ "recaptchaResponse": "bot" })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["result"], "CAPTCHA verification failed");

    let (status, _) = call(
        &app.router,
        send(LEDGER_CHAIN, RECIPIENT, "1.2.3.4", json!({ "recaptchaResponse": "human" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn test_unsupported_address() {
    let app = app(test_config(), false);

    let (status, body) = call(&app.router, send(LEDGER_CHAIN, "cosmos1garbage", "1.2.3.4", json!({}))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["result"], "Address [cosmos1garbage] is not supported.");

    let (status, _) = call(&app.router, send("nowhere", RECIPIENT, "1.2.3.4", json!({}))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_address_limit() {
    let app = app(test_config(), false);

    let (status, _) = call(&app.router, send(LEDGER_CHAIN, RECIPIENT, "1.2.3.4", json!({}))).await;
    assert_eq!(status, StatusCode::OK);

    let (status, body) = call(&app.router, send(LEDGER_CHAIN, RECIPIENT, "9.9.9.9", json!({}))).await;
    assert_eq!(status, StatusCode::TOO_MANY_REQUESTS);
    assert_eq!(body["result"], "You requested too often");
    assert_eq!(app.harness.ledger.broadcasts().len(), 1);
}

#[tokio::test]
async fn test_address_limit_covers_every_encoding() {
    let app = app(test_config(), false);

    let lowercase = RECIPIENT_EVM.to_lowercase();
    let uppercase = format!("0x{}", RECIPIENT_EVM[2..].to_uppercase());
    let forms = [RECIPIENT_EVM, lowercase.as_str(), uppercase.as_str(), RECIPIENT];

    let mut statuses = Vec::new();
    for (i, form) in forms.iter().enumerate() {
        let ip = format!("10.0.0.{i}");
        let (status, _) = call(&app.router, send(LEDGER_CHAIN, form, &ip, json!({}))).await;
        statuses.push(status);
    }

    assert_eq!(
        statuses,
        vec![
            StatusCode::OK,
            StatusCode::TOO_MANY_REQUESTS,
            StatusCode::TOO_MANY_REQUESTS,
            StatusCode::TOO_MANY_REQUESTS,
        ]
    );
    assert_eq!(app.harness.ledger.broadcasts().len(), 1);
}

#[tokio::test]
async fn test_send_is_recorded_when_client_disconnects() {
    use futures_util::FutureExt;

    let app = app(test_config(), false);
    let key = RECIPIENT_EVM.to_lowercase();

    // One poll queues the transfer; the client then goes away.
    let request = app
        .router
        .clone()
        .oneshot(send(LEDGER_CHAIN, RECIPIENT, "1.2.3.4", json!({})));
    assert!(request.now_or_never().is_none());

    for _ in 0..200 {
        if !app.limiter.check_address(&key, LEDGER_CHAIN) {
            break;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }

    let (status, _) = call(&app.router, send(LEDGER_CHAIN, RECIPIENT, "9.9.9.9", json!({}))).await;
    assert_eq!(status, StatusCode::TOO_MANY_REQUESTS);
    assert_eq!(app.harness.ledger.broadcasts(), vec![0]);
}

#[tokio::test]
async fn test_ip_limit() {
    let app = app(test_config(), false);

    for i in 0..2 {
        let (status, _) = call(&app.router, send(LEDGER_CHAIN, &recipient(i), "1.2.3.4", json!({}))).await;
        assert_eq!(status, StatusCode::OK);
    }

    let (status, _) = call(&app.router, send(LEDGER_CHAIN, &recipient(2), "1.2.3.4", json!({}))).await;
    assert_eq!(status, StatusCode::TOO_MANY_REQUESTS);

    // The IP budget is per chain.
    let (status, _) = call(&app.router, send(EVM_CHAIN, &recipient(2), "1.2.3.4", json!({}))).await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn test_failed_send_does_not_count_against_limits() {
    let app = app(test_config(), false);
    app.harness
        .ledger
        .reject_all
        .store(true, std::sync::atomic::Ordering::SeqCst);

    let (status, body) = call(&app.router, send(LEDGER_CHAIN, RECIPIENT, "1.2.3.4", json!({}))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["result"]["code"], 997);

    app.harness
        .ledger
        .reject_all
        .store(false, std::sync::atomic::Ordering::SeqCst);
    let (status, body) = call(&app.router, send(LEDGER_CHAIN, RECIPIENT, "1.2.3.4", json!({}))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["result"]["code"], 0);
}

#[tokio::test]
async fn test_dispatch_error_maps_to_500() {
    let app = app(test_config(), false);
    app.harness
        .ledger
        .lookups_left
        .store(0, std::sync::atomic::Ordering::SeqCst);

    let (status, body) = call(&app.router, send(LEDGER_CHAIN, RECIPIENT, "1.2.3.4", json!({}))).await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert!(body["result"]
        .as_str()
        .unwrap()
        .starts_with("Error sending transaction: "));
}

#[tokio::test]
async fn test_malformed_body() {
    let app = app(test_config(), false);

    let request = Request::builder()
        .method("POST")
        .uri(format!("/send/{LEDGER_CHAIN}/{RECIPIENT}"))
        .body(Body::from("{not json"))
        .unwrap();
    let (status, _) = call(&app.router, request).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_healthz() {
    let app = app(test_config(), false);

    let (status, body) = call(&app.router, get("/healthz")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["message"], "OK");
    assert_eq!(body["blockchains"][0]["latestBlock"], LEDGER_HEIGHT);
    assert_eq!(body["blockchains"][1]["latestBlock"], EVM_HEIGHT);
    assert_eq!(body["timestamp"], 1_700_000_000_000u64);
}

#[tokio::test]
async fn test_healthz_degraded() {
    let app = app(test_config(), false);
    app.harness
        .ledger
        .probe_failures
        .store(2, std::sync::atomic::Ordering::SeqCst);

    let (status, body) = call(&app.router, get("/healthz")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["message"], "DEGRADED");
}

#[tokio::test]
async fn test_healthz_when_dispatcher_is_gone() {
    let app = app(test_config(), false);
    let worker = app.harness.worker;
    worker.abort();
    let _ = worker.await;

    let (status, body) = call(&app.router, get("/healthz")).await;
    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(body["message"], "ERROR");
}

#[tokio::test]
async fn test_config_json() {
    let app = app(pow_config(), false);

    let (status, body) = call(&app.router, get("/config.json")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["name"], "Mantrachain");
    assert_eq!(body["blockchains"], json!([LEDGER_CHAIN, EVM_CHAIN]));
    assert_eq!(body["difficulty"], 2);
    assert!(body["siteKey"].is_null());
    assert_eq!(
        body["sample"][EVM_CHAIN],
        "0xf39Fd6e51aad88F6F4ce6aB8827279cffFb92266"
    );
    assert!(body["sample"][LEDGER_CHAIN]
        .as_str()
        .unwrap()
        .starts_with("mantra1"));
}

#[tokio::test]
async fn test_balance() {
    let app = app(test_config(), false);

    let (status, body) = call(&app.router, get(&format!("/balance/{LEDGER_CHAIN}"))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({ "denom": "uom", "amount": "1000" }));

    let (_, body) = call(&app.router, get("/balance/nowhere")).await;
    assert_eq!(body, json!({}));
}

#[tokio::test]
async fn test_request_id_is_echoed() {
    let app = app(test_config(), false);

    let request = Request::builder()
        .uri("/config.json")
        .header("x-request-id", "abc-123")
        .body(Body::empty())
        .unwrap();
    let response = app.router.clone().oneshot(request).await.unwrap();
    assert_eq!(response.headers()["x-request-id"], "abc-123");

    let response = app.router.clone().oneshot(get("/config.json")).await.unwrap();
    assert!(response.headers().contains_key("x-request-id"));
}
