//! CAPTCHA verification against an external service.

use std::time::Duration;

use async_trait::async_trait;
use serde::Deserialize;

use crate::config::schema::CaptchaConfig;

#[async_trait]
pub trait CaptchaVerifier: Send + Sync {
    /// True when the service accepts `response`.
    async fn verify(&self, response: &str) -> bool;
}

#[derive(Debug, Deserialize)]
struct SiteVerifyResponse {
    success: bool,
    #[serde(default, rename = "error-codes")]
    error_codes: Vec<String>,
}

/// reCAPTCHA `siteverify` client.
#[derive(Debug, Clone)]
pub struct RecaptchaVerifier {
    client: reqwest::Client,
    verify_url: String,
    secret: String,
}

impl RecaptchaVerifier {
    pub fn new(config: &CaptchaConfig) -> Result<Self, reqwest::Error> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;
        Ok(Self {
            client,
            verify_url: config.verify_url.clone(),
            secret: config.site_secret.clone(),
        })
    }
}

#[async_trait]
impl CaptchaVerifier for RecaptchaVerifier {
    async fn verify(&self, response: &str) -> bool {
        let result = self
            .client
            .post(&self.verify_url)
            .form(&[("secret", self.secret.as_str()), ("response", response)])
            .send()
            .await;

        let body = match result {
            Ok(resp) => resp.json::<SiteVerifyResponse>().await,
            Err(e) => {
                tracing::error!(error = %e, "Error verifying CAPTCHA");
                return false;
            }
        };

        match body {
            Ok(body) if body.success => true,
            Ok(body) => {
                tracing::error!(error_codes = ?body.error_codes, "CAPTCHA check returned false");
                false
            }
            Err(e) => {
                tracing::error!(error = %e, "Malformed CAPTCHA verification response");
                false
            }
        }
    }
}
