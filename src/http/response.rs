//! Error responses of the HTTP surface.
//!
//! Every rejection is rendered as `{"result": "<message>"}` with a status
//! that tells the caller whether to retry later or give up.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("CAPTCHA verification failed")]
    Captcha,

    #[error("POW Challenge was not solved or incorrect.")]
    Pow,

    #[error("Invalid request body: {0}")]
    BadBody(String),

    #[error("Address [{0}] is not supported.")]
    UnsupportedAddress(String),

    #[error("You requested too often")]
    RateLimited,

    #[error("Error sending transaction: {0}")]
    Send(String),

    #[error("Failed, Please contact to admin.")]
    Internal(String),
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::Captcha | ApiError::BadBody(_) | ApiError::UnsupportedAddress(_) => {
                StatusCode::BAD_REQUEST
            }
            ApiError::Pow => StatusCode::NOT_FOUND,
            ApiError::RateLimited => StatusCode::TOO_MANY_REQUESTS,
            ApiError::Send(_) | ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        if let ApiError::Internal(detail) = &self {
            tracing::error!(error = %detail, "Internal error");
        }
        (self.status(), Json(json!({ "result": self.to_string() }))).into_response()
    }
}
