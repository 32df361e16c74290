//! Outward response shapes.
//!
//! # Responsibilities
//! - Render gateway-detected failures as `{detail, error}` JSON
//! - Keep the status code tied to the machine code
//!
//! # Design Decisions
//! - Every gateway-generated body is JSON with a displayable `detail`
//! - `targetUrl` is a diagnostic and only present when the deployment allows it

use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::{Deserialize, Serialize};

use crate::forward::ErrorCode;

/// Body sent to callers when the gateway itself produced the failure.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorEnvelope {
    pub detail: String,
    pub error: ErrorCode,
    #[serde(rename = "targetUrl", default, skip_serializing_if = "Option::is_none")]
    pub target_url: Option<String>,
}

impl ErrorEnvelope {
    pub fn new(error: ErrorCode, detail: impl Into<String>) -> Self {
        Self {
            detail: detail.into(),
            error,
            target_url: None,
        }
    }

    pub fn with_target_url(mut self, url: impl Into<String>) -> Self {
        self.target_url = Some(url.into());
        self
    }
}

impl IntoResponse for ErrorEnvelope {
    fn into_response(self) -> Response {
        (self.error.status(), Json(self)).into_response()
    }
}
