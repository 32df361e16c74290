//! Forwarding failures and their outward contract.

use std::error::Error as StdError;
use std::fmt;
use std::io;
use std::time::Duration;

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::http::response::ErrorEnvelope;

/// Stable machine codes callers can branch on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    MissingEnvVar,
    InvalidUrl,
    ParamError,
    Timeout,
    ConnectionRefused,
    DnsError,
    FetchError,
    UnexpectedError,
    NotFound,
    MethodNotAllowed,
}

impl ErrorCode {
    pub fn as_str(self) -> &'static str {
        match self {
            ErrorCode::MissingEnvVar => "MISSING_ENV_VAR",
            ErrorCode::InvalidUrl => "INVALID_URL",
            ErrorCode::ParamError => "PARAM_ERROR",
            ErrorCode::Timeout => "TIMEOUT",
            ErrorCode::ConnectionRefused => "CONNECTION_REFUSED",
            ErrorCode::DnsError => "DNS_ERROR",
            ErrorCode::FetchError => "FETCH_ERROR",
            ErrorCode::UnexpectedError => "UNEXPECTED_ERROR",
            ErrorCode::NotFound => "NOT_FOUND",
            ErrorCode::MethodNotAllowed => "METHOD_NOT_ALLOWED",
        }
    }

    /// Status presented to the original caller.
    pub fn status(self) -> StatusCode {
        match self {
            ErrorCode::MissingEnvVar
            | ErrorCode::InvalidUrl
            | ErrorCode::ParamError
            | ErrorCode::UnexpectedError => StatusCode::INTERNAL_SERVER_ERROR,
            ErrorCode::Timeout => StatusCode::GATEWAY_TIMEOUT,
            ErrorCode::ConnectionRefused => StatusCode::SERVICE_UNAVAILABLE,
            ErrorCode::DnsError | ErrorCode::FetchError => StatusCode::BAD_GATEWAY,
            ErrorCode::NotFound => StatusCode::NOT_FOUND,
            ErrorCode::MethodNotAllowed => StatusCode::METHOD_NOT_ALLOWED,
        }
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Everything that can stop a request from being relayed.
#[derive(Debug, Error)]
pub enum ForwardError {
    #[error("{service} service URL not configured. Please set the {var} environment variable.")]
    MissingBaseUrl { service: String, var: String },

    #[error("Invalid {service} service URL configuration")]
    InvalidBaseUrl { service: String },

    #[error("Error processing request parameters: {0}")]
    Param(String),

    #[error("Request timeout - the {service} service did not respond in time")]
    Timeout {
        service: String,
        target_url: String,
        after: Duration,
    },

    #[error("Connection refused - the {service} service may be down or unreachable")]
    ConnectionRefused { service: String, target_url: String },

    #[error("DNS resolution failed - check the {service} service URL")]
    Dns { service: String, target_url: String },

    #[error("Failed to connect to {service} service: {reason}")]
    Fetch {
        service: String,
        target_url: String,
        reason: String,
    },

    #[error("Internal server error in proxy: {0}")]
    Unexpected(String),
}

impl ForwardError {
    pub fn code(&self) -> ErrorCode {
        match self {
            ForwardError::MissingBaseUrl { .. } => ErrorCode::MissingEnvVar,
            ForwardError::InvalidBaseUrl { .. } => ErrorCode::InvalidUrl,
            ForwardError::Param(_) => ErrorCode::ParamError,
            ForwardError::Timeout { .. } => ErrorCode::Timeout,
            ForwardError::ConnectionRefused { .. } => ErrorCode::ConnectionRefused,
            ForwardError::Dns { .. } => ErrorCode::DnsError,
            ForwardError::Fetch { .. } => ErrorCode::FetchError,
            ForwardError::Unexpected(_) => ErrorCode::UnexpectedError,
        }
    }

    pub fn status(&self) -> StatusCode {
        self.code().status()
    }

    /// The URL the failed call was aimed at, for transport failures.
    pub fn target_url(&self) -> Option<&str> {
        match self {
            ForwardError::Timeout { target_url, .. }
            | ForwardError::ConnectionRefused { target_url, .. }
            | ForwardError::Dns { target_url, .. }
            | ForwardError::Fetch { target_url, .. } => Some(target_url),
            _ => None,
        }
    }

    /// Render the outward envelope; diagnostics add the target URL.
    pub fn to_envelope(&self, diagnostics: bool) -> ErrorEnvelope {
        let envelope = ErrorEnvelope::new(self.code(), self.to_string());
        match self.target_url() {
            Some(url) if diagnostics => envelope.with_target_url(url),
            _ => envelope,
        }
    }

    /// Classify a failed outbound call.
    pub fn from_transport(err: &reqwest::Error, service: &str, target_url: &str) -> Self {
        let service = service.to_string();
        let target_url = target_url.to_string();

        if err.is_builder() {
            return ForwardError::InvalidBaseUrl { service };
        }

        match TransportFailure::classify(err) {
            TransportFailure::Refused => ForwardError::ConnectionRefused { service, target_url },
            TransportFailure::Dns => ForwardError::Dns { service, target_url },
            TransportFailure::Other => ForwardError::Fetch {
                service,
                target_url,
                reason: root_cause(err),
            },
        }
    }
}

impl IntoResponse for ForwardError {
    fn into_response(self) -> Response {
        self.to_envelope(false).into_response()
    }
}

/// Coarse kind of a transport error, read off its source chain.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransportFailure {
    Refused,
    Dns,
    Other,
}

impl TransportFailure {
    pub fn classify(err: &(dyn StdError + 'static)) -> Self {
        let mut current = Some(err);
        while let Some(e) = current {
            if let Some(io_err) = e.downcast_ref::<io::Error>() {
                if io_err.kind() == io::ErrorKind::ConnectionRefused {
                    return TransportFailure::Refused;
                }
            }

            let message = e.to_string().to_ascii_lowercase();
            if message.contains("dns error")
                || message.contains("failed to lookup address")
                || message.contains("name or service not known")
                || message.contains("nodename nor servname")
            {
                return TransportFailure::Dns;
            }
            if message.contains("connection refused") {
                return TransportFailure::Refused;
            }

            current = e.source();
        }
        TransportFailure::Other
    }
}

/// Innermost message of an error chain.
fn root_cause(err: &(dyn StdError + 'static)) -> String {
    let mut current = err;
    while let Some(next) = current.source() {
        current = next;
    }
    current.to_string()
}
