//! Service forwarding.
//!
//! # Data Flow
//! ```text
//! InboundRequest + RouteConfig
//!     → RouteConfig::target_url (base URL policy + composition)
//!     → outbound request (Content-Type, Authorization, x-request-id, JSON body)
//!     → resilience::with_deadline (send + read body)
//!     → relay.rs (status + decoded body)   | error.rs (classified failure)
//! ```
//!
//! # Design Decisions
//! - Stateless: the only shared value is the pooled HTTP client
//! - Backend statuses are never translated; 4xx/5xx pass through
//! - Bodies are logged by key name only

pub mod error;
pub mod relay;

use std::time::Instant;

use axum::http::header::{AUTHORIZATION, CONTENT_TYPE};
use axum::http::{HeaderValue, Method};
use serde_json::Value;

use crate::http::request::X_REQUEST_ID;
use crate::observability::logging::body_keys;
use crate::resilience::with_deadline;
use crate::routing::RouteConfig;

pub use error::{ErrorCode, ForwardError, TransportFailure};
pub use relay::Relayed;

/// Outcome of one forwarded request.
pub type ForwardResult = Result<Relayed, ForwardError>;

/// What the forwarder needs from an inbound call.
#[derive(Debug, Clone)]
pub struct InboundRequest {
    pub method: Method,
    /// Path segments below the route mount, still percent-encoded.
    pub path: Vec<String>,
    /// Raw query string without the leading `?`.
    pub query: String,
    /// Parsed JSON body; only kept for payload-carrying methods.
    pub body: Option<Value>,
    pub authorization: Option<HeaderValue>,
    pub request_id: Option<HeaderValue>,
}

impl InboundRequest {
    pub fn new(method: Method) -> Self {
        Self {
            method,
            path: Vec::new(),
            query: String::new(),
            body: None,
            authorization: None,
            request_id: None,
        }
    }

    /// POST, PUT and PATCH carry a payload; everything else is sent bodiless.
    pub fn carries_body(method: &Method) -> bool {
        matches!(*method, Method::POST | Method::PUT | Method::PATCH)
    }

    /// Body to send upstream, if any.
    pub fn outbound_body(&self) -> Option<&Value> {
        if Self::carries_body(&self.method) {
            self.body.as_ref()
        } else {
            None
        }
    }
}

/// Translates inbound requests into backend calls and back.
#[derive(Debug, Clone)]
pub struct Forwarder {
    client: reqwest::Client,
}

impl Forwarder {
    /// Build a forwarder with its own connection pool.
    ///
    /// Deadlines are enforced per route, so the client itself has no timeout.
    pub fn new() -> Result<Self, reqwest::Error> {
        let client = reqwest::Client::builder().no_proxy().build()?;
        Ok(Self::with_client(client))
    }

    pub fn with_client(client: reqwest::Client) -> Self {
        Self { client }
    }

    /// Forward one request to the route's backend.
    pub async fn forward(&self, inbound: &InboundRequest, route: &RouteConfig) -> ForwardResult {
        let target_url = route.target_url(inbound.path.as_slice(), &inbound.query)?;

        let mut request = self
            .client
            .request(inbound.method.clone(), &target_url)
            .header(CONTENT_TYPE, HeaderValue::from_static("application/json"));

        if let Some(auth) = &inbound.authorization {
            request = request.header(AUTHORIZATION, auth.clone());
        }
        if let Some(id) = &inbound.request_id {
            request = request.header(X_REQUEST_ID, id.clone());
        }

        let body = inbound.outbound_body();
        if let Some(body) = body {
            let bytes = serde_json::to_vec(body)
                .map_err(|e| ForwardError::Unexpected(format!("failed to encode request body: {}", e)))?;
            request = request.body(bytes);
        }

        tracing::info!(
            service = %route.service,
            method = %inbound.method,
            target_url = %target_url,
            body_keys = ?body.map(body_keys),
            "Forwarding request"
        );

        let start = Instant::now();
        let exchange = async move {
            let response = request.send().await?;
            let status = response.status();
            let content_type = response
                .headers()
                .get(CONTENT_TYPE)
                .and_then(|v| v.to_str().ok())
                .map(str::to_owned);
            let bytes = response.bytes().await?;
            Ok::<_, reqwest::Error>((status, content_type, bytes))
        };

        let outcome = match with_deadline(route.timeout, exchange).await {
            Ok(Ok((status, content_type, bytes))) => Ok(Relayed::from_backend(
                status,
                content_type.as_deref(),
                &bytes,
            )),
            Ok(Err(err)) => {
                tracing::debug!(service = %route.service, error = ?err, "Transport error detail");
                Err(ForwardError::from_transport(&err, &route.service, &target_url))
            }
            Err(elapsed) => Err(ForwardError::Timeout {
                service: route.service.clone(),
                target_url: target_url.clone(),
                after: elapsed.0,
            }),
        };

        let elapsed_ms = start.elapsed().as_millis() as u64;
        match &outcome {
            Ok(relayed) => tracing::info!(
                service = %route.service,
                method = %inbound.method,
                target_url = %target_url,
                status = relayed.status.as_u16(),
                elapsed_ms,
                "Backend responded"
            ),
            Err(err) => tracing::warn!(
                service = %route.service,
                method = %inbound.method,
                target_url = %target_url,
                error = %err.code(),
                elapsed_ms,
                "Forward failed: {}",
                err
            ),
        }

        outcome
    }
}
