//! Request handling and transformation.
//!
//! # Responsibilities
//! - Generate unique request IDs (UUID v4)
//! - Extract routing-relevant information (path below the mount, query)
//! - Read the body leniently for payload-carrying methods
//! - Prepare the `InboundRequest` handed to the forwarder
//!
//! # Design Decisions
//! - Request ID added as early as possible for tracing
//! - Segments keep their original percent-encoding
//! - A missing, oversized, or malformed body is treated as absent, never as an error

use axum::body::{to_bytes, Body};
use axum::http::header::AUTHORIZATION;
use axum::http::{HeaderName, HeaderValue, Request};
use serde_json::Value;
use tower_http::request_id::{MakeRequestId, RequestId};
use uuid::Uuid;

use crate::forward::{ForwardError, InboundRequest};
use crate::observability::logging::body_keys;
use crate::routing::RouteConfig;

/// Header carrying the per-request correlation ID.
pub const X_REQUEST_ID: HeaderName = HeaderName::from_static("x-request-id");

/// Generates a fresh UUID v4 for requests that arrive without an ID.
#[derive(Debug, Clone, Copy, Default)]
pub struct MakeRequestUuid;

impl MakeRequestId for MakeRequestUuid {
    fn make_request_id<B>(&mut self, _request: &Request<B>) -> Option<RequestId> {
        let id = Uuid::new_v4().to_string();
        HeaderValue::from_str(&id).ok().map(RequestId::new)
    }
}

/// Build the forwarder's view of an inbound request.
pub async fn extract_inbound(
    request: Request<Body>,
    route: &RouteConfig,
    max_body_bytes: usize,
) -> Result<InboundRequest, ForwardError> {
    let (parts, body) = request.into_parts();

    let relative = route.relative_path(parts.uri.path()).ok_or_else(|| {
        ForwardError::Param(format!(
            "path '{}' is not under '{}'",
            parts.uri.path(),
            route.mount
        ))
    })?;
    let path = split_segments(relative)?;

    let mut inbound = InboundRequest::new(parts.method);
    inbound.path = path;
    inbound.query = parts.uri.query().unwrap_or_default().to_string();
    inbound.authorization = parts.headers.get(AUTHORIZATION).cloned();
    inbound.request_id = parts.headers.get(X_REQUEST_ID).cloned();

    if InboundRequest::carries_body(&inbound.method) {
        inbound.body = read_json_body(body, max_body_bytes).await;
    }

    Ok(inbound)
}

/// Split a mount-relative path into segments, refusing dot segments.
fn split_segments(relative: &str) -> Result<Vec<String>, ForwardError> {
    relative
        .split('/')
        .filter(|segment| !segment.is_empty())
        .map(|segment| {
            if is_dot_segment(segment) {
                Err(ForwardError::Param(format!(
                    "path segment '{}' is not allowed",
                    segment
                )))
            } else {
                Ok(segment.to_string())
            }
        })
        .collect()
}

/// `.` or `..` in any mix of literal and percent-encoded dots.
fn is_dot_segment(segment: &str) -> bool {
    let decoded = segment.to_ascii_lowercase().replace("%2e", ".");
    matches!(decoded.as_str(), "." | "..")
}

/// Drop any caller-supplied request ID so the gateway always mints its own.
pub fn strip_inbound_request_id(mut request: Request<Body>) -> Request<Body> {
    request.headers_mut().remove(X_REQUEST_ID);
    request
}

async fn read_json_body(body: Body, limit: usize) -> Option<Value> {
    let bytes = match to_bytes(body, limit).await {
        Ok(bytes) => bytes,
        Err(e) => {
            tracing::debug!(error = %e, "Request body unreadable; forwarding without body");
            return None;
        }
    };

    if bytes.is_empty() {
        return None;
    }

    match serde_json::from_slice::<Value>(&bytes) {
        Ok(value) => {
            tracing::debug!(body_keys = ?body_keys(&value), "Request body parsed");
            Some(value)
        }
        Err(e) => {
            tracing::debug!(error = %e, "Request body is not JSON; forwarding without body");
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{DeploymentMode, GatewayConfig};
    use crate::forward::ErrorCode;
    use crate::routing::RouteTable;
    use axum::http::Method;
    use serde_json::json;

    fn courses() -> std::sync::Arc<RouteConfig> {
        let config = GatewayConfig {
            mode: Some(DeploymentMode::Permissive),
            ..GatewayConfig::default()
        };
        RouteTable::from_config(&config).get("courses").unwrap().clone()
    }

    fn request(method: Method, uri: &str, body: &'static str) -> Request<Body> {
        Request::builder()
            .method(method)
            .uri(uri)
            .header(AUTHORIZATION, "Bearer abc")
            .header("x-custom", "ignored")
            .body(Body::from(body))
            .unwrap()
    }

    #[tokio::test]
    async fn extracts_segments_query_and_auth() {
        let req = request(Method::GET, "/api/courses/12/lessons?limit=10&sort=asc", "");
        let inbound = extract_inbound(req, &courses(), 1024).await.unwrap();

        assert_eq!(inbound.path, vec!["12", "lessons"]);
        assert_eq!(inbound.query, "limit=10&sort=asc");
        assert_eq!(inbound.authorization.unwrap(), "Bearer abc");
        assert!(inbound.body.is_none());
    }

    #[tokio::test]
    async fn get_never_reads_a_body() {
        let req = request(Method::GET, "/api/courses/1", r#"{"a":1}"#);
        let inbound = extract_inbound(req, &courses(), 1024).await.unwrap();
        assert!(inbound.body.is_none());
    }

    #[tokio::test]
    async fn post_body_is_parsed_leniently() {
        let req = request(Method::POST, "/api/courses", r#"{"title":"Rust"}"#);
        let inbound = extract_inbound(req, &courses(), 1024).await.unwrap();
        assert_eq!(inbound.body, Some(json!({"title": "Rust"})));
        assert!(inbound.path.is_empty());

        let req = request(Method::PUT, "/api/courses/1", "{not json");
        let inbound = extract_inbound(req, &courses(), 1024).await.unwrap();
        assert!(inbound.body.is_none());

        let req = request(Method::PATCH, "/api/courses/1", r#"{"big":"body"}"#);
        let inbound = extract_inbound(req, &courses(), 4).await.unwrap();
        assert!(inbound.body.is_none());
    }

    #[tokio::test]
    async fn keeps_percent_encoding() {
        let req = request(Method::GET, "/api/courses/intro%20to%20rust", "");
        let inbound = extract_inbound(req, &courses(), 1024).await.unwrap();
        assert_eq!(inbound.path, vec!["intro%20to%20rust"]);
    }

    #[tokio::test]
    async fn unreadable_parameters_are_param_errors() {
        let req = request(Method::GET, "/api/users/1", "");
        let err = extract_inbound(req, &courses(), 1024).await.unwrap_err();
        assert_eq!(err.code(), ErrorCode::ParamError);

        let req = request(Method::GET, "/api/courses/../admin", "");
        let err = extract_inbound(req, &courses(), 1024).await.unwrap_err();
        assert_eq!(err.code(), ErrorCode::ParamError);
        assert_eq!(err.status().as_u16(), 500);
    }

    #[tokio::test]
    async fn mixed_encoded_dot_segments_are_refused() {
        for uri in [
            "/api/courses/%2e./admin",
            "/api/courses/.%2E/admin",
            "/api/courses/%2E%2e/admin",
            "/api/courses/%2e",
        ] {
            let req = request(Method::GET, uri, "");
            let err = extract_inbound(req, &courses(), 1024).await.unwrap_err();
            assert_eq!(err.code(), ErrorCode::ParamError, "uri {}", uri);
        }

        let req = request(Method::GET, "/api/courses/v1.2/%2e%2e.json", "");
        let inbound = extract_inbound(req, &courses(), 1024).await.unwrap();
        assert_eq!(inbound.path, vec!["v1.2", "%2e%2e.json"]);
    }

    #[test]
    fn caller_request_id_is_removed() {
        let req = Request::builder()
            .uri("/api/users/me")
            .header(X_REQUEST_ID, "client-chosen-value")
            .header(AUTHORIZATION, "Bearer abc")
            .body(Body::empty())
            .unwrap();
        let req = strip_inbound_request_id(req);
        assert!(req.headers().get(X_REQUEST_ID).is_none());
        assert!(req.headers().get(AUTHORIZATION).is_some());
    }
}
