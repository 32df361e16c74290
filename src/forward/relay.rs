//! Backend response relay.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::{json, Map, Value};

/// A completed backend exchange, ready to hand back to the caller.
#[derive(Debug, Clone, PartialEq)]
pub struct Relayed {
    pub status: StatusCode,
    pub body: Value,
}

impl Relayed {
    /// Decode a backend body according to its content type.
    pub fn from_backend(status: StatusCode, content_type: Option<&str>, bytes: &[u8]) -> Self {
        Self {
            status,
            body: decode_body(content_type, bytes),
        }
    }
}

impl IntoResponse for Relayed {
    fn into_response(self) -> Response {
        (self.status, Json(self.body)).into_response()
    }
}

fn is_json(content_type: Option<&str>) -> bool {
    content_type
        .map(|ct| ct.to_ascii_lowercase().contains("application/json"))
        .unwrap_or(false)
}

/// JSON bodies pass through; anything else is wrapped as `{detail}`, or `{}` when empty.
pub fn decode_body(content_type: Option<&str>, bytes: &[u8]) -> Value {
    if is_json(content_type) {
        if let Ok(value) = serde_json::from_slice::<Value>(bytes) {
            return value;
        }
    }

    let text = String::from_utf8_lossy(bytes);
    if text.is_empty() {
        Value::Object(Map::new())
    } else {
        json!({ "detail": text })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn json_passes_through() {
        let body = decode_body(Some("application/json; charset=utf-8"), br#"[{"id":1}]"#);
        assert_eq!(body, json!([{"id": 1}]));
    }

    #[test]
    fn plain_text_is_wrapped() {
        assert_eq!(decode_body(Some("text/plain"), b"OK"), json!({"detail": "OK"}));
        assert_eq!(decode_body(None, b"OK"), json!({"detail": "OK"}));
    }

    #[test]
    fn empty_non_json_becomes_empty_object() {
        assert_eq!(decode_body(Some("text/html"), b""), json!({}));
    }

    #[test]
    fn broken_json_falls_back_to_text() {
        assert_eq!(
            decode_body(Some("application/json"), b"<html>oops"),
            json!({"detail": "<html>oops"})
        );
        assert_eq!(decode_body(Some("application/json"), b""), json!({}));
    }

    #[tokio::test]
    async fn relays_exact_status() {
        let relayed = Relayed::from_backend(StatusCode::UNPROCESSABLE_ENTITY, Some("application/json"), br#"{"detail":"bad"}"#);
        let response = relayed.into_response();
        assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
        assert_eq!(serde_json::from_slice::<Value>(&bytes).unwrap(), json!({"detail": "bad"}));
    }
}
