//! Shared utilities for integration testing.

#![allow(dead_code)]

use std::net::SocketAddr;
use std::sync::{Arc, Mutex};

use axum::{
    body::{to_bytes, Body},
    http::{header, Request, StatusCode},
    response::{IntoResponse, Response},
    Router,
};
use tokio::net::TcpListener;

use service_forwarder::config::{DeploymentMode, GatewayConfig};
use service_forwarder::http::HttpServer;
use service_forwarder::lifecycle::Shutdown;

/// One request as seen by a mock backend.
#[derive(Debug, Clone)]
pub struct Captured {
    pub method: String,
    /// Path plus `?query` when present.
    pub uri: String,
    pub authorization: Option<String>,
    pub content_type: Option<String>,
    pub request_id: Option<String>,
    pub custom: Option<String>,
    pub body: Vec<u8>,
}

pub type Log = Arc<Mutex<Vec<Captured>>>;

/// Serve `router` on an ephemeral local port.
pub async fn start_backend(router: Router) -> SocketAddr {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        let _ = axum::serve(listener, router).await;
    });
    addr
}

/// Backend that records every request and answers with a fixed response.
pub async fn start_recording_backend(
    status: StatusCode,
    content_type: &'static str,
    body: &'static str,
) -> (SocketAddr, Log) {
    let log: Log = Arc::new(Mutex::new(Vec::new()));
    let recorder = log.clone();

    let router = Router::new().fallback(move |request: Request<Body>| {
        let recorder = recorder.clone();
        async move {
            let captured = capture(request).await;
            recorder.lock().unwrap().push(captured);
            fixed_response(status, content_type, body)
        }
    });

    (start_backend(router).await, log)
}

/// Backend answering 200 JSON after `delay`.
pub async fn start_slow_backend(delay: std::time::Duration) -> SocketAddr {
    let router = Router::new().fallback(move || async move {
        tokio::time::sleep(delay).await;
        fixed_response(StatusCode::OK, "application/json", r#"{"late":true}"#)
    });
    start_backend(router).await
}

/// An address nothing listens on.
pub async fn closed_port_addr() -> SocketAddr {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    listener.local_addr().unwrap()
}

/// Built-in services with the named ones pointed at `base_url`.
pub fn config_with(mode: DeploymentMode, overrides: &[(&str, String)]) -> GatewayConfig {
    let mut config = GatewayConfig {
        mode: Some(mode),
        ..GatewayConfig::default()
    };
    for (name, url) in overrides {
        config.service_mut(name).unwrap().base_url = Some(url.clone());
    }
    config
}

/// Run a gateway on an ephemeral port until the returned handle is triggered.
pub async fn start_gateway(config: GatewayConfig) -> (SocketAddr, Shutdown) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let shutdown = Shutdown::new();

    let server = HttpServer::new(config).unwrap();
    let wait = shutdown.wait();
    tokio::spawn(async move {
        server.run(listener, wait).await.unwrap();
    });

    (addr, shutdown)
}

/// Client without connection reuse so each test request is independent.
pub fn client() -> reqwest::Client {
    reqwest::Client::builder()
        .no_proxy()
        .pool_max_idle_per_host(0)
        .build()
        .unwrap()
}

async fn capture(request: Request<Body>) -> Captured {
    let (parts, body) = request.into_parts();
    let header = |name: &str| {
        parts
            .headers
            .get(name)
            .and_then(|v| v.to_str().ok())
            .map(str::to_owned)
    };

    Captured {
        method: parts.method.to_string(),
        uri: parts
            .uri
            .path_and_query()
            .map(|pq| pq.as_str().to_string())
            .unwrap_or_default(),
        authorization: header("authorization"),
        content_type: header("content-type"),
        request_id: header("x-request-id"),
        custom: header("x-custom"),
        body: to_bytes(body, usize::MAX).await.unwrap().to_vec(),
    }
}

fn fixed_response(status: StatusCode, content_type: &'static str, body: &'static str) -> Response {
    let mut response = (status, body).into_response();
    response.headers_mut().remove(header::CONTENT_TYPE);
    if !content_type.is_empty() {
        response
            .headers_mut()
            .insert(header::CONTENT_TYPE, content_type.parse().unwrap());
    }
    response
}
