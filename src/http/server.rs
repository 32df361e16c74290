//! HTTP server setup and configuration.
//!
//! # Responsibilities
//! - Create Axum Router with all handlers
//! - Wire up middleware (request ID, tracing, panic capture)
//! - Bind server to listener
//! - Dispatch requests to the route table
//! - Forward requests to backend services
//! - Observability (metrics, correlation IDs)

use std::any::Any;
use std::future::Future;
use std::sync::Arc;
use std::time::Instant;

use axum::{
    body::Body,
    extract::{Extension, State},
    http::{Method, Request},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde_json::{json, Value};
use tokio::net::TcpListener;
use tower::ServiceBuilder;
use tower_http::{
    catch_panic::CatchPanicLayer,
    request_id::{PropagateRequestIdLayer, SetRequestIdLayer},
    trace::TraceLayer,
};

use crate::config::{Delivery, DeploymentMode, GatewayConfig};
use crate::config::validation::STATUS_PATH;
use crate::forward::{ErrorCode, ForwardError, ForwardResult, Forwarder};
use crate::http::request::{extract_inbound, strip_inbound_request_id, MakeRequestUuid, X_REQUEST_ID};
use crate::http::response::ErrorEnvelope;
use crate::observability::metrics;
use crate::routing::{RouteConfig, RouteTable};

/// Application state injected into handlers.
#[derive(Clone)]
pub struct AppState {
    pub routes: Arc<RouteTable>,
    pub forwarder: Forwarder,
    pub mode: DeploymentMode,
    pub max_body_bytes: usize,
}

/// HTTP front of the gateway.
pub struct HttpServer {
    router: Router,
    config: GatewayConfig,
}

impl HttpServer {
    /// Create a new HTTP server with the given configuration.
    pub fn new(config: GatewayConfig) -> Result<Self, reqwest::Error> {
        let forwarder = Forwarder::new()?;
        Ok(Self::with_forwarder(config, forwarder))
    }

    /// Create a server around an existing forwarder.
    pub fn with_forwarder(config: GatewayConfig, forwarder: Forwarder) -> Self {
        let routes = Arc::new(RouteTable::from_config(&config));
        let mode = config.mode();

        tracing::info!(mode = %mode, routes = routes.len(), "Route table resolved");

        let state = AppState {
            routes,
            forwarder,
            mode,
            max_body_bytes: config.listener.max_body_bytes,
        };

        let router = Self::build_router(state);
        Self { router, config }
    }

    /// Build the Axum router with all middleware layers.
    fn build_router(state: AppState) -> Router {
        let mut router = Router::new().route(STATUS_PATH, get(status_handler));

        for route in state.routes.iter() {
            if route.delivery == Delivery::Acknowledge {
                router = router.route(
                    &route.mount,
                    post(acknowledge_handler).layer(Extension(route.clone())),
                );
            }
        }

        let middleware = ServiceBuilder::new()
            .map_request(strip_inbound_request_id)
            .layer(SetRequestIdLayer::new(X_REQUEST_ID, MakeRequestUuid))
            .layer(TraceLayer::new_for_http().make_span_with(|request: &Request<Body>| {
                let request_id = request
                    .headers()
                    .get(X_REQUEST_ID)
                    .and_then(|v| v.to_str().ok())
                    .unwrap_or("unknown");
                tracing::info_span!(
                    "request",
                    request_id = %request_id,
                    method = %request.method(),
                    path = %request.uri().path(),
                )
            }))
            .layer(PropagateRequestIdLayer::new(X_REQUEST_ID))
            .layer(CatchPanicLayer::custom(panic_response));

        router
            .fallback(relay_handler)
            .method_not_allowed_fallback(method_not_allowed)
            .with_state(state)
            .layer(middleware)
    }

    /// Router with state and middleware applied, for in-process use.
    pub fn router(&self) -> Router {
        self.router.clone()
    }

    /// Run the server until `shutdown` resolves, then drain in-flight requests.
    pub async fn run<F>(self, listener: TcpListener, shutdown: F) -> Result<(), std::io::Error>
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let addr = listener.local_addr()?;
        tracing::info!(address = %addr, "HTTP server starting");

        axum::serve(listener, self.router)
            .with_graceful_shutdown(shutdown)
            .await?;

        tracing::info!("HTTP server stopped");
        Ok(())
    }

    /// Get a reference to the config.
    pub fn config(&self) -> &GatewayConfig {
        &self.config
    }
}

/// Methods relayed to backends.
fn is_relayed_method(method: &Method) -> bool {
    matches!(
        *method,
        Method::GET | Method::POST | Method::PUT | Method::DELETE | Method::PATCH
    )
}

/// Relay handler for every mounted service.
/// Looks up the route, forwards, and relays the outcome.
async fn relay_handler(State(state): State<AppState>, request: Request<Body>) -> Response {
    let start = Instant::now();
    let method = request.method().clone();

    let route = match state.routes.match_path(request.uri().path()) {
        Some(route) if route.delivery == Delivery::Relay => route.clone(),
        _ => {
            tracing::warn!(method = %method, path = %request.uri().path(), "No route matched");
            metrics::record_request("none", method.as_str(), 404, start);
            return ErrorEnvelope::new(ErrorCode::NotFound, "No matching route found").into_response();
        }
    };

    if !is_relayed_method(&method) {
        metrics::record_request(&route.service, method.as_str(), 405, start);
        return method_not_allowed().await.into_response();
    }

    match forward(&state, request, &route).await {
        Ok(relayed) => {
            metrics::record_request(&route.service, method.as_str(), relayed.status.as_u16(), start);
            relayed.into_response()
        }
        Err(err) => {
            metrics::record_error(&route.service, err.code());
            metrics::record_request(&route.service, method.as_str(), err.status().as_u16(), start);
            err.to_envelope(state.mode.exposes_diagnostics()).into_response()
        }
    }
}

/// Fire-and-acknowledge handler; the caller always sees success.
async fn acknowledge_handler(
    State(state): State<AppState>,
    Extension(route): Extension<Arc<RouteConfig>>,
    request: Request<Body>,
) -> Json<Value> {
    let start = Instant::now();

    match forward(&state, request, &route).await {
        Ok(relayed) if relayed.status.is_success() => {
            metrics::record_request(&route.service, "POST", relayed.status.as_u16(), start);
        }
        Ok(relayed) => {
            tracing::error!(
                service = %route.service,
                status = relayed.status.as_u16(),
                body = %relayed.body,
                "Event delivery rejected"
            );
            metrics::record_request(&route.service, "POST", relayed.status.as_u16(), start);
        }
        Err(err) => {
            tracing::error!(service = %route.service, error = %err.code(), "Event delivery failed: {}", err);
            metrics::record_error(&route.service, err.code());
            metrics::record_request(&route.service, "POST", err.status().as_u16(), start);
        }
    }

    Json(json!({ "status": "ok" }))
}

async fn forward(state: &AppState, request: Request<Body>, route: &RouteConfig) -> ForwardResult {
    let inbound = extract_inbound(request, route, state.max_body_bytes).await?;
    state.forwarder.forward(&inbound, route).await
}

/// Gateway status.
async fn status_handler(State(state): State<AppState>) -> Json<Value> {
    Json(json!({
        "status": "operational",
        "version": env!("CARGO_PKG_VERSION"),
        "mode": state.mode.as_str(),
    }))
}

async fn method_not_allowed() -> ErrorEnvelope {
    ErrorEnvelope::new(ErrorCode::MethodNotAllowed, "Method not allowed")
}

fn panic_response(panic: Box<dyn Any + Send + 'static>) -> Response {
    let detail = panic
        .downcast_ref::<String>()
        .map(String::as_str)
        .or_else(|| panic.downcast_ref::<&str>().copied())
        .unwrap_or("unknown panic");
    tracing::error!(panic = %detail, "Handler panicked");

    ForwardError::Unexpected("An unexpected error occurred".to_string()).into_response()
}
