//! Service forwarder library: a thin HTTP gateway that relays JSON calls to
//! a fixed set of backend services.

pub mod config;
pub mod forward;
pub mod http;
pub mod lifecycle;
pub mod observability;
pub mod resilience;
pub mod routing;

pub use config::GatewayConfig;
pub use forward::Forwarder;
pub use http::HttpServer;
pub use lifecycle::Shutdown;
pub use routing::RouteTable;
