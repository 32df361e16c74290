//! Configuration management subsystem.
//!
//! # Data Flow
//! ```text
//! built-in service table (schema.rs)
//!     → optional TOML file (loader.rs)
//!     → environment overrides (loader.rs)
//!     → validation.rs (semantic checks)
//!     → GatewayConfig (validated, immutable)
//!     → resolved once into routing::RouteTable
//! ```
//!
//! # Design Decisions
//! - Config is read once at startup; there is no reload path
//! - All fields have defaults to allow minimal configs
//! - Environment access is injected so resolution is testable

pub mod loader;
pub mod schema;
pub mod validation;

pub use loader::{load, load_from_process, ConfigError};
pub use schema::{
    builtin_services, Delivery, DeploymentMode, GatewayConfig, ListenerConfig, LogFormat,
    ObservabilityConfig, ServiceConfig, TimeoutConfig, TrailingSlash,
};
pub use validation::ValidationError;
