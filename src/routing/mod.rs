//! Routing subsystem.
//!
//! # Data Flow
//! ```text
//! Route resolution (at startup):
//!     ServiceConfig[] + DeploymentMode
//!     → table.rs (base URL policy, timeouts)
//!     → Freeze as immutable RouteTable
//!
//! Per request:
//!     RouteConfig + path segments + query
//!     → compose.rs (strip duplicate prefix, join, slash policy)
//!     → absolute target URL
//! ```
//!
//! # Design Decisions
//! - One declarative rule per backend, one composition function for all
//! - Deterministic: same input always yields the same URL

pub mod compose;
pub mod table;

pub use compose::{compose_url, PathRule};
pub use table::{BaseUrl, RouteConfig, RouteTable};
