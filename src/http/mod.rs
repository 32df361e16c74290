//! HTTP protocol handling subsystem.
//!
//! # Data Flow
//! ```text
//! TCP connection
//!     → server.rs (Axum setup, middleware, dispatch)
//!     → request.rs (add request ID, extract path/query/auth/body)
//!     → [forward layer calls the backend]
//!     → response.rs (error envelope) | forward::Relayed (backend payload)
//!     → Send to client
//! ```

pub mod request;
pub mod response;
pub mod server;

pub use request::{MakeRequestUuid, X_REQUEST_ID};
pub use response::ErrorEnvelope;
pub use server::{AppState, HttpServer};
