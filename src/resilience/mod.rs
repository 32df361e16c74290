//! Resilience subsystem.
//!
//! # Data Flow
//! ```text
//! Request to backend:
//!     → timeouts.rs (race the call against the route deadline)
//!     → on expiry: call dropped, TIMEOUT reported to the caller
//! ```
//!
//! # Design Decisions
//! - Timeouts are non-negotiable; every outbound call has a deadline
//! - No retries: the original caller owns any retry decision

pub mod timeouts;

pub use timeouts::{with_deadline, DeadlineExceeded};
