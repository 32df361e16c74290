//! Timeout enforcement.
//!
//! # Responsibilities
//! - Race backend calls against a deadline
//! - Cancel the call cleanly when the deadline wins
//!
//! # Design Decisions
//! - Uses Tokio's timeout facilities; dropping the future aborts the call
//! - Timeout errors are distinct from other errors
//! - Timed-out requests return 504 Gateway Timeout

use std::future::Future;
use std::time::Duration;

use thiserror::Error;

/// The deadline elapsed before the wrapped future completed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("deadline of {0:?} elapsed")]
pub struct DeadlineExceeded(pub Duration);

/// Run `fut` until it completes or `limit` elapses, whichever comes first.
pub async fn with_deadline<F>(limit: Duration, fut: F) -> Result<F::Output, DeadlineExceeded>
where
    F: Future,
{
    tokio::time::timeout(limit, fut)
        .await
        .map_err(|_| DeadlineExceeded(limit))
}
