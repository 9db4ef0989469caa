//! Caller-driven cancellation for long-running searches.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use thiserror::Error;

/// Returned when a search observes that its caller cancelled it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("operation cancelled")]
pub struct Cancelled;

/// Shared flag that searches poll once per outer iteration.
///
/// Clones observe the same flag, so a caller keeps one clone and hands
/// another to the request.
///
/// # Examples
/// ```
/// use wayfarer_core::CancellationFlag;
///
/// let flag = CancellationFlag::new();
/// let request = flag.clone();
/// assert!(request.check().is_ok());
/// flag.cancel();
/// assert!(request.check().is_err());
/// ```
#[derive(Debug, Clone, Default)]
pub struct CancellationFlag {
    cancelled: Arc<AtomicBool>,
}

impl CancellationFlag {
    /// Create a flag that has not been raised.
    pub fn new() -> Self {
        Self::default()
    }

    /// Raise the flag.
    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::Release);
    }

    /// Whether the flag has been raised.
    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::Acquire)
    }

    /// Fail with [`Cancelled`] once the flag has been raised.
    pub fn check(&self) -> Result<(), Cancelled> {
        if self.is_cancelled() {
            Err(Cancelled)
        } else {
            Ok(())
        }
    }
}
