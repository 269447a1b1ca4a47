//! Cooperative cancellation for a single compilation call (spec §5
//! "Cancellation").
//!
//! Compilation is synchronous and runs entirely within the caller's thread,
//! so there's no executor to hand a future to. A [`CancellationToken`] is
//! just a shared flag: a caller running compilation on a worker thread can
//! clone it and call [`CancellationToken::cancel`] from elsewhere (a request
//! timeout, a client disconnect) to make the in-flight compilation stop at
//! its next descent point.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use crate::error::{ExecutionError, Result};

/// A cheaply-cloneable cancellation flag checked at each recursive descent
/// point of compilation (entering a join, an aggregate chain, a filter
/// sub-tree).
#[derive(Debug, Clone, Default)]
pub struct CancellationToken {
    cancelled: Arc<AtomicBool>,
}

impl CancellationToken {
    pub fn new() -> Self {
        Self::default()
    }

    /// Requests cancellation. Idempotent.
    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::SeqCst)
    }

    /// Returns `Err(ExecutionError::Cancelled)` if cancellation was
    /// requested, discarding whatever partial output the caller was about to
    /// produce.
    pub fn check(&self) -> Result<()> {
        if self.is_cancelled() {
            Err(ExecutionError::Cancelled)
        } else {
            Ok(())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn starts_uncancelled() {
        let token = CancellationToken::new();
        assert!(token.check().is_ok());
    }

    #[test]
    fn cancel_is_observed_through_a_clone() {
        let token = CancellationToken::new();
        let handle = token.clone();
        handle.cancel();
        assert!(token.is_cancelled());
        assert!(matches!(token.check(), Err(ExecutionError::Cancelled)));
    }
}
