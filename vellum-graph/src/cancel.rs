//! Build-cycle cancellation.

use std::sync::{
    Arc,
    atomic::{AtomicBool, Ordering},
};

use thiserror::Error;

/// Error returned by a computation abandoned due to cancellation.
///
/// Cancellation propagates through a build cycle as an ordinary error, and
/// the caching layer guarantees a cancelled computation never populates a
/// slot, so the next cycle can never observe a partial result.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("build cycle cancelled")]
pub struct Cancelled;

/// A cheaply clonable cancellation flag shared across a build cycle.
#[derive(Debug, Clone, Default)]
pub struct CancellationToken {
    flag: Arc<AtomicBool>,
}

impl CancellationToken {
    pub fn new() -> Self {
        Self::default()
    }

    /// Request cancellation of the cycle.
    pub fn cancel(&self) {
        self.flag.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.flag.load(Ordering::SeqCst)
    }

    /// Bail out if cancellation has been requested.
    pub fn checkpoint(&self) -> Result<(), Cancelled> {
        if self.is_cancelled() { Err(Cancelled) } else { Ok(()) }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_checkpoint() {
        let token = CancellationToken::new();
        assert!(token.checkpoint().is_ok());

        let shared = token.clone();
        shared.cancel();
        assert!(token.is_cancelled());
        assert_eq!(token.checkpoint(), Err(Cancelled));
    }
}
