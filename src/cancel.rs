//! Cooperative cancellation for long-running analytics.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use crate::errors::ContextGraphError;

/// Shared flag checked between outer-loop iterations of iterative
/// algorithms. Cloning shares the flag.
#[derive(Clone, Debug, Default)]
pub struct CancelToken {
    flag: Arc<AtomicBool>,
}

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.flag.store(true, Ordering::Release);
    }

    pub fn is_cancelled(&self) -> bool {
        self.flag.load(Ordering::Acquire)
    }

    pub fn check(&self, operation: &str) -> Result<(), ContextGraphError> {
        if self.is_cancelled() {
            return Err(ContextGraphError::cancelled(operation));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_token_starts_live() {
        let token = CancelToken::new();
        assert!(!token.is_cancelled());
        assert!(token.check("noop").is_ok());
    }

    #[test]
    fn test_cancel_is_shared_across_clones() {
        let token = CancelToken::new();
        let clone = token.clone();
        token.cancel();
        assert!(clone.is_cancelled());
        let err = clone.check("betweenness").expect_err("cancelled");
        assert!(matches!(err, ContextGraphError::Cancelled(_)));
    }
}
