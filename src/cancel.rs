//! Cooperative cancellation.
//!
//! The core has no timers of its own. It polls a caller-supplied token at
//! the boundaries between stages — after each segment search and after
//! each refinement round — and aborts with `SvveError::Canceled` without
//! emitting partial results.
//!
//! A single atomic flag is enough here; there's no shared mutable data
//! structure to protect, just one bit of state — an `Arc<AtomicBool>`
//! handle cloned to every caller who wants to trigger cancellation.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Shared-ownership cancellation handle. Cloning is cheap (one `Arc` bump)
/// and every clone observes the same underlying flag.
#[derive(Debug, Clone, Default)]
pub struct CancellationToken {
    flag: Arc<AtomicBool>,
}

impl CancellationToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.flag.store(true, Ordering::SeqCst);
    }

    pub fn is_canceled(&self) -> bool {
        self.flag.load(Ordering::SeqCst)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn starts_uncanceled() {
        let tok = CancellationToken::new();
        assert!(!tok.is_canceled());
    }

    #[test]
    fn cancellation_is_visible_across_clones() {
        let tok = CancellationToken::new();
        let clone = tok.clone();
        clone.cancel();
        assert!(tok.is_canceled());
    }
}
