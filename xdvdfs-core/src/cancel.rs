//! Cooperative cancellation signal.
//!
//! The core never spawns threads or owns a cancellation source itself;
//! it only polls one. [`CancelFlag`] is the concrete shape callers pass
//! in: cheap to clone, settable from any thread, read with relaxed
//! ordering since it gates only a best-effort early exit.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// A read-only-from-the-core boolean, polled between work items.
#[derive(Clone, Default)]
pub struct CancelFlag(Arc<AtomicBool>);

impl CancelFlag {
    pub fn new() -> Self {
        Self::default()
    }

    /// Mark the flag as set. Intended to be called from outside the
    /// core, e.g. a signal handler or a UI cancel button.
    pub fn cancel(&self) {
        self.0.store(true, Ordering::Relaxed);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::Relaxed)
    }
}

#[cfg(test)]
mod test {
    use super::CancelFlag;

    #[test]
    fn starts_uncancelled() {
        let flag = CancelFlag::new();
        assert!(!flag.is_cancelled());
    }

    #[test]
    fn cancel_is_visible_through_clone() {
        let flag = CancelFlag::new();
        let clone = flag.clone();
        clone.cancel();
        assert!(flag.is_cancelled());
    }
}
