//! Cooperative cancellation flag shared across a validation batch.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

/// A cloneable cancellation flag.
///
/// Checked between validation stages; a set flag makes in-flight sessions
/// terminate rejected with a cancellation note instead of finishing work.
#[derive(Debug, Clone, Default)]
pub struct CancelFlag(Arc<AtomicBool>);

impl CancelFlag {
    pub fn new() -> Self {
        CancelFlag::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn clones_share_state() {
        let flag = CancelFlag::new();
        let copy = flag.clone();
        assert!(!copy.is_cancelled());
        flag.cancel();
        assert!(copy.is_cancelled());
    }
}
