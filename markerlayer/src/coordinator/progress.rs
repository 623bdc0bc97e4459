//! Shared progress reporting for the active event.

use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::Arc;

/// Coarse-grained progress (0..=100) for the active event.
///
/// Cloned into downstream operations so large reconciliation batches can
/// report progress without holding a reference back into the coordinator.
/// Progress is reporting only, never control flow.
#[derive(Debug, Clone, Default)]
pub struct ProgressHandle {
    percent: Arc<AtomicU8>,
}

impl ProgressHandle {
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets progress, clamped to 100.
    pub fn set(&self, percent: u8) {
        self.percent.store(percent.min(100), Ordering::Relaxed);
    }

    /// Current progress percentage.
    pub fn get(&self) -> u8 {
        self.percent.load(Ordering::Relaxed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_set_and_get() {
        let progress = ProgressHandle::new();
        assert_eq!(progress.get(), 0);
        progress.set(42);
        assert_eq!(progress.get(), 42);
    }

    #[test]
    fn test_clamped_to_100() {
        let progress = ProgressHandle::new();
        progress.set(250);
        assert_eq!(progress.get(), 100);
    }

    #[test]
    fn test_clones_share_state() {
        let progress = ProgressHandle::new();
        let clone = progress.clone();
        clone.set(75);
        assert_eq!(progress.get(), 75);
    }
}
