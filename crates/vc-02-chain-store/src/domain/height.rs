use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

/// Read-only view of the last confirmed height.
///
/// Published with release ordering after the append batch is durable, so a
/// reader that observes height `h` can load every block up to `h`.
#[derive(Debug, Clone, Default)]
pub struct HeightHandle(Arc<AtomicU64>);

impl HeightHandle {
    pub(crate) fn new(height: u64) -> Self {
        Self(Arc::new(AtomicU64::new(height)))
    }

    pub(crate) fn publish(&self, height: u64) {
        self.0.store(height, Ordering::Release);
    }

    /// Current last confirmed height.
    pub fn get(&self) -> u64 {
        self.0.load(Ordering::Acquire)
    }
}
