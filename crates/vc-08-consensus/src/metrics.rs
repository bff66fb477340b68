//! # Agreement Metrics
//!
//! Prometheus metrics for monitoring block agreement.
//!
//! ## Usage
//!
//! Enable with the `metrics` feature:
//! ```toml
//! vc-08-consensus = { path = "...", features = ["metrics"] }
//! ```
//!
//! ## Metrics Exported
//!
//! - `agreement_blocks_finalized_total` - Counter of blocks appended to the chain
//! - `agreement_finalized_height` - Gauge of the last confirmed height
//! - `agreement_messages_dropped_total` - Counter of rejected input (by reason)
//! - `agreement_blocks_synced_total` - Counter of blocks obtained through sync
//! - `agreement_view_changes_total` - Counter of adopted view changes
//! - `agreement_tick_latency_seconds` - Histogram of scheduler tick durations

#[cfg(feature = "metrics")]
use lazy_static::lazy_static;

#[cfg(feature = "metrics")]
use prometheus::{
    register_counter_vec, register_histogram, register_int_counter, register_int_gauge,
    CounterVec, Histogram, IntCounter, IntGauge,
};

#[cfg(feature = "metrics")]
lazy_static! {
    /// Total blocks appended, locally finalized or synced
    pub static ref BLOCKS_FINALIZED: IntCounter = register_int_counter!(
        "agreement_blocks_finalized_total",
        "Total number of blocks appended to the chain"
    )
    .expect("Failed to create BLOCKS_FINALIZED metric");

    /// Last confirmed height
    pub static ref FINALIZED_HEIGHT: IntGauge = register_int_gauge!(
        "agreement_finalized_height",
        "Height of the last confirmed block"
    )
    .expect("Failed to create FINALIZED_HEIGHT metric");

    /// Dropped messages and blocks, labeled by reason
    pub static ref MESSAGES_DROPPED: CounterVec = register_counter_vec!(
        "agreement_messages_dropped_total",
        "Total number of consensus messages and blocks dropped",
        &["reason"]
    )
    .expect("Failed to create MESSAGES_DROPPED metric");

    /// Blocks obtained through sync
    pub static ref BLOCKS_SYNCED: IntCounter = register_int_counter!(
        "agreement_blocks_synced_total",
        "Total number of blocks appended through sync"
    )
    .expect("Failed to create BLOCKS_SYNCED metric");

    /// Adopted view changes
    pub static ref VIEW_CHANGES: IntCounter = register_int_counter!(
        "agreement_view_changes_total",
        "Total number of view changes adopted"
    )
    .expect("Failed to create VIEW_CHANGES metric");

    /// Scheduler tick duration
    pub static ref TICK_LATENCY: Histogram = register_histogram!(
        "agreement_tick_latency_seconds",
        "Time taken by one scheduler tick in seconds",
        vec![0.001, 0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0]
    )
    .expect("Failed to create TICK_LATENCY metric");
}

/// Record a block appended at `height`
#[cfg(feature = "metrics")]
pub fn record_block_finalized(height: u64) {
    BLOCKS_FINALIZED.inc();
    FINALIZED_HEIGHT.set(i64::try_from(height).unwrap_or(i64::MAX));
}

/// Record a dropped message with reason
#[cfg(feature = "metrics")]
pub fn record_message_dropped(reason: &str) {
    MESSAGES_DROPPED.with_label_values(&[reason]).inc();
}

/// Record blocks appended through sync
#[cfg(feature = "metrics")]
pub fn record_blocks_synced(count: usize) {
    BLOCKS_SYNCED.inc_by(count as u64);
}

/// Record an adopted view change
#[cfg(feature = "metrics")]
pub fn record_view_change() {
    VIEW_CHANGES.inc();
}

/// Record tick duration
#[cfg(feature = "metrics")]
pub fn record_tick_latency(seconds: f64) {
    TICK_LATENCY.observe(seconds);
}

// No-op implementations when metrics feature is disabled
#[cfg(not(feature = "metrics"))]
pub fn record_block_finalized(_height: u64) {}

#[cfg(not(feature = "metrics"))]
pub fn record_message_dropped(_reason: &str) {}

#[cfg(not(feature = "metrics"))]
pub fn record_blocks_synced(_count: usize) {}

#[cfg(not(feature = "metrics"))]
pub fn record_view_change() {}

#[cfg(not(feature = "metrics"))]
pub fn record_tick_latency(_seconds: f64) {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_metrics_noop_when_disabled() {
        // These should compile and run without panic even without metrics feature
        record_block_finalized(1);
        record_message_dropped("test");
        record_blocks_synced(2);
        record_view_change();
        record_tick_latency(0.5);
    }
}
