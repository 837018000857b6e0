//! Sliding window storage and incremental statistics
//!
//! The buffer holds the most recent data points; the statistics mirror its
//! contents so detectors never rescan the window.

mod buffer;
mod stats;

pub use buffer::SlidingWindowBuffer;
pub use stats::{MetricAccumulator, MetricSummary, RegressionAccumulator, RunningStatistics};
