//! Synthetic classified-error workload
//!
//! Stands in for an error factory: every tick it builds one classified
//! error object inside `monitor_unit_of_work`, periodically builds a whole
//! batch through `monitor_batch`, and rejects a fixed share of requests so
//! failure accounting is exercised too.

use std::time::Duration;

use anyhow::{bail, Result};
use monitor_lib::{Classified, PerformanceMonitor};
use serde::Serialize;
use tokio::sync::broadcast;
use tokio::time::{interval, MissedTickBehavior};
use tracing::{debug, info};

/// Classification codes produced by the synthetic factory
pub const ERROR_CODES: &[&str] = &[
    "NETWORK_ERROR",
    "TIMEOUT_ERROR",
    "VALIDATION_ERROR",
    "PERMISSION_DENIED",
    "NOT_FOUND",
    "RATE_LIMITED",
];

/// Error object handed back by the factory
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ClassifiedError {
    pub code: &'static str,
    pub message: String,
}

impl Classified for ClassifiedError {
    fn classification(&self) -> Option<&str> {
        Some(self.code)
    }
}

/// Workload tuning
#[derive(Debug, Clone)]
pub struct WorkloadConfig {
    /// Units of work per second
    pub rate_per_sec: u32,
    /// Run a batch every this many ticks (0 disables batches)
    pub batch_every: u64,
    pub batch_size: usize,
    /// Reject every n-th request (0 disables failures)
    pub failure_every: u64,
}

impl Default for WorkloadConfig {
    fn default() -> Self {
        Self {
            rate_per_sec: 50,
            batch_every: 500,
            batch_size: 150,
            failure_every: 25,
        }
    }
}

/// Build one classified error; every `failure_every`-th request is rejected
pub fn create_error(seq: u64, failure_every: u64) -> Result<ClassifiedError> {
    if failure_every > 0 && seq % failure_every == failure_every - 1 {
        bail!("factory rejected request #{}", seq);
    }
    let code = ERROR_CODES[(seq % ERROR_CODES.len() as u64) as usize];
    Ok(ClassifiedError {
        code,
        message: format!("synthetic {} #{}", code.to_lowercase(), seq),
    })
}

/// Periodic producer feeding the monitor
pub struct Workload {
    monitor: PerformanceMonitor,
    config: WorkloadConfig,
    seq: u64,
    ticks: u64,
}

impl Workload {
    pub fn new(monitor: PerformanceMonitor, config: WorkloadConfig) -> Self {
        Self {
            monitor,
            config,
            seq: 0,
            ticks: 0,
        }
    }

    /// Run until a shutdown signal arrives
    pub async fn run(mut self, mut shutdown: broadcast::Receiver<()>) {
        let period = Duration::from_secs_f64(1.0 / f64::from(self.config.rate_per_sec.max(1)));
        info!(
            rate_per_sec = self.config.rate_per_sec,
            batch_every = self.config.batch_every,
            batch_size = self.config.batch_size,
            "Starting synthetic workload"
        );

        let mut ticker = interval(period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    self.tick();
                }
                _ = shutdown.recv() => {
                    info!(units = self.seq, "Shutting down synthetic workload");
                    break;
                }
            }
        }
    }

    /// One unit of work, plus a batch when due
    pub fn tick(&mut self) {
        self.ticks += 1;

        let seq = self.next_seq();
        let failure_every = self.config.failure_every;
        if let Err(e) = self
            .monitor
            .monitor_unit_of_work("create_error", || create_error(seq, failure_every))
        {
            debug!(error = %e, "Synthetic unit of work failed");
        }

        if self.config.batch_every > 0 && self.ticks % self.config.batch_every == 0 {
            let start = self.seq;
            let size = self.config.batch_size as u64;
            self.seq += size;
            let batch = self.monitor.monitor_batch(self.config.batch_size, || {
                (start..start + size)
                    .map(|seq| create_error(seq, 0))
                    .collect::<Result<Vec<_>>>()
            });
            if let Err(e) = batch {
                debug!(error = %e, "Synthetic batch failed");
            }
        }
    }

    fn next_seq(&mut self) -> u64 {
        let seq = self.seq;
        self.seq += 1;
        seq
    }
}
