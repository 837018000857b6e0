//! Periodic housekeeping task
//!
//! A single low-priority tokio task that runs a callback on a fixed
//! interval until cancelled. Cancellation is idempotent, may be triggered
//! from inside the callback, and happens automatically when the handle is
//! dropped.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::{interval, MissedTickBehavior};
use tracing::{debug, info};

/// Shared cancellation flag for a housekeeping task
#[derive(Debug, Clone)]
pub struct CancelToken {
    cancelled: Arc<AtomicBool>,
    tx: Arc<watch::Sender<bool>>,
}

impl CancelToken {
    fn new() -> (Self, watch::Receiver<bool>) {
        let (tx, rx) = watch::channel(false);
        (
            Self {
                cancelled: Arc::new(AtomicBool::new(false)),
                tx: Arc::new(tx),
            },
            rx,
        )
    }

    /// Request cancellation; returns true only for the first call
    pub fn cancel(&self) -> bool {
        if self.cancelled.swap(true, Ordering::SeqCst) {
            return false;
        }
        self.tx.send_replace(true);
        true
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::SeqCst)
    }
}

/// Handle to a running housekeeping task
pub struct Housekeeper {
    token: CancelToken,
    task: Option<JoinHandle<()>>,
}

impl Housekeeper {
    /// Spawn `callback` to run every `period` on the current tokio runtime
    ///
    /// Returns `None` when called outside a runtime; callers then rely on
    /// the count bounds enforced inline.
    pub fn spawn<F>(name: &'static str, period: Duration, mut callback: F) -> Option<Self>
    where
        F: FnMut(&CancelToken) + Send + 'static,
    {
        let runtime = match tokio::runtime::Handle::try_current() {
            Ok(handle) => handle,
            Err(_) => {
                debug!(task = name, "No tokio runtime, housekeeping disabled");
                return None;
            }
        };

        let (token, mut shutdown) = CancelToken::new();
        let task_token = token.clone();

        let task = runtime.spawn(async move {
            info!(task = name, interval_ms = period.as_millis() as u64, "Starting housekeeping task");

            let mut ticker = interval(period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            // First tick completes immediately
            ticker.tick().await;

            loop {
                tokio::select! {
                    _ = ticker.tick() => {
                        if task_token.is_cancelled() {
                            break;
                        }
                        callback(&task_token);
                        if task_token.is_cancelled() {
                            break;
                        }
                    }
                    changed = shutdown.changed() => {
                        if changed.is_err() || *shutdown.borrow() {
                            break;
                        }
                    }
                }
            }

            debug!(task = name, "Housekeeping task stopped");
        });

        Some(Self {
            token,
            task: Some(task),
        })
    }

    /// Stop the task; safe to call repeatedly
    pub fn cancel(&self) -> bool {
        self.token.cancel()
    }

    pub fn is_cancelled(&self) -> bool {
        self.token.is_cancelled()
    }

    /// Token that can cancel this task from elsewhere
    pub fn token(&self) -> CancelToken {
        self.token.clone()
    }

    /// Whether the spawned task has exited
    pub fn is_finished(&self) -> bool {
        self.task.as_ref().map(|t| t.is_finished()).unwrap_or(true)
    }
}

impl Drop for Housekeeper {
    fn drop(&mut self) {
        self.token.cancel();
        // Task exits on its own at the next poll; detach it
        self.task.take();
    }
}
