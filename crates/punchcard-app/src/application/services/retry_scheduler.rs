use futures::future::BoxFuture;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tracing::{info, warn};

use punchcard_domain::checkin::{RetryPolicy, RetryState};
use punchcard_domain::notification::RetryInfo;

/// Schedules one-shot delayed re-runs after failed check-ins.
///
/// One instance per plugin. Owns the retry counter: the orchestrator asks
/// `register_failure` whether budget remains and hands `schedule` the
/// boxed re-run. At most one timer is queued at a time; scheduling a new
/// one aborts the old.
pub struct RetryScheduler {
    policy: RetryPolicy,
    state: Mutex<RetryState>,
    pending: Arc<Mutex<Option<JoinHandle<()>>>>,
}

impl RetryScheduler {
    pub fn new(policy: RetryPolicy) -> Self {
        Self {
            policy,
            state: Mutex::new(RetryState::new()),
            pending: Arc::new(Mutex::new(None)),
        }
    }

    pub fn policy(&self) -> &RetryPolicy {
        &self.policy
    }

    /// Consume one unit of retry budget. Returns the delay to wait before
    /// the next attempt, or `None` once the budget is spent.
    pub async fn register_failure(&self) -> Option<Duration> {
        self.state.lock().await.on_failure(&self.policy)
    }

    /// A terminal run resets the counter and drops any queued timer.
    pub async fn register_success(&self) {
        self.state.lock().await.on_success();
        self.cancel_all().await;
    }

    /// Queue `task` to run after `delay`. Never fails: the worst case is
    /// a warning and no retry.
    pub async fn schedule(&self, delay: Duration, task: BoxFuture<'static, ()>) {
        let slot = Arc::clone(&self.pending);
        let handle = tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            // The timer has fired: it is no longer pending. Clearing the
            // slot first also keeps the task's own completion path from
            // aborting itself through cancel_all.
            slot.lock().await.take();
            task.await;
        });

        let mut pending = self.pending.lock().await;
        if let Some(old) = pending.replace(handle) {
            if !old.is_finished() {
                warn!("Replacing a retry that was still pending");
                old.abort();
            }
        }

        info!("Retry scheduled in {}s", delay.as_secs());
    }

    /// Remove any queued retry. Called on success, operator disable, and
    /// shutdown.
    pub async fn cancel_all(&self) {
        let mut pending = self.pending.lock().await;
        if let Some(handle) = pending.take() {
            if !handle.is_finished() {
                info!("Cancelling pending retry");
                handle.abort();
            }
        }
    }

    /// Whether a delayed re-run is queued and has not fired yet.
    pub async fn has_pending(&self) -> bool {
        self.pending
            .lock()
            .await
            .as_ref()
            .map(|h| !h.is_finished())
            .unwrap_or(false)
    }

    pub async fn current_attempt(&self) -> u32 {
        self.state.lock().await.current_attempt()
    }

    /// Snapshot for notification rendering. `retryable` says whether the
    /// failure at hand consumed budget; non-retryable errors must not
    /// render as an exhausted budget.
    pub async fn retry_info(&self, next_delay: Option<Duration>, retryable: bool) -> RetryInfo {
        RetryInfo {
            attempts_used: self.current_attempt().await,
            max_attempts: self.policy.max_attempts,
            next_delay,
            retryable,
        }
    }
}

impl Drop for RetryScheduler {
    fn drop(&mut self) {
        if let Ok(mut pending) = self.pending.try_lock() {
            if let Some(handle) = pending.take() {
                handle.abort();
            }
        }
    }
}
