use chrono::{Local, Utc};
use futures::future::BoxFuture;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tracing::{error, info, warn};

use punchcard_domain::checkin::{CheckinRecord, CheckinReport};
use punchcard_domain::notification::{format_failure, format_report, Notifier};
use punchcard_domain::site::SiteProfile;

use super::{CheckinSession, HistoryStore, RetryScheduler};

/// What caused a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Trigger {
    /// Daily schedule tick.
    Scheduled,
    /// Operator pressed "run now"; bypasses the done-for-today skip.
    Manual,
    /// A previously scheduled retry fired.
    Retry,
}

impl std::fmt::Display for Trigger {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Trigger::Scheduled => write!(f, "scheduled"),
            Trigger::Manual => write!(f, "manual"),
            Trigger::Retry => write!(f, "retry"),
        }
    }
}

/// Ties the session, history, retry scheduler and notifier together into
/// one idempotent `run_once` operation. Errors never cross this boundary;
/// every internal failure becomes a Failed record plus a notification.
pub struct CheckinOrchestrator {
    name: String,
    session: CheckinSession,
    history: HistoryStore,
    retry: RetryScheduler,
    notifier: Arc<dyn Notifier>,
    notify_enabled: bool,
    in_flight: AtomicBool,
}

impl CheckinOrchestrator {
    pub fn new(
        name: impl Into<String>,
        session: CheckinSession,
        history: HistoryStore,
        retry: RetryScheduler,
        notifier: Arc<dyn Notifier>,
        notify_enabled: bool,
    ) -> Self {
        Self {
            name: name.into(),
            session,
            history,
            retry,
            notifier,
            notify_enabled,
            in_flight: AtomicBool::new(false),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn history(&self) -> &HistoryStore {
        &self.history
    }

    pub fn retry(&self) -> &RetryScheduler {
        &self.retry
    }

    /// The only entry point. Safe to call repeatedly and from any
    /// trigger; a call while another run is in flight is a logged no-op.
    pub async fn run_once(self: &Arc<Self>, trigger: Trigger) {
        if self.in_flight.swap(true, Ordering::SeqCst) {
            warn!("[{}] A run is already in flight, skipping", self.name);
            return;
        }

        info!("[{}] Starting check-in run ({})", self.name, trigger);
        self.execute(trigger).await;

        self.in_flight.store(false, Ordering::SeqCst);
    }

    /// Boxed re-entry for the retry timer. The box breaks the async
    /// recursion cycle.
    pub fn run_once_boxed(self: Arc<Self>, trigger: Trigger) -> BoxFuture<'static, ()> {
        Box::pin(async move { self.run_once(trigger).await })
    }

    async fn execute(self: &Arc<Self>, trigger: Trigger) {
        // Idempotence per calendar day: scheduled and retry triggers skip
        // once today holds a terminal record. Manual runs always go out.
        // Local date, matching the scheduler's local HH:MM trigger.
        if trigger != Trigger::Manual {
            match self.history.load().await {
                Ok(history) if history.day_is_done(Local::now().date_naive()) => {
                    info!("[{}] Already checked in today, skipping run", self.name);
                    return;
                }
                Ok(_) => {}
                Err(e) => warn!("[{}] Could not read history: {}", self.name, e),
            }
        }

        // A scheduled tick while a retry timer is queued would double up.
        if trigger == Trigger::Scheduled && self.retry.has_pending().await {
            info!("[{}] A retry is already queued, skipping tick", self.name);
            return;
        }

        let previous_balance = match self.history.load_profile().await {
            Ok(profile) => profile.and_then(|p| p.balance),
            Err(e) => {
                warn!("[{}] Could not read profile: {}", self.name, e);
                None
            }
        };

        match self.session.run(previous_balance).await {
            Ok(report) if report.outcome.is_terminal() => self.complete(report).await,
            Ok(report) => self.fail(report.message, true).await,
            Err(e) => {
                let retries = e.retries_run();
                self.fail(e.to_string(), retries).await;
            }
        }
    }

    /// Success or AlreadyDone: reset the budget, drop queued retries,
    /// persist record and profile, notify.
    async fn complete(self: &Arc<Self>, report: CheckinReport) {
        info!("[{}] {}: {}", self.name, report.outcome, report.message);

        self.retry.register_success().await;

        let now = Utc::now();
        if let Err(e) = self
            .history
            .append(CheckinRecord::from_report(&report, now))
            .await
        {
            error!("[{}] Failed to record history: {}", self.name, e);
        }

        if report.balance.is_some() || report.streak.is_some() {
            let profile = SiteProfile::from_report(&report, now);
            if let Err(e) = self.history.save_profile(&profile).await {
                error!("[{}] Failed to save profile: {}", self.name, e);
            }
        }

        self.notify(format_report(&self.name, &report, now)).await;
    }

    /// Failure: record it, consume retry budget when the error class
    /// allows it, queue the delayed re-run, notify with the retry info.
    async fn fail(self: &Arc<Self>, reason: String, consumes_budget: bool) {
        warn!("[{}] Check-in failed: {}", self.name, reason);

        let now = Utc::now();
        if let Err(e) = self
            .history
            .append(CheckinRecord::failure(reason.clone(), now))
            .await
        {
            error!("[{}] Failed to record history: {}", self.name, e);
        }

        let next_delay = if consumes_budget {
            self.retry.register_failure().await
        } else {
            None
        };

        if let Some(delay) = next_delay {
            let rerun = Arc::clone(self).run_once_boxed(Trigger::Retry);
            self.retry.schedule(delay, rerun).await;
        }

        let retry_info = self.retry.retry_info(next_delay, consumes_budget).await;
        self.notify(format_failure(&self.name, &reason, retry_info, now))
            .await;
    }

    async fn notify(&self, message: punchcard_domain::notification::NotificationMessage) {
        if !self.notify_enabled {
            return;
        }
        if let Err(e) = self.notifier.notify(&message).await {
            // Notification failure must never fail the run.
            warn!("[{}] Notification failed: {}", self.name, e);
        }
    }

    /// Drop any queued retry; used on disable and shutdown.
    pub async fn shutdown(&self) {
        self.retry.cancel_all().await;
    }
}
