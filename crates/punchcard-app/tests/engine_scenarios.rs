//! End-to-end orchestrator scenarios against in-memory fakes.
//!
//! Time is paused in every test, so the session's verification delays and
//! the retry scheduler's hour-scale timers elapse instantly.

use async_trait::async_trait;
use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use punchcard_app::application::services::{
    CheckinOrchestrator, CheckinSession, HistoryStore, RetryScheduler, Trigger,
};
use punchcard_domain::checkin::{CheckinRecord, CheckinReport, RetryPolicy};
use punchcard_domain::notification::{NotificationMessage, Notifier};
use punchcard_domain::site::{
    CheckinSurface, RawResponse, SiteAdapter, SiteCredentials, SiteSession,
};
use punchcard_domain::store::KvStore;
use punchcard_domain::{EngineError, Outcome, PluginId};

/// In-memory stand-in for the SQLite store.
#[derive(Default)]
struct MemoryKv {
    data: Mutex<HashMap<(String, String), serde_json::Value>>,
}

#[async_trait]
impl KvStore for MemoryKv {
    async fn get(
        &self,
        plugin: &PluginId,
        key: &str,
    ) -> Result<Option<serde_json::Value>, EngineError> {
        let data = self.data.lock().unwrap();
        Ok(data.get(&(plugin.to_string(), key.to_string())).cloned())
    }

    async fn put(
        &self,
        plugin: &PluginId,
        key: &str,
        value: serde_json::Value,
    ) -> Result<(), EngineError> {
        let mut data = self.data.lock().unwrap();
        data.insert((plugin.to_string(), key.to_string()), value);
        Ok(())
    }

    async fn remove(&self, plugin: &PluginId, key: &str) -> Result<(), EngineError> {
        let mut data = self.data.lock().unwrap();
        data.remove(&(plugin.to_string(), key.to_string()));
        Ok(())
    }
}

/// How one full run against the fake site should play out. Consumed from
/// the script at authentication time, one plan per run.
#[derive(Debug, Clone, Copy)]
enum RunPlan {
    Succeed { reward: f64, balance: f64 },
    AlreadyDone,
    NetworkDown,
}

struct ScriptedAdapter {
    script: Mutex<VecDeque<RunPlan>>,
    current: Mutex<Option<RunPlan>>,
    sessions_started: AtomicU32,
}

impl ScriptedAdapter {
    fn new(plans: impl IntoIterator<Item = RunPlan>) -> Arc<Self> {
        Arc::new(Self {
            script: Mutex::new(plans.into_iter().collect()),
            current: Mutex::new(None),
            sessions_started: AtomicU32::new(0),
        })
    }

    fn sessions_started(&self) -> u32 {
        self.sessions_started.load(Ordering::SeqCst)
    }

    fn current_plan(&self) -> RunPlan {
        self.current.lock().unwrap().expect("no run in progress")
    }
}

#[async_trait]
impl SiteAdapter for ScriptedAdapter {
    fn name(&self) -> &str {
        "fake-site"
    }

    async fn authenticate(
        &self,
        _credentials: &SiteCredentials,
    ) -> Result<SiteSession, EngineError> {
        // Yield so overlapping runs genuinely interleave.
        tokio::time::sleep(Duration::from_millis(10)).await;

        let plan = self
            .script
            .lock()
            .unwrap()
            .pop_front()
            .expect("script exhausted");
        *self.current.lock().unwrap() = Some(plan);
        self.sessions_started.fetch_add(1, Ordering::SeqCst);

        Ok(SiteSession::new("session=fake"))
    }

    async fn fetch_checkin_surface(
        &self,
        _session: &SiteSession,
    ) -> Result<CheckinSurface, EngineError> {
        match self.current_plan() {
            RunPlan::NetworkDown => {
                Err(EngineError::Network("connection reset".to_string()))
            }
            _ => Ok(CheckinSurface {
                anti_forgery_token: "tok".to_string(),
                user_id: "42".to_string(),
                balance_before: None,
                streak_before: None,
            }),
        }
    }

    async fn submit_checkin(
        &self,
        _session: &SiteSession,
        _surface: &CheckinSurface,
    ) -> Result<RawResponse, EngineError> {
        Ok(RawResponse {
            status: 200,
            body: "ok".to_string(),
        })
    }

    fn interpret(
        &self,
        _raw: &RawResponse,
        _previous_balance: Option<f64>,
    ) -> Result<CheckinReport, EngineError> {
        match self.current_plan() {
            RunPlan::Succeed { reward, balance } => {
                Ok(CheckinReport::new(Outcome::Success, "Checked in")
                    .with_numbers(Some(reward), Some(balance), Some(3)))
            }
            RunPlan::AlreadyDone => {
                Ok(CheckinReport::new(Outcome::AlreadyDone, "Already checked in"))
            }
            RunPlan::NetworkDown => {
                Err(EngineError::Network("connection reset".to_string()))
            }
        }
    }
}

#[derive(Default)]
struct RecordingNotifier {
    sent: Mutex<Vec<NotificationMessage>>,
}

impl RecordingNotifier {
    fn messages(&self) -> Vec<NotificationMessage> {
        self.sent.lock().unwrap().clone()
    }
}

#[async_trait]
impl Notifier for RecordingNotifier {
    async fn notify(&self, message: &NotificationMessage) -> Result<(), EngineError> {
        self.sent.lock().unwrap().push(message.clone());
        Ok(())
    }
}

struct Harness {
    orchestrator: Arc<CheckinOrchestrator>,
    adapter: Arc<ScriptedAdapter>,
    notifier: Arc<RecordingNotifier>,
}

fn harness(adapter: Arc<ScriptedAdapter>, policy: RetryPolicy) -> Harness {
    harness_with_credentials(adapter, policy, SiteCredentials::from_cookie("uid=1"))
}

fn harness_with_credentials(
    adapter: Arc<ScriptedAdapter>,
    policy: RetryPolicy,
    credentials: SiteCredentials,
) -> Harness {
    let store: Arc<dyn KvStore> = Arc::new(MemoryKv::default());
    let notifier = Arc::new(RecordingNotifier::default());

    let session = CheckinSession::new(adapter.clone(), credentials);
    let history = HistoryStore::new(store, PluginId::from_string("test-plugin"), 30);
    let retry = RetryScheduler::new(policy);

    let orchestrator = Arc::new(CheckinOrchestrator::new(
        "fake-site",
        session,
        history,
        retry,
        notifier.clone(),
        true,
    ));

    Harness {
        orchestrator,
        adapter,
        notifier,
    }
}

async fn records(orchestrator: &Arc<CheckinOrchestrator>) -> Vec<CheckinRecord> {
    orchestrator.history().list().await.unwrap()
}

/// Paused-clock polling: each sleep lets queued timers fire and their
/// runs complete. Asserts after the loop pick up the failure if the
/// condition never holds.
macro_rules! wait_until {
    ($cond:expr) => {
        for _ in 0..200u32 {
            if $cond {
                break;
            }
            tokio::time::sleep(Duration::from_secs(60)).await;
        }
    };
}

#[tokio::test(start_paused = true)]
async fn successful_run_records_profile_and_notifies() {
    let h = harness(
        ScriptedAdapter::new([RunPlan::Succeed {
            reward: 10.0,
            balance: 110.0,
        }]),
        RetryPolicy::new(2, Duration::from_secs(3600)),
    );

    h.orchestrator.run_once(Trigger::Manual).await;

    let records = records(&h.orchestrator).await;
    assert_eq!(records.len(), 1);
    assert_eq!(records[0].outcome, Outcome::Success);
    assert_eq!(records[0].balance, Some(110.0));
    assert_eq!(records[0].failure_count, 0);

    let profile = h.orchestrator.history().load_profile().await.unwrap();
    assert_eq!(profile.unwrap().balance, Some(110.0));

    let messages = h.notifier.messages();
    assert_eq!(messages.len(), 1);
    assert!(messages[0].title.contains("fake-site"));
    assert!(messages[0].text.contains("110"));

    assert!(!h.orchestrator.retry().has_pending().await);
}

#[tokio::test(start_paused = true)]
async fn scheduled_run_skips_once_day_is_done() {
    let h = harness(
        ScriptedAdapter::new([
            RunPlan::Succeed {
                reward: 1.0,
                balance: 1.0,
            },
            RunPlan::Succeed {
                reward: 1.0,
                balance: 2.0,
            },
        ]),
        RetryPolicy::disabled(),
    );

    h.orchestrator.run_once(Trigger::Scheduled).await;
    h.orchestrator.run_once(Trigger::Scheduled).await;

    assert_eq!(h.adapter.sessions_started(), 1);
    assert_eq!(records(&h.orchestrator).await.len(), 1);
}

#[tokio::test(start_paused = true)]
async fn overlapping_runs_share_one_session() {
    let h = harness(
        ScriptedAdapter::new([RunPlan::Succeed {
            reward: 5.0,
            balance: 50.0,
        }]),
        RetryPolicy::disabled(),
    );

    // Manual trigger bypasses the done-for-today skip, so only the
    // in-flight guard keeps the second call out.
    let a = h.orchestrator.clone();
    let b = h.orchestrator.clone();
    futures::join!(
        async move { a.run_once(Trigger::Manual).await },
        async move { b.run_once(Trigger::Manual).await },
    );

    assert_eq!(h.adapter.sessions_started(), 1);
    assert_eq!(records(&h.orchestrator).await.len(), 1);
}

#[tokio::test(start_paused = true)]
async fn failures_collapse_and_final_success_replaces_them() {
    let h = harness(
        ScriptedAdapter::new([
            RunPlan::NetworkDown,
            RunPlan::NetworkDown,
            RunPlan::Succeed {
                reward: 20.0,
                balance: 220.0,
            },
        ]),
        RetryPolicy::new(2, Duration::from_secs(3600)),
    );

    h.orchestrator.run_once(Trigger::Manual).await;

    // First run failed and queued a retry an hour out.
    assert_eq!(h.orchestrator.retry().current_attempt().await, 1);
    assert!(h.orchestrator.retry().has_pending().await);
    let after_first = records(&h.orchestrator).await;
    assert_eq!(after_first.len(), 1);
    assert_eq!(after_first[0].outcome, Outcome::Failed);
    assert_eq!(after_first[0].failure_count, 1);

    // Let both retries fire; the day ends in exactly one record with the
    // failure trail carried onto it.
    wait_until!(records(&h.orchestrator)
        .await
        .first()
        .map(|r| r.outcome == Outcome::Success)
        .unwrap_or(false));

    let finals = records(&h.orchestrator).await;
    assert_eq!(finals.len(), 1);
    assert_eq!(finals[0].outcome, Outcome::Success);
    assert_eq!(finals[0].failure_count, 2);
    assert_eq!(finals[0].balance, Some(220.0));

    assert_eq!(h.adapter.sessions_started(), 3);
    assert_eq!(h.orchestrator.retry().current_attempt().await, 0);
    assert!(!h.orchestrator.retry().has_pending().await);

    // Two failure notifications plus the success.
    assert_eq!(h.notifier.messages().len(), 3);
}

#[tokio::test(start_paused = true)]
async fn retry_budget_exhaustion_gives_up_until_next_day() {
    let h = harness(
        ScriptedAdapter::new([RunPlan::NetworkDown, RunPlan::NetworkDown]),
        RetryPolicy::new(1, Duration::from_secs(3600)),
    );

    h.orchestrator.run_once(Trigger::Manual).await;
    assert!(h.orchestrator.retry().has_pending().await);

    wait_until!(
        records(&h.orchestrator)
            .await
            .first()
            .map(|r| r.failure_count == 2)
            .unwrap_or(false)
            && h.orchestrator.retry().current_attempt().await == 0
    );

    // Budget spent: counter reset, nothing further queued.
    assert!(!h.orchestrator.retry().has_pending().await);
    assert_eq!(h.adapter.sessions_started(), 2);

    let finals = records(&h.orchestrator).await;
    assert_eq!(finals.len(), 1);
    assert_eq!(finals[0].outcome, Outcome::Failed);

    let messages = h.notifier.messages();
    assert_eq!(messages.len(), 2);
    assert!(messages[1].text.contains("giving up"));
}

#[tokio::test(start_paused = true)]
async fn already_done_resets_budget_like_success() {
    let h = harness(
        ScriptedAdapter::new([RunPlan::NetworkDown, RunPlan::AlreadyDone]),
        RetryPolicy::new(2, Duration::from_secs(3600)),
    );

    h.orchestrator.run_once(Trigger::Manual).await;

    wait_until!(records(&h.orchestrator)
        .await
        .first()
        .map(|r| r.outcome == Outcome::AlreadyDone)
        .unwrap_or(false));

    let finals = records(&h.orchestrator).await;
    assert_eq!(finals.len(), 1);
    assert_eq!(finals[0].failure_count, 1);
    assert_eq!(h.orchestrator.retry().current_attempt().await, 0);
    assert!(!h.orchestrator.retry().has_pending().await);
}

#[tokio::test(start_paused = true)]
async fn scheduled_tick_defers_to_queued_retry() {
    let h = harness(
        ScriptedAdapter::new([
            RunPlan::NetworkDown,
            RunPlan::Succeed {
                reward: 2.0,
                balance: 12.0,
            },
        ]),
        RetryPolicy::new(2, Duration::from_secs(3600)),
    );

    h.orchestrator.run_once(Trigger::Manual).await;
    assert!(h.orchestrator.retry().has_pending().await);

    // A schedule tick landing while the retry timer is queued must not
    // start a second session.
    h.orchestrator.run_once(Trigger::Scheduled).await;
    assert_eq!(h.adapter.sessions_started(), 1);

    wait_until!(records(&h.orchestrator)
        .await
        .first()
        .map(|r| r.outcome == Outcome::Success)
        .unwrap_or(false));

    assert_eq!(h.adapter.sessions_started(), 2);
}

#[tokio::test(start_paused = true)]
async fn missing_credentials_fail_without_consuming_budget() {
    let h = harness_with_credentials(
        ScriptedAdapter::new([]),
        RetryPolicy::new(3, Duration::from_secs(3600)),
        SiteCredentials::default(),
    );

    h.orchestrator.run_once(Trigger::Manual).await;

    // Configuration problems never improve on their own: no session was
    // opened, no retry queued, budget untouched.
    assert_eq!(h.adapter.sessions_started(), 0);
    assert!(!h.orchestrator.retry().has_pending().await);
    assert_eq!(h.orchestrator.retry().current_attempt().await, 0);

    let finals = records(&h.orchestrator).await;
    assert_eq!(finals.len(), 1);
    assert_eq!(finals[0].outcome, Outcome::Failed);
    assert!(finals[0].message.contains("credentials"));

    // The notification must not claim the budget ran out.
    let messages = h.notifier.messages();
    assert_eq!(messages.len(), 1);
    assert!(!messages[0].text.contains("exhausted"));
}

#[tokio::test(start_paused = true)]
async fn shutdown_drops_queued_retry() {
    let h = harness(
        ScriptedAdapter::new([RunPlan::NetworkDown]),
        RetryPolicy::new(2, Duration::from_secs(3600)),
    );

    h.orchestrator.run_once(Trigger::Manual).await;
    assert!(h.orchestrator.retry().has_pending().await);

    h.orchestrator.shutdown().await;
    assert!(!h.orchestrator.retry().has_pending().await);

    // Long after the would-be retry instant, still only the one session.
    tokio::time::sleep(Duration::from_secs(7200)).await;
    assert_eq!(h.adapter.sessions_started(), 1);
}
