use chrono::{DateTime, Local, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

/// Tri-state result of a check-in attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Outcome {
    Success,
    AlreadyDone,
    Failed,
}

impl Outcome {
    /// A terminal outcome means the day is done; no retry follows.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Outcome::Success | Outcome::AlreadyDone)
    }
}

impl std::fmt::Display for Outcome {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Outcome::Success => write!(f, "checked in"),
            Outcome::AlreadyDone => write!(f, "already checked in"),
            Outcome::Failed => write!(f, "check-in failed"),
        }
    }
}

/// Interpreted result of one check-in run, as produced by a site adapter.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CheckinReport {
    pub outcome: Outcome,
    pub message: String,
    /// Reward gained by this check-in, when the site reports one.
    pub reward: Option<f64>,
    /// Running balance/points after the check-in.
    pub balance: Option<f64>,
    /// Consecutive check-in days, when the site tracks a streak.
    pub streak: Option<u32>,
}

impl CheckinReport {
    pub fn new(outcome: Outcome, message: impl Into<String>) -> Self {
        Self {
            outcome,
            message: message.into(),
            reward: None,
            balance: None,
            streak: None,
        }
    }

    pub fn with_numbers(
        mut self,
        reward: Option<f64>,
        balance: Option<f64>,
        streak: Option<u32>,
    ) -> Self {
        self.reward = reward;
        self.balance = balance;
        self.streak = streak;
        self
    }
}

/// One history entry, keyed by calendar day.
///
/// Immutable once written, except for the same-day merge performed by
/// `CheckinHistory::append`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CheckinRecord {
    pub timestamp: DateTime<Utc>,
    pub outcome: Outcome,
    pub message: String,
    pub reward: Option<f64>,
    pub balance: Option<f64>,
    pub streak: Option<u32>,
    /// Accumulated failures for this day. Carried forward onto the
    /// terminal record so the display can show how bumpy the day was.
    #[serde(default)]
    pub failure_count: u32,
}

impl CheckinRecord {
    pub fn from_report(report: &CheckinReport, timestamp: DateTime<Utc>) -> Self {
        Self {
            timestamp,
            outcome: report.outcome,
            message: report.message.clone(),
            reward: report.reward,
            balance: report.balance,
            streak: report.streak,
            failure_count: 0,
        }
    }

    pub fn failure(message: impl Into<String>, timestamp: DateTime<Utc>) -> Self {
        Self {
            timestamp,
            outcome: Outcome::Failed,
            message: message.into(),
            reward: None,
            balance: None,
            streak: None,
            failure_count: 1,
        }
    }

    /// Calendar day of the record on the operator's local clock. The
    /// daily scheduler fires at a local HH:MM, so the done-for-today
    /// check has to bucket by the same calendar or early-morning runs
    /// east of UTC would land on yesterday's key.
    pub fn day(&self) -> NaiveDate {
        self.timestamp.with_timezone(&Local).date_naive()
    }
}
