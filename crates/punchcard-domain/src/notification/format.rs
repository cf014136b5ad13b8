use chrono::{DateTime, Utc};
use std::time::Duration;

use super::NotificationMessage;
use crate::checkin::{CheckinReport, Outcome};

/// Retry context rendered into failure notifications.
#[derive(Debug, Clone, Copy, Default)]
pub struct RetryInfo {
    pub attempts_used: u32,
    pub max_attempts: u32,
    /// Delay before the next scheduled attempt; `None` when nothing is
    /// queued (budget spent, retries disabled, or the error class does
    /// not retry).
    pub next_delay: Option<Duration>,
    /// Whether this failure consumed retry budget. Configuration errors
    /// do not; they must not be reported as an exhausted budget.
    pub retryable: bool,
}

/// Render a completed run. Pure; the caller decides whether to send it.
pub fn format_report(
    plugin_name: &str,
    report: &CheckinReport,
    now: DateTime<Utc>,
) -> NotificationMessage {
    let title = match report.outcome {
        Outcome::Success => format!("✅ {} check-in succeeded", plugin_name),
        Outcome::AlreadyDone => format!("ℹ️ {} already checked in", plugin_name),
        Outcome::Failed => format!("❌ {} check-in failed", plugin_name),
    };

    let mut lines = vec![
        format!("🕐 Time: {}", now.format("%Y-%m-%d %H:%M:%S")),
        format!("📋 Status: {}", report.message),
    ];
    if let Some(reward) = report.reward {
        lines.push(format!("🎁 Reward: +{}", trim_number(reward)));
    }
    if let Some(balance) = report.balance {
        lines.push(format!("💰 Balance: {}", trim_number(balance)));
    }
    if let Some(streak) = report.streak {
        lines.push(format!("📆 Streak: {} days", streak));
    }

    NotificationMessage::new(title, lines.join("\n"))
}

/// Render a failed run, including how the retry budget stands.
pub fn format_failure(
    plugin_name: &str,
    reason: &str,
    retry: RetryInfo,
    now: DateTime<Utc>,
) -> NotificationMessage {
    let title = format!("❌ {} check-in failed", plugin_name);

    let mut lines = vec![
        format!("🕐 Time: {}", now.format("%Y-%m-%d %H:%M:%S")),
        format!("💬 Reason: {}", reason),
    ];

    match retry.next_delay {
        Some(delay) => {
            let remaining = retry.max_attempts.saturating_sub(retry.attempts_used);
            lines.push(format!(
                "🔄 Retry in {} ({}/{} used, {} left)",
                humanize(delay),
                retry.attempts_used,
                retry.max_attempts,
                remaining
            ));
        }
        None if retry.retryable && retry.max_attempts > 0 => {
            lines.push("🛑 Retry budget exhausted, giving up for today".to_string());
        }
        None => {}
    }

    NotificationMessage::new(title, lines.join("\n"))
}

fn humanize(delay: Duration) -> String {
    let secs = delay.as_secs();
    if secs >= 3600 && secs % 3600 == 0 {
        format!("{}h", secs / 3600)
    } else if secs >= 60 {
        format!("{}m", secs / 60)
    } else {
        format!("{}s", secs)
    }
}

fn trim_number(value: f64) -> String {
    if value.fract() == 0.0 {
        format!("{}", value as i64)
    } else {
        format!("{:.2}", value)
    }
}
