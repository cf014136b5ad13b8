use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use super::record::CheckinRecord;

/// Bounded, day-keyed log of check-in attempts.
///
/// Records are held newest-first. Persistence lives elsewhere; this type
/// only owns the merge and pruning rules.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CheckinHistory {
    records: Vec<CheckinRecord>,
}

impl CheckinHistory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Records, newest first.
    pub fn records(&self) -> &[CheckinRecord] {
        &self.records
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// Latest record for the given calendar day, if any.
    pub fn latest_for_day(&self, day: chrono::NaiveDate) -> Option<&CheckinRecord> {
        self.records.iter().find(|r| r.day() == day)
    }

    /// Whether the day already holds a terminal (Success/AlreadyDone) record.
    pub fn day_is_done(&self, day: chrono::NaiveDate) -> bool {
        self.latest_for_day(day)
            .map(|r| r.outcome.is_terminal())
            .unwrap_or(false)
    }

    /// Insert or merge a record for the record's own day.
    ///
    /// Merge rules:
    /// - failure over failure: accumulate `failure_count` on the existing
    ///   entry and refresh its timestamp/message, keeping one entry per day
    /// - terminal over failure: replace the entry, carrying the accumulated
    ///   `failure_count` forward for display
    /// - terminal over terminal, or first record of the day: plain insert
    pub fn append(&mut self, record: CheckinRecord) {
        let day = record.day();
        let existing = self.records.iter().position(|r| r.day() == day);

        match existing {
            Some(idx) => {
                let last = &mut self.records[idx];
                let last_terminal = last.outcome.is_terminal();
                let new_terminal = record.outcome.is_terminal();

                if !new_terminal && !last_terminal {
                    last.failure_count += record.failure_count.max(1);
                    last.timestamp = record.timestamp;
                    last.message = record.message;
                } else if new_terminal && !last_terminal {
                    let carried = last.failure_count;
                    let mut replacement = record;
                    replacement.failure_count = carried;
                    self.records[idx] = replacement;
                } else {
                    self.records.insert(0, record);
                }
            }
            None => self.records.insert(0, record),
        }
    }

    /// Drop records older than the retention window.
    pub fn prune(&mut self, retention_days: u32, now: DateTime<Utc>) {
        let cutoff = now - Duration::days(retention_days as i64);
        self.records.retain(|r| r.timestamp >= cutoff);
    }
}
