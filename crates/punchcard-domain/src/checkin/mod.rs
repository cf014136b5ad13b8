mod history;
mod record;
mod retry;

#[cfg(test)]
mod history_test;

pub use history::CheckinHistory;
pub use record::{CheckinRecord, CheckinReport, Outcome};
pub use retry::{RetryPolicy, RetryState};
