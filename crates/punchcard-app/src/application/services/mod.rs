mod checkin_session;
mod history_store;
mod orchestrator;
mod retry_scheduler;
mod scheduler;

pub use checkin_session::CheckinSession;
pub use history_store::HistoryStore;
pub use orchestrator::{CheckinOrchestrator, Trigger};
pub use retry_scheduler::RetryScheduler;
pub use scheduler::DailyScheduler;
