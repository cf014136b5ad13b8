// Application layer - wires the domain rules to the infrastructure
// implementations and drives the check-in lifecycle.

pub mod application;
pub mod bootstrap;
pub mod config;

pub use application::services::{
    CheckinOrchestrator, CheckinSession, DailyScheduler, HistoryStore, RetryScheduler, Trigger,
};
