// Domain layer - Pure business logic
// No dependencies on infrastructure or the application layer

pub mod checkin;
pub mod config;
pub mod notification;
pub mod shared;
pub mod site;
pub mod store;

// Re-exports for convenience
pub use checkin::{CheckinHistory, CheckinRecord, CheckinReport, Outcome};
pub use shared::{EngineError, PluginId};
