mod log_notifier;
mod webhook;

pub use log_notifier::LogNotifier;
pub use webhook::WebhookNotifier;
