use async_trait::async_trait;
use tracing::info;

use punchcard_domain::notification::{NotificationMessage, Notifier};
use punchcard_domain::EngineError;

/// Fallback channel when no webhook is configured: notifications land in
/// the log stream instead of disappearing.
pub struct LogNotifier;

#[async_trait]
impl Notifier for LogNotifier {
    async fn notify(&self, message: &NotificationMessage) -> Result<(), EngineError> {
        info!(title = %message.title, "📣 {}", message.text.replace('\n', " | "));
        Ok(())
    }
}
