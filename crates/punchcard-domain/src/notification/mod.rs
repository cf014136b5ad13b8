mod format;


pub use format::{format_failure, format_report, RetryInfo};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::shared::EngineError;

/// Rendered notification, ready for any delivery channel.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NotificationMessage {
    pub title: String,
    pub text: String,
}

impl NotificationMessage {
    pub fn new(title: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            text: text.into(),
        }
    }
}

/// Delivery channel seam. Failures are the caller's to log; they must
/// never fail a check-in run.
#[async_trait]
pub trait Notifier: Send + Sync {
    async fn notify(&self, message: &NotificationMessage) -> Result<(), EngineError>;
}
