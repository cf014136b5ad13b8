use async_trait::async_trait;
use reqwest::Client;

use punchcard_domain::notification::{NotificationMessage, Notifier};
use punchcard_domain::EngineError;

use crate::config::TimeoutConfig;

/// Delivers notifications as a JSON POST to an operator-supplied webhook
/// (Feishu/Slack-style bots, or the host application's inbound hook).
pub struct WebhookNotifier {
    client: Client,
    url: String,
}

impl WebhookNotifier {
    pub fn new(url: impl Into<String>) -> Result<Self, EngineError> {
        let client = Client::builder()
            .timeout(TimeoutConfig::global().http_request)
            .build()
            .map_err(|e| EngineError::Notify(format!("Failed to create webhook client: {}", e)))?;

        Ok(Self {
            client,
            url: url.into(),
        })
    }
}

#[async_trait]
impl Notifier for WebhookNotifier {
    async fn notify(&self, message: &NotificationMessage) -> Result<(), EngineError> {
        let payload = serde_json::json!({
            "title": message.title,
            "text": message.text,
        });

        let response = self
            .client
            .post(&self.url)
            .header("Content-Type", "application/json")
            .json(&payload)
            .send()
            .await
            .map_err(|e| EngineError::Notify(format!("Webhook request failed: {}", e)))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(EngineError::Notify(format!(
                "Webhook failed with status {}: {}",
                status, body
            )));
        }

        // Bot-style endpoints report delivery errors in the body as
        // {"code": <nonzero>, "msg": ...} while still returning 200.
        if let Ok(body) = response.json::<serde_json::Value>().await {
            if let Some(code) = body.get("code").and_then(|c| c.as_i64()) {
                if code != 0 {
                    let msg = body
                        .get("msg")
                        .and_then(|m| m.as_str())
                        .unwrap_or("Unknown error");
                    return Err(EngineError::Notify(format!(
                        "Webhook error code {}: {}",
                        code, msg
                    )));
                }
            }
        }

        Ok(())
    }
}
