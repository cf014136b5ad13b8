use chrono::Utc;
use std::sync::Arc;
use tracing::warn;

use punchcard_domain::site::SiteProfile;
use punchcard_domain::store::{keys, KvStore};
use punchcard_domain::{CheckinHistory, CheckinRecord, EngineError, PluginId};

/// Persists one plugin's check-in history and last-known profile in the
/// key-value store. Merge and pruning rules live in the domain; this
/// service only loads, applies, and writes back.
pub struct HistoryStore {
    store: Arc<dyn KvStore>,
    plugin: PluginId,
    retention_days: u32,
}

impl HistoryStore {
    pub fn new(store: Arc<dyn KvStore>, plugin: PluginId, retention_days: u32) -> Self {
        Self {
            store,
            plugin,
            retention_days,
        }
    }

    /// Insert or merge a record for its day, prune, and persist.
    pub async fn append(&self, record: CheckinRecord) -> Result<(), EngineError> {
        let mut history = self.load().await?;
        history.append(record);
        history.prune(self.retention_days, Utc::now());

        let value = serde_json::to_value(&history)
            .map_err(|e| EngineError::Store(format!("Serialize history failed: {}", e)))?;
        self.store.put(&self.plugin, keys::HISTORY, value).await
    }

    /// Records, newest first.
    pub async fn list(&self) -> Result<Vec<CheckinRecord>, EngineError> {
        Ok(self.load().await?.records().to_vec())
    }

    pub async fn load(&self) -> Result<CheckinHistory, EngineError> {
        match self.store.get(&self.plugin, keys::HISTORY).await? {
            Some(value) => match serde_json::from_value(value) {
                Ok(history) => Ok(history),
                Err(e) => {
                    // A corrupt blob should not wedge the plugin forever.
                    warn!(
                        plugin = %self.plugin,
                        "Stored history is unreadable ({}), starting fresh", e
                    );
                    Ok(CheckinHistory::new())
                }
            },
            None => Ok(CheckinHistory::new()),
        }
    }

    pub async fn load_profile(&self) -> Result<Option<SiteProfile>, EngineError> {
        match self.store.get(&self.plugin, keys::PROFILE).await? {
            Some(value) => Ok(serde_json::from_value(value).ok()),
            None => Ok(None),
        }
    }

    pub async fn save_profile(&self, profile: &SiteProfile) -> Result<(), EngineError> {
        let value = serde_json::to_value(profile)
            .map_err(|e| EngineError::Store(format!("Serialize profile failed: {}", e)))?;
        self.store.put(&self.plugin, keys::PROFILE, value).await
    }
}
