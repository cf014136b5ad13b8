use async_trait::async_trait;

use crate::shared::{EngineError, PluginId};

/// Per-plugin key-value persistence, mirroring the host's `get`/`set` API.
///
/// Values are opaque JSON; the engine keeps its history under a
/// `history` key and the last-known profile under `profile`.
#[async_trait]
pub trait KvStore: Send + Sync {
    async fn get(
        &self,
        plugin: &PluginId,
        key: &str,
    ) -> Result<Option<serde_json::Value>, EngineError>;

    async fn put(
        &self,
        plugin: &PluginId,
        key: &str,
        value: serde_json::Value,
    ) -> Result<(), EngineError>;

    async fn remove(&self, plugin: &PluginId, key: &str) -> Result<(), EngineError>;
}

/// Stable keys used by the engine.
pub mod keys {
    pub const HISTORY: &str = "history";
    pub const PROFILE: &str = "profile";
}
