use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Identifier for a configured plugin instance.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PluginId(String);

impl PluginId {
    pub fn new() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    pub fn from_string(s: &str) -> Self {
        Self(s.to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for PluginId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl Default for PluginId {
    fn default() -> Self {
        Self::new()
    }
}

/// Engine-wide error taxonomy.
///
/// The variants map directly onto how a failure is handled:
/// `Config` is fatal for the run, `Auth` consumes the outer retry budget,
/// `Protocol` and `Network` are retried within the attempt first, and
/// `Store`/`Notify` are logged without failing the run.
#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Authentication failed: {0}")]
    Auth(String),

    #[error("Unexpected response: {0}")]
    Protocol(String),

    #[error("Network error: {0}")]
    Network(String),

    #[error("Storage error: {0}")]
    Store(String),

    #[error("Notification error: {0}")]
    Notify(String),
}

impl EngineError {
    /// Transient errors re-enter the inner retry loop of a single attempt.
    pub fn is_transient(&self) -> bool {
        matches!(self, EngineError::Network(_) | EngineError::Protocol(_))
    }

    /// Whether a failed run with this error should consume the outer
    /// retry budget. Bad configuration never improves on its own.
    pub fn retries_run(&self) -> bool {
        !matches!(self, EngineError::Config(_))
    }
}
