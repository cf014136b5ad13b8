use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::checkin::RetryPolicy;
use crate::shared::PluginId;
use crate::site::SiteCredentials;

/// Site families the engine ships adapters for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SiteKind {
    /// Flarum forums (csrfToken + user PATCH, e.g. pting.club).
    Flarum,
    /// Discuz forums (formhash + dsu_paulsign plugin).
    Discuz,
    /// Plain JSON check-in APIs (GlaDOS-style).
    JsonApi,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SiteConfig {
    pub kind: SiteKind,
    pub base_url: String,
}

/// Daily trigger time, local clock.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct Schedule {
    pub hour: u8,
    pub minute: u8,
}

impl Default for Schedule {
    fn default() -> Self {
        Self { hour: 8, minute: 0 }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct RetryConfig {
    #[serde(default)]
    pub max_attempts: u32,
    #[serde(default = "default_retry_interval_hours")]
    pub interval_hours: u64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: 0,
            interval_hours: default_retry_interval_hours(),
        }
    }
}

impl RetryConfig {
    pub fn policy(&self) -> RetryPolicy {
        RetryPolicy::new(
            self.max_attempts,
            Duration::from_secs(self.interval_hours * 3600),
        )
    }
}

fn default_retry_interval_hours() -> u64 {
    2
}

fn default_history_days() -> u32 {
    30
}

fn default_true() -> bool {
    true
}

/// One configured check-in plugin. Owned by the operator's config file;
/// read-only to the engine.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PluginConfig {
    pub id: PluginId,
    pub name: String,
    pub site: SiteConfig,
    #[serde(default)]
    pub credentials: SiteCredentials,
    #[serde(default = "default_true")]
    pub enabled: bool,
    #[serde(default = "default_true")]
    pub notify: bool,
    #[serde(default)]
    pub schedule: Schedule,
    #[serde(default)]
    pub retry: RetryConfig,
    #[serde(default = "default_history_days")]
    pub history_days: u32,
    #[serde(default)]
    pub proxy: Option<String>,
}
