use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use punchcard_domain::config::PluginConfig;

fn default_database_path() -> String {
    "punchcard.db".to_string()
}

/// Operator-supplied configuration file (JSON).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    #[serde(default = "default_database_path")]
    pub database_path: String,
    /// Directory for rotated log files; stdout only when absent.
    #[serde(default)]
    pub log_dir: Option<PathBuf>,
    /// Webhook notifications go here; log-only when absent.
    #[serde(default)]
    pub webhook_url: Option<String>,
    #[serde(default)]
    pub plugins: Vec<PluginConfig>,
}

impl AppConfig {
    pub fn load(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file {}", path.display()))?;
        let config: AppConfig = serde_json::from_str(&text)
            .with_context(|| format!("Failed to parse config file {}", path.display()))?;

        let mut seen = std::collections::HashSet::new();
        for plugin in &config.plugins {
            if !seen.insert(plugin.id.clone()) {
                anyhow::bail!("Duplicate plugin id in config: {}", plugin.id);
            }
        }

        Ok(config)
    }
}
