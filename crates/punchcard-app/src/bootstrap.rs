use anyhow::{Context, Result};
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{info, warn};

use punchcard_domain::notification::Notifier;
use punchcard_domain::store::KvStore;
use punchcard_domain::PluginId;
use punchcard_infrastructure::notification::{LogNotifier, WebhookNotifier};
use punchcard_infrastructure::persistence::{Database, SqliteKvStore};
use punchcard_infrastructure::sites::build_adapter;

use crate::application::services::{
    CheckinOrchestrator, CheckinSession, DailyScheduler, HistoryStore, RetryScheduler, Trigger,
};
use crate::config::AppConfig;

/// Running engine: one orchestrator per enabled plugin plus the shared
/// daily scheduler.
pub struct Engine {
    scheduler: DailyScheduler,
    orchestrators: HashMap<PluginId, Arc<CheckinOrchestrator>>,
}

impl Engine {
    /// Wire everything from the config file: database, notifier, one
    /// adapter/session/orchestrator per enabled plugin, and the daily
    /// timer tasks.
    pub async fn start(config: &AppConfig) -> Result<Self> {
        let database = Database::new(&config.database_path)
            .await
            .context("Failed to open database")?;
        let store: Arc<dyn KvStore> =
            Arc::new(SqliteKvStore::new(Arc::new(database.pool().clone())));

        let notifier: Arc<dyn Notifier> = match &config.webhook_url {
            Some(url) if !url.is_empty() => {
                Arc::new(WebhookNotifier::new(url).context("Failed to build webhook notifier")?)
            }
            _ => Arc::new(LogNotifier),
        };

        let scheduler = DailyScheduler::new();
        let mut orchestrators = HashMap::new();

        for plugin in &config.plugins {
            if !plugin.enabled {
                info!("Plugin '{}' is disabled, skipping", plugin.name);
                continue;
            }

            let adapter = match build_adapter(&plugin.name, &plugin.site, plugin.proxy.clone()) {
                Ok(adapter) => adapter,
                Err(e) => {
                    // A broken plugin entry must not take the rest down.
                    warn!("Plugin '{}' failed to initialize: {}", plugin.name, e);
                    continue;
                }
            };

            let session = CheckinSession::new(adapter, plugin.credentials.clone());
            let history =
                HistoryStore::new(Arc::clone(&store), plugin.id.clone(), plugin.history_days);
            let retry = RetryScheduler::new(plugin.retry.policy());

            let orchestrator = Arc::new(CheckinOrchestrator::new(
                plugin.name.clone(),
                session,
                history,
                retry,
                Arc::clone(&notifier),
                plugin.notify,
            ));

            scheduler
                .register(plugin.id.clone(), plugin.schedule, Arc::clone(&orchestrator))
                .await;
            orchestrators.insert(plugin.id.clone(), orchestrator);
        }

        info!(
            "✅ Engine started with {} active plugin(s)",
            orchestrators.len()
        );

        Ok(Self {
            scheduler,
            orchestrators,
        })
    }

    /// Manual "run now" for one plugin, or for every plugin when `name`
    /// is absent.
    pub async fn run_now(&self, name: Option<&str>) {
        for orchestrator in self.orchestrators.values() {
            if name.map_or(true, |n| n == orchestrator.name()) {
                orchestrator.run_once(Trigger::Manual).await;
            }
        }
    }

    pub fn plugin_count(&self) -> usize {
        self.orchestrators.len()
    }

    /// Stop all timer tasks and cancel pending retries.
    pub async fn shutdown(&self) {
        self.scheduler.shutdown().await;
        for orchestrator in self.orchestrators.values() {
            orchestrator.shutdown().await;
        }
        info!("Engine stopped");
    }
}
