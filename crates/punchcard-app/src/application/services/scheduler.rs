use chrono::Local;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tokio::time::Duration;
use tracing::{error, info, warn};

use punchcard_domain::config::Schedule;
use punchcard_domain::PluginId;

use super::{CheckinOrchestrator, Trigger};

/// Spawns one timer task per enabled plugin that fires its check-in at a
/// fixed local time every day.
pub struct DailyScheduler {
    tasks: Arc<Mutex<HashMap<PluginId, JoinHandle<()>>>>,
}

impl DailyScheduler {
    pub fn new() -> Self {
        Self {
            tasks: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    /// Register (or replace) the daily task for a plugin.
    pub async fn register(
        &self,
        plugin: PluginId,
        schedule: Schedule,
        orchestrator: Arc<CheckinOrchestrator>,
    ) {
        let name = orchestrator.name().to_string();
        info!(
            "➕ Scheduling '{}' daily at {:02}:{:02}",
            name, schedule.hour, schedule.minute
        );

        let handle = tokio::spawn(async move {
            loop {
                let now = Local::now();
                let target_hour = (schedule.hour as u32).min(23);
                let target_minute = (schedule.minute as u32).min(59);

                if schedule.hour > 23 || schedule.minute > 59 {
                    error!(
                        "⚠️  Invalid schedule time for '{}': {}:{} (clamped to {}:{:02})",
                        name, schedule.hour, schedule.minute, target_hour, target_minute
                    );
                }

                let next_run = match now
                    .date_naive()
                    .and_hms_opt(target_hour, target_minute, 0)
                    .and_then(|dt| dt.and_local_timezone(now.timezone()).single())
                {
                    Some(mut next) => {
                        if next <= now {
                            next += chrono::Duration::days(1);
                        }
                        next
                    }
                    None => {
                        error!(
                            "❌ Cannot compute next run for '{}' at {}:{:02}; task exits",
                            name, target_hour, target_minute
                        );
                        break;
                    }
                };

                let wait = (next_run - now).to_std().unwrap_or(Duration::from_secs(60));
                info!(
                    "Next run for '{}': {} (in {}s)",
                    name,
                    next_run.format("%Y-%m-%d %H:%M:%S"),
                    wait.as_secs()
                );

                tokio::time::sleep(wait).await;

                info!("⏰ Daily trigger for '{}'", name);
                orchestrator.run_once(Trigger::Scheduled).await;
            }
        });

        let mut tasks = self.tasks.lock().await;
        if let Some(old) = tasks.insert(plugin.clone(), handle) {
            warn!("⚠️  Aborting previous task for plugin {}", plugin);
            old.abort();
        }
    }

    /// Drop the task for one plugin (operator disable).
    pub async fn unregister(&self, plugin: &PluginId) {
        if let Some(handle) = self.tasks.lock().await.remove(plugin) {
            handle.abort();
            info!("Task removed for plugin {}", plugin);
        }
    }

    pub async fn task_count(&self) -> usize {
        self.tasks.lock().await.len()
    }

    /// Abort every daily task. Pending retries are the orchestrators'
    /// to cancel.
    pub async fn shutdown(&self) {
        let mut tasks = self.tasks.lock().await;
        for (plugin, handle) in tasks.drain() {
            handle.abort();
            info!("Stopped daily task for {}", plugin);
        }
    }
}

impl Default for DailyScheduler {
    fn default() -> Self {
        Self::new()
    }
}
