use anyhow::Result;
use std::path::PathBuf;
use tracing::info;

use punchcard_app::bootstrap::Engine;
use punchcard_app::config::AppConfig;

/// Parsed command line: `punchcard [--config FILE] [--once [NAME]]`.
struct Cli {
    config_path: PathBuf,
    once: bool,
    plugin: Option<String>,
}

fn parse_args() -> Result<Cli> {
    let mut cli = Cli {
        config_path: PathBuf::from("punchcard.json"),
        once: false,
        plugin: None,
    };

    let mut args = std::env::args().skip(1);
    while let Some(arg) = args.next() {
        match arg.as_str() {
            "--config" | "-c" => {
                let value = args
                    .next()
                    .ok_or_else(|| anyhow::anyhow!("--config needs a file path"))?;
                cli.config_path = PathBuf::from(value);
            }
            "--once" => {
                cli.once = true;
                // Optional plugin name restricting the manual run.
                cli.plugin = args.next();
            }
            "--help" | "-h" => {
                println!("Usage: punchcard [--config FILE] [--once [PLUGIN_NAME]]");
                std::process::exit(0);
            }
            other => anyhow::bail!("Unknown argument: {}", other),
        }
    }

    Ok(cli)
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = parse_args()?;
    let config = AppConfig::load(&cli.config_path)?;

    punchcard_infrastructure::logging::init_logger(config.log_dir.as_deref())?;
    info!("Punchcard {} starting", env!("CARGO_PKG_VERSION"));

    let engine = Engine::start(&config).await?;

    if cli.once {
        engine.run_now(cli.plugin.as_deref()).await;
        engine.shutdown().await;
        return Ok(());
    }

    if engine.plugin_count() == 0 {
        anyhow::bail!("No enabled plugins in config; nothing to do");
    }

    tokio::signal::ctrl_c().await?;
    info!("Shutdown signal received");
    engine.shutdown().await;

    Ok(())
}
