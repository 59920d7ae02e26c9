use anyhow::{Context, Result};
use clap::Parser;
use std::path::PathBuf;
use tokio::sync::watch;
use tracing::info;

use lcu_pilot_lib::{AutomationOrchestrator, AutomationStatus, LcuContext, Settings};

#[derive(Debug, Parser)]
#[command(name = "lcu-pilot", version, about = "Ready-check and champion select automation")]
struct Cli {
  /// Settings file (JSON). Missing file means defaults.
  #[arg(long, env = "LCU_PILOT_CONFIG", default_value = "lcu-pilot.json")]
  config: PathBuf,
}

#[tokio::main]
async fn main() -> Result<()> {
  tracing_subscriber::fmt()
    .with_env_filter(
      tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()),
    )
    .init();

  let cli = Cli::parse();
  let settings = Settings::load(&cli.config)
    .with_context(|| format!("loading settings from {}", cli.config.display()))?;
  info!(
    config = %cli.config.display(),
    auto_accept = settings.automation.auto_accept.enabled,
    auto_ban = settings.automation.auto_ban.enabled,
    auto_pick = settings.automation.auto_pick.enabled,
    "lcu-pilot starting"
  );

  let context = LcuContext::new(&settings.client).context("building client context")?;
  // Sender stays alive for the whole run so the loop always sees settings.
  let (_settings_tx, settings_rx) = watch::channel(settings.automation.clone());
  let mut orchestrator = AutomationOrchestrator::new(context.gateway.clone(), settings_rx);

  let mut status = orchestrator.subscribe_status();
  tokio::spawn(async move {
    while status.changed().await.is_ok() {
      let current = status.borrow_and_update().clone();
      match current {
        AutomationStatus::Phase(phase) => info!(%phase, "client phase"),
        AutomationStatus::Unavailable(reason) => info!(%reason, "client unavailable"),
        AutomationStatus::Stopped => info!("automation stopped"),
      }
    }
  });

  let stop = orchestrator.stop_token();
  tokio::spawn(async move {
    if tokio::signal::ctrl_c().await.is_ok() {
      info!("interrupt received, stopping");
      stop.cancel();
    }
  });

  orchestrator.run().await;
  context.request_log.flush();
  info!(requests = context.request_log.len(), "lcu-pilot exiting");
  Ok(())
}
