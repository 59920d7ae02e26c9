// Polling loop that drives the automation helpers by game flow phase

use tokio::sync::watch;
use tokio_util::sync::CancellationToken;

use super::champ_select::{ChampSelectAutomator, TickOutcome};
use super::phase::{GamePhase, PhaseMonitor, PhaseState};
use super::ready_check::ReadyCheckAcceptor;
use crate::config::AutomationSettings;
use crate::error::LcuError;
use crate::lcu::RequestGateway;

/// Published after every cycle.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum AutomationStatus {
  #[default]
  Stopped,
  /// The client could not be reached or queried.
  Unavailable(String),
  Phase(GamePhase),
}

pub struct AutomationOrchestrator {
  phase: PhaseMonitor,
  champ_select: ChampSelectAutomator,
  ready_check: ReadyCheckAcceptor,
  settings: watch::Receiver<AutomationSettings>,
  status: watch::Sender<AutomationStatus>,
  cancel: CancellationToken,
  last_phase: Option<GamePhase>,
}

impl AutomationOrchestrator {
  pub fn new(gateway: RequestGateway, settings: watch::Receiver<AutomationSettings>) -> Self {
    let (status, _) = watch::channel(AutomationStatus::Stopped);
    Self {
      phase: PhaseMonitor::new(gateway.clone()),
      champ_select: ChampSelectAutomator::new(gateway.clone()),
      ready_check: ReadyCheckAcceptor::new(gateway),
      settings,
      status,
      cancel: CancellationToken::new(),
      last_phase: None,
    }
  }

  /// Cancelling this token ends `run` after the current cycle.
  pub fn stop_token(&self) -> CancellationToken {
    self.cancel.clone()
  }

  pub fn subscribe_status(&self) -> watch::Receiver<AutomationStatus> {
    self.status.subscribe()
  }

  pub fn phase_state(&self) -> PhaseState {
    self.phase.state()
  }

  pub async fn run(&mut self) {
    tracing::info!("automation loop started");

    while !self.cancel.is_cancelled() {
      self.cycle().await;

      let interval = self.settings.borrow().poll_interval();
      tokio::select! {
        _ = self.cancel.cancelled() => break,
        _ = tokio::time::sleep(interval) => {}
      }
    }

    self.reset();
    tracing::info!("automation loop stopped");
  }

  /// One polling cycle. Errors are logged and reflected in the status, never
  /// returned.
  pub async fn cycle(&mut self) {
    let settings = self.settings.borrow().clone();

    let phase = match self.phase.get_current_phase().await {
      Ok(phase) => phase,
      Err(e) => {
        if e.is_fatal() {
          tracing::debug!(error = %e, "client not available");
        } else {
          tracing::warn!(error = %e, "failed to read game flow phase");
        }
        // A failed read is not a phase change; per-phase state survives it.
        self.publish(AutomationStatus::Unavailable(e.to_string()));
        return;
      }
    };

    if self.last_phase != Some(phase) {
      self.reset_helpers();
      self.last_phase = Some(phase);
    }
    self.publish(AutomationStatus::Phase(phase));

    match phase {
      GamePhase::ReadyCheck => {
        let entered_at = self.phase.state().entered_at;
        if let Err(e) = self.ready_check.tick(&settings.auto_accept, entered_at).await {
          tracing::warn!(error = %e, "ready check automation failed");
        }
      }
      GamePhase::ChampSelect => match self.champ_select.tick(&settings).await {
        Ok(TickOutcome::Submitted {
          kind, champion_id, ..
        }) => {
          tracing::debug!(%kind, champion_id, "champ select action done");
        }
        Ok(_) => {}
        // Already reported when the window was evaluated
        Err(LcuError::NoEligibleChoice { .. }) => {}
        Err(e) => tracing::warn!(error = %e, "champ select automation failed"),
      },
      _ => {}
    }
  }

  /// Clear all transient state and publish `Stopped`.
  pub fn reset(&mut self) {
    self.reset_helpers();
    self.phase.reset();
    self.last_phase = None;
    self.publish(AutomationStatus::Stopped);
  }

  fn reset_helpers(&mut self) {
    self.champ_select.reset();
    self.ready_check.reset();
  }

  fn publish(&self, status: AutomationStatus) {
    self.status.send_if_modified(|current| {
      if *current == status {
        return false;
      }
      *current = status;
      true
    });
  }
}
