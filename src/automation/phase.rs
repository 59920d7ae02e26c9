// Game flow phase tracking

use serde::{Deserialize, Serialize};
use std::sync::Mutex;
use tokio::time::Instant;

use crate::error::LcuError;
use crate::lcu::RequestGateway;

pub const GAMEFLOW_PHASE_PATH: &str = "/lol-gameflow/v1/gameflow-phase";

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum GamePhase {
  #[default]
  None,
  Lobby,
  Matchmaking,
  CheckedIntoTournament,
  ReadyCheck,
  ChampSelect,
  GameStart,
  FailedToLaunch,
  InProgress,
  Reconnect,
  WaitingForStats,
  PreEndOfGame,
  EndOfGame,
  TerminatedInError,
  /// A phase this build does not know about.
  #[serde(other)]
  Unknown,
}

impl std::fmt::Display for GamePhase {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    write!(f, "{:?}", self)
  }
}

/// Snapshot of what the monitor has observed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PhaseState {
  pub current: GamePhase,
  pub previous: GamePhase,
  /// When `current` was first observed. `None` before the first read.
  pub entered_at: Option<Instant>,
}

/// Reads the current phase on every call. Transitions are recorded, never
/// validated; the client is authoritative.
pub struct PhaseMonitor {
  gateway: RequestGateway,
  state: Mutex<PhaseState>,
}

impl PhaseMonitor {
  pub fn new(gateway: RequestGateway) -> Self {
    Self {
      gateway,
      state: Mutex::new(PhaseState::default()),
    }
  }

  pub async fn get_current_phase(&self) -> Result<GamePhase, LcuError> {
    let phase: GamePhase = self.gateway.get(GAMEFLOW_PHASE_PATH).await?;
    self.observe(phase, Instant::now());
    Ok(phase)
  }

  pub fn state(&self) -> PhaseState {
    self.state.lock().map(|s| *s).unwrap_or_default()
  }

  pub fn reset(&self) {
    if let Ok(mut state) = self.state.lock() {
      *state = PhaseState::default();
    }
  }

  fn observe(&self, phase: GamePhase, now: Instant) {
    let Ok(mut state) = self.state.lock() else {
      return;
    };
    if state.entered_at.is_some() && state.current == phase {
      return;
    }

    tracing::info!(from = %state.current, to = %phase, "game flow phase changed");
    *state = PhaseState {
      current: phase,
      previous: state.current,
      entered_at: Some(now),
    };
  }
}
