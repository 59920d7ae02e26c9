// Automation module - phase tracking, champ select, ready check

pub mod champ_select;
pub mod orchestrator;
pub mod phase;
pub mod ready_check;
pub mod session;

#[cfg(test)]
mod tests;

// Re-export public types and functions
pub use champ_select::{
  choose_champion, submit_action, ActionWindow, ChampSelectAutomator, Decision, TickOutcome,
};
pub use orchestrator::{AutomationOrchestrator, AutomationStatus};
pub use phase::{GamePhase, PhaseMonitor, PhaseState, GAMEFLOW_PHASE_PATH};
pub use ready_check::{ReadyCheck, ReadyCheckAcceptor, ReadyCheckOutcome};
pub use session::{
  infer_missing_position, ActionKind, ChampSelectSession, LocalTurn, Position, SessionAction,
  SessionReader, TeamMember,
};
