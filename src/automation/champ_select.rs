// Champion select automation
//
// Re-evaluated on every poll tick. The local player's pending ban/pick turn
// opens an action window; once the configured countdown has elapsed the
// automator submits at most one action for that window.

use serde_json::json;
use std::collections::HashSet;
use std::time::Duration;
use tokio::time::Instant;

use super::session::{ActionKind, ChampSelectSession, LocalTurn, SessionReader};
use crate::config::AutomationSettings;
use crate::error::LcuError;
use crate::lcu::RequestGateway;

const PICKABLE_PATH: &str = "/lol-champ-select/v1/pickable-champion-ids";
const BANNABLE_PATH: &str = "/lol-champ-select/v1/bannable-champion-ids";

/// The local player's current turn as last observed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ActionWindow {
  pub action_id: i64,
  pub kind: ActionKind,
  pub started_at: Instant,
  pub executed: bool,
}

impl ActionWindow {
  pub fn remaining(&self, countdown: Duration, now: Instant) -> Duration {
    countdown.saturating_sub(now.saturating_duration_since(self.started_at))
  }
}

/// What `plan` wants done this tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
  /// Nothing to do.
  Idle,
  /// Automation for this action type is turned off.
  Disabled(ActionKind),
  /// This window already produced its action.
  AlreadyActed(ActionKind),
  /// Countdown still running.
  Waiting { kind: ActionKind, remaining: Duration },
  /// Countdown elapsed: choose and submit now.
  Act {
    action_id: i64,
    kind: ActionKind,
    completed: bool,
  },
  /// Planning window: hover the top pick without locking in.
  ShowIntent { action_id: i64 },
}

/// Result of one tick, for callers and tests.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TickOutcome {
  Idle,
  Disabled(ActionKind),
  AlreadyActed(ActionKind),
  Waiting { kind: ActionKind, remaining: Duration },
  Submitted {
    kind: ActionKind,
    champion_id: i64,
    completed: bool,
  },
  IntentShown { champion_id: i64 },
}

pub struct ChampSelectAutomator {
  reader: SessionReader,
  gateway: RequestGateway,
  window: Option<ActionWindow>,
  intent_shown: bool,
}

impl ChampSelectAutomator {
  pub fn new(gateway: RequestGateway) -> Self {
    Self::with_reader(SessionReader::new(gateway.clone()), gateway)
  }

  pub fn with_reader(reader: SessionReader, gateway: RequestGateway) -> Self {
    Self {
      reader,
      gateway,
      window: None,
      intent_shown: false,
    }
  }

  pub fn window(&self) -> Option<ActionWindow> {
    self.window
  }

  /// Forget all per-session state. Called when leaving champ select.
  pub fn reset(&mut self) {
    self.window = None;
    self.intent_shown = false;
    self.reader.invalidate();
  }

  /// One evaluation cycle.
  pub async fn tick(&mut self, settings: &AutomationSettings) -> Result<TickOutcome, LcuError> {
    let session = self
      .reader
      .read()
      .await
      .map_err(|e| LcuError::SessionUnavailable(e.to_string()))?;

    match self.plan(&session, settings, Instant::now()) {
      Decision::Idle => Ok(TickOutcome::Idle),
      Decision::Disabled(kind) => Ok(TickOutcome::Disabled(kind)),
      Decision::AlreadyActed(kind) => Ok(TickOutcome::AlreadyActed(kind)),
      Decision::Waiting { kind, remaining } => {
        tracing::trace!(%kind, remaining_ms = remaining.as_millis() as u64, "waiting for countdown");
        Ok(TickOutcome::Waiting { kind, remaining })
      }
      Decision::ShowIntent { action_id } => {
        let allowed = self.allowed_champions(ActionKind::Pick).await;
        let Some(champion_id) =
          choose_champion(&session, settings, ActionKind::Pick, allowed.as_ref())
        else {
          return Ok(TickOutcome::Idle);
        };

        // Best-effort: a failed hover is not worth retrying.
        match self.submit(action_id, champion_id, false).await {
          Ok(()) => tracing::info!(champion_id, "showing pick intent"),
          Err(e) => tracing::warn!(champion_id, error = %e, "failed to show pick intent"),
        }
        Ok(TickOutcome::IntentShown { champion_id })
      }
      Decision::Act {
        action_id,
        kind,
        completed,
      } => {
        let allowed = self.allowed_champions(kind).await;
        let Some(champion_id) = choose_champion(&session, settings, kind, allowed.as_ref()) else {
          tracing::warn!(
            %kind,
            position = ?session.local_position(),
            "no eligible champion in preference list, leaving the turn to the player"
          );
          return Err(LcuError::NoEligibleChoice { action: kind });
        };

        tracing::info!(%kind, champion_id, action_id, completed, "submitting automated action");
        self.submit(action_id, champion_id, completed).await?;
        Ok(TickOutcome::Submitted {
          kind,
          champion_id,
          completed,
        })
      }
    }
  }

  /// Advance the action window state machine. Pure apart from `self`.
  pub fn plan(
    &mut self,
    session: &ChampSelectSession,
    settings: &AutomationSettings,
    now: Instant,
  ) -> Decision {
    let action = match session.local_turn() {
      LocalTurn::Pending(action) => action,
      LocalTurn::Idle | LocalTurn::Reveal(_) => {
        self.window = None;
        return self.plan_intent(session, settings);
      }
    };

    let window = match self.window {
      Some(w) if w.action_id == action.id && w.kind == action.kind => w,
      _ => {
        tracing::debug!(kind = %action.kind, action_id = action.id, "action window opened");
        let w = ActionWindow {
          action_id: action.id,
          kind: action.kind,
          started_at: now,
          executed: false,
        };
        self.window = Some(w);
        w
      }
    };

    if !settings.is_enabled(action.kind) {
      return Decision::Disabled(action.kind);
    }
    if window.executed {
      return Decision::AlreadyActed(action.kind);
    }

    let remaining = window.remaining(settings.countdown(action.kind), now);
    if !remaining.is_zero() {
      return Decision::Waiting {
        kind: action.kind,
        remaining,
      };
    }

    // Mark before submitting: a failed submission is not retried in this window.
    self.window = Some(ActionWindow {
      executed: true,
      ..window
    });
    Decision::Act {
      action_id: action.id,
      kind: action.kind,
      completed: action.kind == ActionKind::Ban || settings.auto_pick.lock_in,
    }
  }

  fn plan_intent(&mut self, session: &ChampSelectSession, settings: &AutomationSettings) -> Decision {
    if self.intent_shown
      || !settings.auto_pick.enabled
      || !settings.auto_pick.show_intent
      || !session.is_planning()
    {
      return Decision::Idle;
    }
    if session
      .local_member()
      .map_or(false, |m| m.champion_pick_intent > 0 || m.champion_id > 0)
    {
      return Decision::Idle;
    }
    match session.local_pick_action() {
      Some(action) => {
        self.intent_shown = true;
        Decision::ShowIntent {
          action_id: action.id,
        }
      }
      None => Decision::Idle,
    }
  }

  /// The client's list of champions currently allowed for `kind`. Best-effort.
  async fn allowed_champions(&self, kind: ActionKind) -> Option<HashSet<i64>> {
    let path = match kind {
      ActionKind::Ban => BANNABLE_PATH,
      ActionKind::Pick => PICKABLE_PATH,
      _ => return None,
    };
    match self.gateway.get::<Vec<i64>>(path).await {
      Ok(ids) if !ids.is_empty() => Some(ids.into_iter().collect()),
      Ok(_) => None,
      Err(e) => {
        tracing::debug!(%kind, error = %e, "could not read allowed champions");
        None
      }
    }
  }

  async fn submit(&self, action_id: i64, champion_id: i64, completed: bool) -> Result<(), LcuError> {
    submit_action(&self.gateway, action_id, champion_id, completed).await
  }
}

/// Hover (`completed = false`) or lock in (`true`) `champion_id` for an action.
pub async fn submit_action(
  gateway: &RequestGateway,
  action_id: i64,
  champion_id: i64,
  completed: bool,
) -> Result<(), LcuError> {
  gateway
    .patch::<serde_json::Value>(
      &format!("/lol-champ-select/v1/session/actions/{}", action_id),
      json!({ "championId": champion_id, "completed": completed }),
    )
    .await
    .map(|_| ())
}

/// First preference for the local position that is still available.
///
/// Picks skip champions already picked or banned. Bans skip champions already
/// banned, already picked, or wanted by a teammate.
pub fn choose_champion(
  session: &ChampSelectSession,
  settings: &AutomationSettings,
  kind: ActionKind,
  allowed: Option<&HashSet<i64>>,
) -> Option<i64> {
  let lists = settings.preferences_for(session.local_position())?;

  let banned = session.banned_champions();
  let picked = session.picked_champions();
  let teammate_intents = match kind {
    ActionKind::Ban => session.teammate_intents(),
    _ => HashSet::new(),
  };

  lists.for_kind(kind).iter().copied().find(|id| {
    *id > 0
      && !banned.contains(id)
      && !picked.contains(id)
      && !teammate_intents.contains(id)
      && allowed.map_or(true, |set| set.contains(id))
  })
}
