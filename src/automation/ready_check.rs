// Match found: accept the ready check

use serde::Deserialize;
use std::time::Duration;
use tokio::time::Instant;

use crate::config::AutoAcceptSettings;
use crate::error::LcuError;
use crate::lcu::RequestGateway;

pub const READY_CHECK_PATH: &str = "/lol-matchmaking/v1/ready-check";
pub const READY_CHECK_ACCEPT_PATH: &str = "/lol-matchmaking/v1/ready-check/accept";

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReadyCheck {
  #[serde(default)]
  pub state: String,
  /// `None` until the player answers, then `Accepted` or `Declined`.
  #[serde(default)]
  pub player_response: String,
  #[serde(default)]
  pub timer: f64,
}

impl ReadyCheck {
  pub fn is_unanswered(&self) -> bool {
    self.player_response.is_empty() || self.player_response == "None"
  }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReadyCheckOutcome {
  Disabled,
  Waiting(Duration),
  Accepted,
  /// The player already answered this one, or it was accepted earlier.
  AlreadyAnswered,
}

/// Accepts at most once per ready check. Reset when the phase moves on.
pub struct ReadyCheckAcceptor {
  gateway: RequestGateway,
  first_seen: Option<Instant>,
  accepted: bool,
}

impl ReadyCheckAcceptor {
  pub fn new(gateway: RequestGateway) -> Self {
    Self {
      gateway,
      first_seen: None,
      accepted: false,
    }
  }

  pub fn has_accepted(&self) -> bool {
    self.accepted
  }

  pub fn reset(&mut self) {
    self.first_seen = None;
    self.accepted = false;
  }

  /// `entered_at` is when the ready-check phase was first observed; the
  /// configured delay counts from there.
  pub async fn tick(
    &mut self,
    settings: &AutoAcceptSettings,
    entered_at: Option<Instant>,
  ) -> Result<ReadyCheckOutcome, LcuError> {
    if !settings.enabled {
      return Ok(ReadyCheckOutcome::Disabled);
    }
    if self.accepted {
      return Ok(ReadyCheckOutcome::AlreadyAnswered);
    }

    let now = Instant::now();
    let first_seen = *self.first_seen.get_or_insert(entered_at.unwrap_or(now));
    let delay = Duration::from_millis(settings.delay_ms);
    let remaining = delay.saturating_sub(now.saturating_duration_since(first_seen));
    if !remaining.is_zero() {
      return Ok(ReadyCheckOutcome::Waiting(remaining));
    }

    let check: ReadyCheck = self.gateway.get(READY_CHECK_PATH).await?;
    if !check.is_unanswered() {
      tracing::debug!(response = %check.player_response, "ready check already answered");
      self.accepted = true;
      return Ok(ReadyCheckOutcome::AlreadyAnswered);
    }

    // Only a successful accept counts; a failed one is tried again next tick.
    self
      .gateway
      .post::<serde_json::Value>(READY_CHECK_ACCEPT_PATH, None)
      .await?;
    self.accepted = true;
    tracing::info!("ready check accepted");
    Ok(ReadyCheckOutcome::Accepted)
  }
}
