// Champion select session model and reader

use serde::{Deserialize, Deserializer, Serialize};
use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

use crate::error::LcuError;
use crate::lcu::{DebounceCache, RequestGateway};

pub const SESSION_PATH: &str = "/lol-champ-select/v1/session";
const SESSION_DEBOUNCE_KEY: &str = "champ-select-session";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActionKind {
  Ban,
  Pick,
  TenBansReveal,
  #[serde(other)]
  Unknown,
}

impl std::fmt::Display for ActionKind {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    match self {
      Self::Ban => write!(f, "ban"),
      Self::Pick => write!(f, "pick"),
      Self::TenBansReveal => write!(f, "ten_bans_reveal"),
      Self::Unknown => write!(f, "unknown"),
    }
  }
}

/// Assigned lane. The client calls support `utility`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Position {
  Top,
  Jungle,
  Middle,
  Bottom,
  Support,
}

impl Position {
  pub const ALL: [Position; 5] = [
    Position::Top,
    Position::Jungle,
    Position::Middle,
    Position::Bottom,
    Position::Support,
  ];

  pub fn parse(value: &str) -> Option<Self> {
    match value.trim().to_lowercase().as_str() {
      "top" => Some(Self::Top),
      "jungle" => Some(Self::Jungle),
      "middle" | "mid" => Some(Self::Middle),
      "bottom" | "bot" => Some(Self::Bottom),
      "utility" | "support" => Some(Self::Support),
      _ => None,
    }
  }

  pub fn as_str(&self) -> &'static str {
    match self {
      Self::Top => "top",
      Self::Jungle => "jungle",
      Self::Middle => "middle",
      Self::Bottom => "bottom",
      Self::Support => "support",
    }
  }
}

impl std::fmt::Display for Position {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    f.write_str(self.as_str())
  }
}

// Blind pick and custom games send "" or "NONE"; treat anything unknown as unassigned.
fn lenient_position<'de, D>(deserializer: D) -> Result<Option<Position>, D::Error>
where
  D: Deserializer<'de>,
{
  let raw: Option<String> = Option::deserialize(deserializer)?;
  Ok(raw.as_deref().and_then(Position::parse))
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionAction {
  pub id: i64,
  pub actor_cell_id: i64,
  #[serde(rename = "type")]
  pub kind: ActionKind,
  #[serde(default)]
  pub champion_id: i64,
  #[serde(default)]
  pub completed: bool,
  #[serde(default)]
  pub is_in_progress: bool,
  #[serde(default)]
  pub is_ally_action: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TeamMember {
  pub cell_id: i64,
  #[serde(default)]
  pub champion_id: i64,
  #[serde(default)]
  pub champion_pick_intent: i64,
  #[serde(default, deserialize_with = "lenient_position")]
  pub assigned_position: Option<Position>,
  #[serde(default)]
  pub summoner_id: i64,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionBans {
  #[serde(default)]
  pub my_team_bans: Vec<i64>,
  #[serde(default)]
  pub their_team_bans: Vec<i64>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionTimer {
  #[serde(default)]
  pub phase: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChampSelectSession {
  #[serde(default)]
  pub actions: Vec<Vec<SessionAction>>,
  pub local_player_cell_id: i64,
  #[serde(default)]
  pub my_team: Vec<TeamMember>,
  #[serde(default)]
  pub their_team: Vec<TeamMember>,
  #[serde(default)]
  pub bans: SessionBans,
  #[serde(default)]
  pub timer: SessionTimer,
}

/// What the local player is expected to do right now.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LocalTurn<'a> {
  /// No in-progress action belongs to the local player.
  Idle,
  /// The local player's in-progress action is neither a ban nor a pick.
  Reveal(&'a SessionAction),
  Pending(&'a SessionAction),
}

impl ChampSelectSession {
  pub fn all_actions(&self) -> impl Iterator<Item = &SessionAction> {
    self.actions.iter().flatten()
  }

  pub fn local_member(&self) -> Option<&TeamMember> {
    self
      .my_team
      .iter()
      .find(|m| m.cell_id == self.local_player_cell_id)
  }

  pub fn local_position(&self) -> Option<Position> {
    self.local_member().and_then(|m| m.assigned_position)
  }

  pub fn local_turn(&self) -> LocalTurn<'_> {
    let pending = self.all_actions().find(|a| {
      a.actor_cell_id == self.local_player_cell_id && a.is_in_progress && !a.completed
    });
    match pending {
      None => LocalTurn::Idle,
      Some(action) if matches!(action.kind, ActionKind::Ban | ActionKind::Pick) => {
        LocalTurn::Pending(action)
      }
      Some(action) => LocalTurn::Reveal(action),
    }
  }

  /// No action has started yet: the planning window before the first turn.
  pub fn is_planning(&self) -> bool {
    !self.actions.is_empty() && self.all_actions().all(|a| !a.is_in_progress)
  }

  /// The local player's not-yet-completed pick action, in progress or not.
  pub fn local_pick_action(&self) -> Option<&SessionAction> {
    self.all_actions().find(|a| {
      a.actor_cell_id == self.local_player_cell_id && a.kind == ActionKind::Pick && !a.completed
    })
  }

  /// Champions banned by either team.
  pub fn banned_champions(&self) -> HashSet<i64> {
    self
      .all_actions()
      .filter(|a| a.kind == ActionKind::Ban && a.completed)
      .map(|a| a.champion_id)
      .chain(self.bans.my_team_bans.iter().copied())
      .chain(self.bans.their_team_bans.iter().copied())
      .filter(|id| *id > 0)
      .collect()
  }

  /// Champions locked in by anyone.
  pub fn picked_champions(&self) -> HashSet<i64> {
    self
      .all_actions()
      .filter(|a| a.kind == ActionKind::Pick && a.completed && a.champion_id > 0)
      .map(|a| a.champion_id)
      .collect()
  }

  /// Champions a teammate other than the local player intends to play or is
  /// hovering. The opposing team is not considered.
  pub fn teammate_intents(&self) -> HashSet<i64> {
    let ally_cells: HashSet<i64> = self
      .my_team
      .iter()
      .map(|m| m.cell_id)
      .filter(|cell| *cell != self.local_player_cell_id)
      .collect();

    let intents = self
      .my_team
      .iter()
      .filter(|m| ally_cells.contains(&m.cell_id))
      .map(|m| m.champion_pick_intent);
    let hovers = self
      .all_actions()
      .filter(|a| a.kind == ActionKind::Pick && ally_cells.contains(&a.actor_cell_id))
      .map(|a| a.champion_id);

    intents.chain(hovers).filter(|id| *id > 0).collect()
  }

  /// Fill the assigned positions the client left out.
  pub fn infer_missing_positions(&mut self) {
    infer_missing_position(&mut self.my_team);
    infer_missing_position(&mut self.their_team);
  }
}

/// On a full five-member roster with four distinct known positions, assign the
/// fifth position to the remaining member.
pub fn infer_missing_position(team: &mut [TeamMember]) {
  if team.len() != Position::ALL.len() {
    return;
  }

  let known: HashSet<Position> = team.iter().filter_map(|m| m.assigned_position).collect();
  let missing: Vec<usize> = team
    .iter()
    .enumerate()
    .filter(|(_, m)| m.assigned_position.is_none())
    .map(|(i, _)| i)
    .collect();

  if missing.len() != 1 || known.len() != Position::ALL.len() - 1 {
    return;
  }

  if let Some(position) = Position::ALL.iter().find(|p| !known.contains(p)) {
    let member = &mut team[missing[0]];
    tracing::debug!(cell_id = member.cell_id, position = %position, "inferred assigned position");
    member.assigned_position = Some(*position);
  }
}

/// Reads the champ select session. Concurrent reads inside the debounce window
/// share one request.
#[derive(Clone)]
pub struct SessionReader {
  gateway: RequestGateway,
  cache: Arc<DebounceCache<ChampSelectSession>>,
  window: Duration,
}

impl SessionReader {
  pub const DEFAULT_WINDOW: Duration = Duration::from_millis(200);

  pub fn new(gateway: RequestGateway) -> Self {
    Self::with_window(gateway, Self::DEFAULT_WINDOW)
  }

  pub fn with_window(gateway: RequestGateway, window: Duration) -> Self {
    Self {
      gateway,
      cache: Arc::new(DebounceCache::new()),
      window,
    }
  }

  pub async fn read(&self) -> Result<ChampSelectSession, LcuError> {
    let gateway = self.gateway.clone();
    self
      .cache
      .debounce(SESSION_DEBOUNCE_KEY, self.window, move || async move {
        let mut session: ChampSelectSession = gateway.get(SESSION_PATH).await?;
        session.infer_missing_positions();
        Ok(session)
      })
      .await
  }

  /// Drop any cached session so the next read hits the client.
  pub fn invalidate(&self) {
    self.cache.clear();
  }
}
