// Settings file handling
//
// Everything lives in a single JSON document. Every field has a default so an
// empty or partial file is valid, and a missing file yields the defaults.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::automation::session::{ActionKind, Position};
use crate::error::LcuError;

/// Preference key used when the local position is unknown or has no entry.
pub const DEFAULT_PREFERENCE_KEY: &str = "default";

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Settings {
  #[serde(default)]
  pub client: ClientSettings,
  #[serde(default)]
  pub automation: AutomationSettings,
}

impl Settings {
  /// Load settings from `path`. A missing file is not an error.
  pub fn load(path: &Path) -> Result<Self, LcuError> {
    if !path.exists() {
      tracing::info!(path = %path.display(), "settings file not found, using defaults");
      return Ok(Self::default());
    }

    let data = std::fs::read_to_string(path)
      .map_err(|e| LcuError::Config(format!("failed to read {}: {}", path.display(), e)))?;
    Self::from_json(&data)
  }

  pub fn from_json(data: &str) -> Result<Self, LcuError> {
    if data.trim().is_empty() {
      return Ok(Self::default());
    }
    let settings: Self = serde_json::from_str(data)
      .map_err(|e| LcuError::Config(format!("invalid settings: {}", e)))?;
    settings.automation.validate()?;
    Ok(settings)
  }
}

// Transport tunables
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClientSettings {
  #[serde(default = "default_min_request_interval_ms")]
  pub min_request_interval_ms: u64,
  #[serde(default = "default_max_retries")]
  pub max_retries: u32,
  #[serde(default = "default_retry_delay_ms")]
  pub retry_delay_ms: u64,
  /// No timeout unless set; the retry bound caps total latency otherwise.
  #[serde(default)]
  pub request_timeout_ms: Option<u64>,
  #[serde(default = "default_request_log_capacity")]
  pub request_log_capacity: usize,
  #[serde(default)]
  pub request_log_path: Option<PathBuf>,
  /// League install directory. Enables lockfile discovery when the process
  /// command line cannot be read.
  #[serde(default)]
  pub league_path: Option<PathBuf>,
  #[serde(default = "default_process_name")]
  pub process_name: String,
}

impl Default for ClientSettings {
  fn default() -> Self {
    Self {
      min_request_interval_ms: default_min_request_interval_ms(),
      max_retries: default_max_retries(),
      retry_delay_ms: default_retry_delay_ms(),
      request_timeout_ms: None,
      request_log_capacity: default_request_log_capacity(),
      request_log_path: None,
      league_path: None,
      process_name: default_process_name(),
    }
  }
}

impl ClientSettings {
  pub fn min_request_interval(&self) -> Duration {
    Duration::from_millis(self.min_request_interval_ms)
  }

  pub fn retry_delay(&self) -> Duration {
    Duration::from_millis(self.retry_delay_ms)
  }

  pub fn request_timeout(&self) -> Option<Duration> {
    self.request_timeout_ms.map(Duration::from_millis)
  }
}

fn default_min_request_interval_ms() -> u64 {
  100
}

fn default_max_retries() -> u32 {
  2
}

fn default_retry_delay_ms() -> u64 {
  500
}

fn default_request_log_capacity() -> usize {
  2000
}

fn default_process_name() -> String {
  "LeagueClientUx".to_string()
}

// Automation preferences. Owned by whoever writes the settings file; the
// automation engine only reads them.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AutomationSettings {
  #[serde(default)]
  pub auto_accept: AutoAcceptSettings,
  #[serde(default)]
  pub auto_ban: AutoBanSettings,
  #[serde(default)]
  pub auto_pick: AutoPickSettings,
  /// Position key (`top`, `jungle`, `middle`, `bottom`, `support`, `default`)
  /// to ordered champion id lists.
  #[serde(default)]
  pub preferences: HashMap<String, ChampionLists>,
  #[serde(default = "default_poll_interval_ms")]
  pub poll_interval_ms: u64,
}

impl Default for AutomationSettings {
  fn default() -> Self {
    Self {
      auto_accept: AutoAcceptSettings::default(),
      auto_ban: AutoBanSettings::default(),
      auto_pick: AutoPickSettings::default(),
      preferences: HashMap::new(),
      poll_interval_ms: default_poll_interval_ms(),
    }
  }
}

impl AutomationSettings {
  pub fn poll_interval(&self) -> Duration {
    Duration::from_millis(self.poll_interval_ms)
  }

  /// Preference lists for `position`, falling back to the `default` entry.
  pub fn preferences_for(&self, position: Option<Position>) -> Option<&ChampionLists> {
    position
      .and_then(|p| self.preferences.get(p.as_str()))
      .or_else(|| self.preferences.get(DEFAULT_PREFERENCE_KEY))
  }

  /// Whether automation is enabled for this action type.
  pub fn is_enabled(&self, kind: ActionKind) -> bool {
    match kind {
      ActionKind::Ban => self.auto_ban.enabled,
      ActionKind::Pick => self.auto_pick.enabled,
      _ => false,
    }
  }

  /// Grace period before an automated action of this type fires. Negative
  /// values mean no wait; values too large for a `Duration` saturate.
  pub fn countdown(&self, kind: ActionKind) -> Duration {
    match kind {
      ActionKind::Ban => countdown_duration(self.auto_ban.countdown_secs),
      ActionKind::Pick => countdown_duration(self.auto_pick.countdown_secs),
      _ => Duration::ZERO,
    }
  }

  /// Reject countdowns that cannot be represented as a wait.
  pub fn validate(&self) -> Result<(), LcuError> {
    for (name, secs) in [
      ("auto_ban.countdown_secs", self.auto_ban.countdown_secs),
      ("auto_pick.countdown_secs", self.auto_pick.countdown_secs),
    ] {
      if !secs.is_finite() || secs < 0.0 || Duration::try_from_secs_f64(secs).is_err() {
        return Err(LcuError::Config(format!("{} out of range: {}", name, secs)));
      }
    }
    Ok(())
  }
}

fn countdown_duration(secs: f64) -> Duration {
  Duration::try_from_secs_f64(secs.max(0.0)).unwrap_or(Duration::MAX)
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AutoAcceptSettings {
  #[serde(default)]
  pub enabled: bool,
  /// Wait this long after the ready check appears before accepting.
  #[serde(default)]
  pub delay_ms: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AutoBanSettings {
  #[serde(default)]
  pub enabled: bool,
  #[serde(default = "default_countdown_secs")]
  pub countdown_secs: f64,
}

impl Default for AutoBanSettings {
  fn default() -> Self {
    Self {
      enabled: false,
      countdown_secs: default_countdown_secs(),
    }
  }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AutoPickSettings {
  #[serde(default)]
  pub enabled: bool,
  #[serde(default = "default_countdown_secs")]
  pub countdown_secs: f64,
  /// Lock the pick in. When false the champion is only hovered.
  #[serde(default = "default_true")]
  pub lock_in: bool,
  /// Hover the top pick during the planning window so teammates see it.
  #[serde(default)]
  pub show_intent: bool,
}

impl Default for AutoPickSettings {
  fn default() -> Self {
    Self {
      enabled: false,
      countdown_secs: default_countdown_secs(),
      lock_in: true,
      show_intent: false,
    }
  }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct ChampionLists {
  #[serde(default)]
  pub ban: Vec<i64>,
  #[serde(default)]
  pub pick: Vec<i64>,
}

impl ChampionLists {
  pub fn for_kind(&self, kind: ActionKind) -> &[i64] {
    match kind {
      ActionKind::Ban => &self.ban,
      ActionKind::Pick => &self.pick,
      _ => &[],
    }
  }
}

fn default_countdown_secs() -> f64 {
  5.0
}

fn default_poll_interval_ms() -> u64 {
  1000
}

fn default_true() -> bool {
  true
}
