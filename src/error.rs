// Error handling for League client operations

use crate::automation::session::ActionKind;

/// Every failure the transport and automation layers can report.
///
/// `Clone` so a debounced result can be handed to every waiting caller.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum LcuError {
  /// The client process is not running or its launch arguments could not be read.
  #[error("League client credentials unavailable: {0}")]
  CredentialsUnavailable(String),
  #[error("League client rejected our credentials (HTTP {status})")]
  AuthExpired { status: u16 },
  #[error("League client unreachable: {0}")]
  TransportUnreachable(String),
  /// Transport failures that are not connection failures (timeouts, broken bodies).
  #[error("transport error: {0}")]
  Transport(String),
  #[error("request rejected with HTTP {status}: {body}")]
  RequestRejected { status: u16, body: String },
  #[error("failed to decode response: {0}")]
  Decode(String),
  #[error("no eligible champion for {action}")]
  NoEligibleChoice { action: ActionKind },
  #[error("champ select session unavailable: {0}")]
  SessionUnavailable(String),
  #[error("request gateway is closed")]
  GatewayClosed,
  #[error("configuration error: {0}")]
  Config(String),
}

impl LcuError {
  /// Errors the gateway recovers from by refreshing credentials and retrying.
  pub fn is_recoverable(&self) -> bool {
    matches!(
      self,
      Self::AuthExpired { .. } | Self::TransportUnreachable(_)
    )
  }

  /// Errors that block every operation until the client process comes back.
  pub fn is_fatal(&self) -> bool {
    matches!(self, Self::CredentialsUnavailable(_))
  }

  /// HTTP status carried by the error, if any.
  pub fn status(&self) -> Option<u16> {
    match self {
      Self::AuthExpired { status } | Self::RequestRejected { status, .. } => Some(*status),
      _ => None,
    }
  }
}

impl From<serde_json::Error> for LcuError {
  fn from(err: serde_json::Error) -> Self {
    Self::Decode(err.to_string())
  }
}

impl From<reqwest::Error> for LcuError {
  fn from(err: reqwest::Error) -> Self {
    if err.is_connect() {
      Self::TransportUnreachable(err.to_string())
    } else {
      Self::Transport(err.to_string())
    }
  }
}
