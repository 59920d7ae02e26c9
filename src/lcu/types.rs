// Request/response types shared by the gateway and transports

use reqwest::Method;
use serde::Serialize;

/// Which of the client's two APIs a request targets.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Channel {
  /// The League client API (`--app-port` / `--remoting-auth-token`).
  #[default]
  LeagueClient,
  /// The Riot client API (`--riotclient-app-port` / `--riotclient-auth-token`).
  RiotClient,
}

impl std::fmt::Display for Channel {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    match self {
      Self::LeagueClient => write!(f, "league-client"),
      Self::RiotClient => write!(f, "riot-client"),
    }
  }
}

/// Per-call options for `RequestGateway::execute`.
#[derive(Debug, Clone, Default)]
pub struct RequestOptions {
  pub body: Option<serde_json::Value>,
  pub query: Vec<(String, String)>,
  pub channel: Channel,
}

impl RequestOptions {
  pub fn json(mut self, body: serde_json::Value) -> Self {
    self.body = Some(body);
    self
  }

  pub fn query(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
    self.query.push((key.into(), value.into()));
    self
  }

  pub fn riot_client(mut self) -> Self {
    self.channel = Channel::RiotClient;
    self
  }
}

/// One logical request as it travels through the queue.
#[derive(Debug, Clone)]
pub struct LcuRequest {
  pub method: Method,
  pub path: String,
  pub body: Option<serde_json::Value>,
  pub query: Vec<(String, String)>,
  pub channel: Channel,
}

impl LcuRequest {
  pub fn new(method: Method, path: impl Into<String>, options: RequestOptions) -> Self {
    Self {
      method,
      path: path.into(),
      body: options.body,
      query: options.query,
      channel: options.channel,
    }
  }
}

/// Status and raw body of a completed call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawResponse {
  pub status: u16,
  pub body: Vec<u8>,
}

impl RawResponse {
  pub fn is_success(&self) -> bool {
    (200..300).contains(&self.status)
  }

  pub fn body_text(&self) -> String {
    String::from_utf8_lossy(&self.body).into_owned()
  }
}
