// Credential discovery for the League client control API
//
// The client picks a new port and token on every start, so nothing here is
// persisted. The store keeps one immutable snapshot and swaps it on refresh.

use base64::{engine::general_purpose, Engine};
use futures_util::future::BoxFuture;
use std::path::PathBuf;
use std::sync::{Arc, RwLock};

use super::types::Channel;
use crate::error::LcuError;

pub const LOOPBACK_HOST: &str = "127.0.0.1";
const AUTH_USERNAME: &str = "riot";

/// Port and token of a secondary service advertised by the client.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SecondaryEndpoint {
  pub port: u16,
  pub auth_token: String,
}

/// Connection parameters for one client instance.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Credentials {
  pub host: String,
  pub port: u16,
  pub auth_token: String,
  pub region: String,
  pub platform_id: String,
  pub locale: String,
  pub riot_client: Option<SecondaryEndpoint>,
  pub pid: Option<u32>,
}

impl Credentials {
  pub fn new(port: u16, auth_token: impl Into<String>) -> Self {
    Self {
      host: LOOPBACK_HOST.to_string(),
      port,
      auth_token: auth_token.into(),
      region: String::new(),
      platform_id: String::new(),
      locale: String::new(),
      riot_client: None,
      pid: None,
    }
  }

  /// Port and token for `channel`.
  pub fn endpoint(&self, channel: Channel) -> Result<(u16, &str), LcuError> {
    match channel {
      Channel::LeagueClient => Ok((self.port, self.auth_token.as_str())),
      Channel::RiotClient => self
        .riot_client
        .as_ref()
        .map(|rc| (rc.port, rc.auth_token.as_str()))
        .ok_or_else(|| {
          LcuError::CredentialsUnavailable(
            "client was started without Riot client port/token".to_string(),
          )
        }),
    }
  }

  pub fn base_url(&self, channel: Channel) -> Result<String, LcuError> {
    let (port, _) = self.endpoint(channel)?;
    Ok(format!("https://{}:{}", self.host, port))
  }

  /// `Authorization` header value for `channel`.
  pub fn authorization(&self, channel: Channel) -> Result<String, LcuError> {
    let (_, token) = self.endpoint(channel)?;
    let encoded = general_purpose::STANDARD.encode(format!("{}:{}", AUTH_USERNAME, token));
    Ok(format!("Basic {}", encoded))
  }
}

/// Something that can find the running client's credentials.
pub trait CredentialSource: Send + Sync {
  fn discover(&self) -> BoxFuture<'_, Result<Credentials, LcuError>>;
}

/// Caches the current credential snapshot.
pub struct CredentialStore {
  source: Arc<dyn CredentialSource>,
  current: RwLock<Option<Arc<Credentials>>>,
}

impl CredentialStore {
  pub fn new(source: Arc<dyn CredentialSource>) -> Self {
    Self {
      source,
      current: RwLock::new(None),
    }
  }

  /// The cached snapshot, discovered on first use.
  pub async fn get(&self) -> Result<Arc<Credentials>, LcuError> {
    if let Some(current) = self.cached() {
      return Ok(current);
    }
    self.refresh().await
  }

  /// Rediscover and swap the snapshot. On failure the previous snapshot stays.
  pub async fn refresh(&self) -> Result<Arc<Credentials>, LcuError> {
    let discovered = Arc::new(self.source.discover().await?);
    let previous = {
      let mut guard = self
        .current
        .write()
        .map_err(|_| LcuError::CredentialsUnavailable("credential cache poisoned".into()))?;
      guard.replace(discovered.clone())
    };

    match previous {
      Some(prev) if prev.port == discovered.port && prev.auth_token == discovered.auth_token => {
        tracing::debug!(port = discovered.port, "credentials unchanged after refresh");
      }
      _ => {
        tracing::info!(
          port = discovered.port,
          region = %discovered.region,
          pid = ?discovered.pid,
          "discovered League client credentials"
        );
      }
    }
    Ok(discovered)
  }

  pub fn cached(&self) -> Option<Arc<Credentials>> {
    self.current.read().ok().and_then(|guard| guard.clone())
  }

  /// Drop the snapshot so the next `get` rediscovers.
  pub fn clear(&self) {
    if let Ok(mut guard) = self.current.write() {
      *guard = None;
    }
  }
}

/// Reads credentials from the client's launch arguments.
pub struct ProcessCredentialSource {
  process_name: String,
}

impl ProcessCredentialSource {
  pub fn new(process_name: impl Into<String>) -> Self {
    Self {
      process_name: process_name.into(),
    }
  }

  #[cfg(target_os = "windows")]
  async fn command_lines(&self) -> Result<Vec<String>, LcuError> {
    const CREATE_NO_WINDOW: u32 = 0x08000000;

    let script = format!(
      "Get-CimInstance Win32_Process -Filter \"name = '{}.exe'\" | Select-Object -ExpandProperty CommandLine",
      self.process_name
    );
    let mut command = tokio::process::Command::new("powershell");
    command.creation_flags(CREATE_NO_WINDOW);
    command.args(["-NoProfile", "-Command", script.as_str()]);

    let output = command
      .output()
      .await
      .map_err(|e| LcuError::CredentialsUnavailable(format!("failed to query processes: {}", e)))?;

    Ok(
      String::from_utf8_lossy(&output.stdout)
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .map(str::to_string)
        .collect(),
    )
  }

  #[cfg(not(target_os = "windows"))]
  async fn command_lines(&self) -> Result<Vec<String>, LcuError> {
    let output = tokio::process::Command::new("ps")
      .args(["-A", "-ww", "-o", "args="])
      .output()
      .await
      .map_err(|e| LcuError::CredentialsUnavailable(format!("failed to query processes: {}", e)))?;

    Ok(
      String::from_utf8_lossy(&output.stdout)
        .lines()
        .map(str::trim)
        .filter(|line| line.contains(&self.process_name))
        .map(str::to_string)
        .collect(),
    )
  }
}

impl CredentialSource for ProcessCredentialSource {
  fn discover(&self) -> BoxFuture<'_, Result<Credentials, LcuError>> {
    Box::pin(async move {
      let lines = self.command_lines().await?;
      if lines.is_empty() {
        return Err(LcuError::CredentialsUnavailable(format!(
          "{} is not running",
          self.process_name
        )));
      }

      let mut last_err = None;
      for line in &lines {
        match parse_launch_args(line) {
          Ok(credentials) => return Ok(credentials),
          Err(e) => last_err = Some(e),
        }
      }
      Err(last_err.unwrap_or_else(|| {
        LcuError::CredentialsUnavailable("no usable client command line".into())
      }))
    })
  }
}

/// Value of `--key=value` in a command line, unquoted.
fn launch_arg<'a>(command_line: &'a str, key: &str) -> Option<&'a str> {
  let needle = format!("--{}=", key);
  let start = command_line.find(&needle)? + needle.len();
  let rest = &command_line[start..];
  let end = rest
    .find(|c: char| c == '"' || c.is_whitespace())
    .unwrap_or(rest.len());
  let value = &rest[..end];
  (!value.is_empty()).then_some(value)
}

fn parse_port(value: &str, key: &str) -> Result<u16, LcuError> {
  value
    .parse::<u16>()
    .map_err(|_| LcuError::CredentialsUnavailable(format!("invalid --{}: {}", key, value)))
}

/// Build credentials from the client's command line.
pub fn parse_launch_args(command_line: &str) -> Result<Credentials, LcuError> {
  let port = launch_arg(command_line, "app-port")
    .ok_or_else(|| LcuError::CredentialsUnavailable("missing --app-port".into()))
    .and_then(|v| parse_port(v, "app-port"))?;
  let auth_token = launch_arg(command_line, "remoting-auth-token")
    .ok_or_else(|| LcuError::CredentialsUnavailable("missing --remoting-auth-token".into()))?;

  let riot_client = match (
    launch_arg(command_line, "riotclient-app-port"),
    launch_arg(command_line, "riotclient-auth-token"),
  ) {
    (Some(port), Some(token)) => Some(SecondaryEndpoint {
      port: parse_port(port, "riotclient-app-port")?,
      auth_token: token.to_string(),
    }),
    _ => None,
  };

  let arg = |key: &str| launch_arg(command_line, key).unwrap_or_default().to_string();

  Ok(Credentials {
    host: LOOPBACK_HOST.to_string(),
    port,
    auth_token: auth_token.to_string(),
    region: arg("region"),
    platform_id: arg("rso_platform_id"),
    locale: arg("locale"),
    riot_client,
    pid: launch_arg(command_line, "app-pid").and_then(|v| v.parse().ok()),
  })
}

/// Reads the lockfile the client writes into its install directory.
pub struct LockfileCredentialSource {
  league_path: PathBuf,
}

impl LockfileCredentialSource {
  pub const LOCKFILE_NAMES: [&'static str; 3] = [
    "lockfile",
    "LeagueClientUx.lockfile",
    "LeagueClient.lockfile",
  ];

  pub fn new(league_path: impl Into<PathBuf>) -> Self {
    Self {
      league_path: league_path.into(),
    }
  }
}

impl CredentialSource for LockfileCredentialSource {
  fn discover(&self) -> BoxFuture<'_, Result<Credentials, LcuError>> {
    Box::pin(async move {
      for name in Self::LOCKFILE_NAMES {
        let path = self.league_path.join(name);
        if let Ok(content) = tokio::fs::read_to_string(&path).await {
          return parse_lockfile(&content);
        }
      }
      Err(LcuError::CredentialsUnavailable(format!(
        "no lockfile in {}",
        self.league_path.display()
      )))
    })
  }
}

/// Parse `name:pid:port:password:protocol`.
pub fn parse_lockfile(content: &str) -> Result<Credentials, LcuError> {
  let parts: Vec<&str> = content.trim().split(':').collect();
  if parts.len() < 5 {
    return Err(LcuError::CredentialsUnavailable(
      "malformed lockfile".to_string(),
    ));
  }
  let mut credentials = Credentials::new(parse_port(parts[2], "port")?, parts[3]);
  credentials.pid = parts[1].parse().ok();
  Ok(credentials)
}

/// Tries each source in order.
pub struct ChainedCredentialSource {
  sources: Vec<Arc<dyn CredentialSource>>,
}

impl ChainedCredentialSource {
  pub fn new(sources: Vec<Arc<dyn CredentialSource>>) -> Self {
    Self { sources }
  }
}

impl CredentialSource for ChainedCredentialSource {
  fn discover(&self) -> BoxFuture<'_, Result<Credentials, LcuError>> {
    Box::pin(async move {
      let mut last_err =
        LcuError::CredentialsUnavailable("no credential source configured".to_string());
      for source in &self.sources {
        match source.discover().await {
          Ok(credentials) => return Ok(credentials),
          Err(e) => {
            tracing::debug!(error = %e, "credential source failed, trying next");
            last_err = e;
          }
        }
      }
      Err(last_err)
    })
  }
}
