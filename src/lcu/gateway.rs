// Request gateway: a single FIFO queue in front of the control API
//
// Callers enqueue a request and await a oneshot reply. One drain task pops
// requests in order, keeps at least `min_interval` between dispatches, and
// handles credential refresh on auth/connection failures.

use reqwest::Method;
use serde::de::DeserializeOwned;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, oneshot};
use tokio::time::{sleep, sleep_until, Instant};

use super::credentials::CredentialStore;
use super::request_log::RequestLog;
use super::transport::Transport;
use super::types::{LcuRequest, RawResponse, RequestOptions};
use crate::config::ClientSettings;
use crate::error::LcuError;

struct QueuedRequest {
  request: LcuRequest,
  reply: oneshot::Sender<Result<RawResponse, LcuError>>,
}

/// Pacing and retry parameters.
#[derive(Debug, Clone, Copy)]
pub struct GatewayPolicy {
  pub min_interval: Duration,
  pub max_retries: u32,
  pub retry_delay: Duration,
}

impl Default for GatewayPolicy {
  fn default() -> Self {
    Self::from(&ClientSettings::default())
  }
}

impl From<&ClientSettings> for GatewayPolicy {
  fn from(settings: &ClientSettings) -> Self {
    Self {
      min_interval: settings.min_request_interval(),
      max_retries: settings.max_retries,
      retry_delay: settings.retry_delay(),
    }
  }
}

/// Cheap to clone; all clones feed the same queue.
#[derive(Clone)]
pub struct RequestGateway {
  sender: mpsc::UnboundedSender<QueuedRequest>,
}

impl RequestGateway {
  /// Start the drain task. Must be called inside a Tokio runtime. The task
  /// ends when the last gateway clone is dropped.
  pub fn spawn(
    credentials: Arc<CredentialStore>,
    transport: Arc<dyn Transport>,
    log: Arc<RequestLog>,
    policy: GatewayPolicy,
  ) -> Self {
    let (sender, receiver) = mpsc::unbounded_channel();
    let worker = DrainWorker {
      credentials,
      transport,
      log,
      policy,
      last_dispatch: None,
    };
    tokio::spawn(worker.run(receiver));
    Self { sender }
  }

  /// Execute a JSON call. An empty body decodes as JSON `null`.
  pub async fn execute<T: DeserializeOwned>(
    &self,
    method: Method,
    path: &str,
    options: RequestOptions,
  ) -> Result<T, LcuError> {
    let response = self.enqueue(LcuRequest::new(method, path, options)).await?;
    let body: &[u8] = if response.body.iter().all(u8::is_ascii_whitespace) {
      b"null"
    } else {
      &response.body
    };
    Ok(serde_json::from_slice(body)?)
  }

  /// Execute a call whose response is binary (images, assets).
  pub async fn execute_bytes(
    &self,
    method: Method,
    path: &str,
    options: RequestOptions,
  ) -> Result<Vec<u8>, LcuError> {
    let response = self.enqueue(LcuRequest::new(method, path, options)).await?;
    Ok(response.body)
  }

  pub async fn get<T: DeserializeOwned>(&self, path: &str) -> Result<T, LcuError> {
    self.execute(Method::GET, path, RequestOptions::default()).await
  }

  pub async fn post<T: DeserializeOwned>(
    &self,
    path: &str,
    body: Option<serde_json::Value>,
  ) -> Result<T, LcuError> {
    let options = RequestOptions {
      body,
      ..RequestOptions::default()
    };
    self.execute(Method::POST, path, options).await
  }

  pub async fn patch<T: DeserializeOwned>(
    &self,
    path: &str,
    body: serde_json::Value,
  ) -> Result<T, LcuError> {
    self
      .execute(Method::PATCH, path, RequestOptions::default().json(body))
      .await
  }

  async fn enqueue(&self, request: LcuRequest) -> Result<RawResponse, LcuError> {
    let (reply, receiver) = oneshot::channel();
    self
      .sender
      .send(QueuedRequest { request, reply })
      .map_err(|_| LcuError::GatewayClosed)?;
    receiver.await.map_err(|_| LcuError::GatewayClosed)?
  }
}

struct DrainWorker {
  credentials: Arc<CredentialStore>,
  transport: Arc<dyn Transport>,
  log: Arc<RequestLog>,
  policy: GatewayPolicy,
  last_dispatch: Option<Instant>,
}

impl DrainWorker {
  async fn run(mut self, mut receiver: mpsc::UnboundedReceiver<QueuedRequest>) {
    while let Some(queued) = receiver.recv().await {
      let result = self.execute_with_retry(&queued.request).await;
      // Caller may have gone away; its result is simply dropped.
      let _ = queued.reply.send(result);
    }
    tracing::debug!("request gateway drained and closed");
  }

  async fn execute_with_retry(&mut self, request: &LcuRequest) -> Result<RawResponse, LcuError> {
    let mut attempt: u32 = 0;
    loop {
      let mut credentials = self.credentials.get().await?;
      if credentials.endpoint(request.channel).is_err() {
        // The snapshot predates the secondary service; rediscover once.
        tracing::debug!(channel = %request.channel, "credentials lack channel, refreshing");
        credentials = self.credentials.refresh().await?;
        credentials.endpoint(request.channel)?;
      }

      self.wait_for_slot().await;
      let started = Instant::now();
      self.last_dispatch = Some(started);

      let outcome = self
        .transport
        .send(&credentials, request)
        .await
        .and_then(classify);
      let elapsed_ms = started.elapsed().as_millis() as u64;
      self.log.record(
        request,
        attempt,
        outcome.as_ref().map(|r| r.status),
        elapsed_ms,
      );

      match outcome {
        Err(err) if err.is_recoverable() && attempt < self.policy.max_retries => {
          attempt += 1;
          tracing::warn!(
            method = %request.method,
            path = %request.path,
            attempt,
            error = %err,
            "request failed, refreshing credentials and retrying"
          );
          if let Err(refresh_err) = self.credentials.refresh().await {
            tracing::warn!(error = %refresh_err, "credential refresh failed");
          }
          sleep(self.policy.retry_delay).await;
        }
        Err(err) => {
          tracing::debug!(method = %request.method, path = %request.path, error = %err, "request failed");
          return Err(err);
        }
        Ok(response) => return Ok(response),
      }
    }
  }

  async fn wait_for_slot(&self) {
    if let Some(last) = self.last_dispatch {
      sleep_until(last + self.policy.min_interval).await;
    }
  }
}

/// Map HTTP status codes onto the error taxonomy.
fn classify(response: RawResponse) -> Result<RawResponse, LcuError> {
  match response.status {
    _ if response.is_success() => Ok(response),
    401 | 403 => Err(LcuError::AuthExpired {
      status: response.status,
    }),
    status => Err(LcuError::RequestRejected {
      status,
      body: response.body_text(),
    }),
  }
}
