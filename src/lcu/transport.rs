// HTTPS transport for the client control API

use futures_util::future::BoxFuture;
use std::time::Duration;

use super::credentials::Credentials;
use super::types::{LcuRequest, RawResponse};
use crate::error::LcuError;

/// Performs exactly one call. Retries and pacing live in the gateway.
pub trait Transport: Send + Sync {
  fn send<'a>(
    &'a self,
    credentials: &'a Credentials,
    request: &'a LcuRequest,
  ) -> BoxFuture<'a, Result<RawResponse, LcuError>>;
}

/// reqwest-backed transport. The client serves a self-signed certificate on
/// loopback, so certificate validation is disabled.
pub struct HttpTransport {
  client: reqwest::Client,
}

impl HttpTransport {
  pub fn new(timeout: Option<Duration>) -> Result<Self, LcuError> {
    let mut builder = reqwest::Client::builder()
      .danger_accept_invalid_certs(true)
      .connect_timeout(Duration::from_secs(2))
      .pool_max_idle_per_host(2);
    if let Some(timeout) = timeout {
      builder = builder.timeout(timeout);
    }

    let client = builder
      .build()
      .map_err(|e| LcuError::Config(format!("failed to create HTTP client: {}", e)))?;
    Ok(Self { client })
  }
}

impl Transport for HttpTransport {
  fn send<'a>(
    &'a self,
    credentials: &'a Credentials,
    request: &'a LcuRequest,
  ) -> BoxFuture<'a, Result<RawResponse, LcuError>> {
    Box::pin(async move {
      let url = format!("{}{}", credentials.base_url(request.channel)?, request.path);
      let mut builder = self
        .client
        .request(request.method.clone(), &url)
        .header("Authorization", credentials.authorization(request.channel)?)
        .header("Accept", "application/json");

      if !request.query.is_empty() {
        builder = builder.query(&request.query);
      }
      if let Some(body) = &request.body {
        builder = builder.json(body);
      }

      let response = builder.send().await?;
      let status = response.status().as_u16();
      let body = response.bytes().await?.to_vec();
      Ok(RawResponse { status, body })
    })
  }
}
