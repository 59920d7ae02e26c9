// Wiring for one client connection: credentials, request log, gateway

use std::sync::Arc;

use crate::config::ClientSettings;
use crate::error::LcuError;
use crate::lcu::{
  ChainedCredentialSource, CredentialSource, CredentialStore, GatewayPolicy, HttpTransport,
  LockfileCredentialSource, ProcessCredentialSource, RequestGateway, RequestLog, Transport,
};

/// Everything a component needs to talk to the client. Cheap to clone.
#[derive(Clone)]
pub struct LcuContext {
  pub credentials: Arc<CredentialStore>,
  pub gateway: RequestGateway,
  pub request_log: Arc<RequestLog>,
}

impl LcuContext {
  /// Build the production stack. Must be called inside a Tokio runtime.
  pub fn new(settings: &ClientSettings) -> Result<Self, LcuError> {
    let process: Arc<dyn CredentialSource> =
      Arc::new(ProcessCredentialSource::new(settings.process_name.clone()));
    let source: Arc<dyn CredentialSource> = match &settings.league_path {
      Some(path) => Arc::new(ChainedCredentialSource::new(vec![
        process,
        Arc::new(LockfileCredentialSource::new(path.clone())),
      ])),
      None => process,
    };

    let mut request_log = RequestLog::new(settings.request_log_capacity);
    if let Some(path) = &settings.request_log_path {
      request_log = request_log.with_file(path.clone());
    }

    let transport = Arc::new(HttpTransport::new(settings.request_timeout())?);
    Ok(Self::with_parts(
      source,
      transport,
      Arc::new(request_log),
      GatewayPolicy::from(settings),
    ))
  }

  pub fn with_parts(
    source: Arc<dyn CredentialSource>,
    transport: Arc<dyn Transport>,
    request_log: Arc<RequestLog>,
    policy: GatewayPolicy,
  ) -> Self {
    let credentials = Arc::new(CredentialStore::new(source));
    let gateway = RequestGateway::spawn(
      credentials.clone(),
      transport,
      request_log.clone(),
      policy,
    );
    Self {
      credentials,
      gateway,
      request_log,
    }
  }
}
