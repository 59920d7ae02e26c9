// LCU transport module - credentials, request queue, debounce

pub mod credentials;
pub mod debounce;
pub mod gateway;
pub mod request_log;
pub mod transport;
pub mod types;

#[cfg(test)]
pub(crate) mod tests;

// Re-export public types and functions
pub use credentials::{
  parse_launch_args, parse_lockfile, ChainedCredentialSource, CredentialSource, CredentialStore,
  Credentials, LockfileCredentialSource, ProcessCredentialSource, SecondaryEndpoint,
};
pub use debounce::DebounceCache;
pub use gateway::{GatewayPolicy, RequestGateway};
pub use request_log::{RequestLog, RequestLogEntry};
pub use transport::{HttpTransport, Transport};
pub use types::{Channel, LcuRequest, RawResponse, RequestOptions};
