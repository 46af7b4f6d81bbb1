// Shared HTTP plumbing for the Graph and OpenAI clients.
// Every call is made exactly once; failures are classified and returned to the caller.


use std::time::Duration;

use tracing::{debug, warn};
use url::Url;

use crate::{QaError, Result};

pub const DEFAULT_TIMEOUT_SECONDS: u64 = 30;

/// Build a blocking agent with a global timeout applied to every request
#[inline]
pub fn build_agent(timeout: Duration) -> ureq::Agent {
    ureq::Agent::config_builder()
        .timeout_global(Some(timeout))
        .build()
        .into()
}

/// Append `path` to `base`, keeping any path prefix already present on the base URL
#[inline]
pub fn endpoint(base: &Url, path: &str) -> Result<Url> {
    let joined = format!(
        "{}/{}",
        base.as_str().trim_end_matches('/'),
        path.trim_start_matches('/')
    );
    Url::parse(&joined).map_err(|e| QaError::Config(format!("Invalid endpoint {}: {}", joined, e)))
}

const AUTH_STATUSES: &[u16] = &[401, 403];

/// Run a single request and classify any failure
pub(crate) fn send_once<F>(endpoint: &Url, request_fn: F) -> Result<String>
where
    F: FnOnce() -> std::result::Result<String, ureq::Error>,
{
    send_once_with_auth_statuses(endpoint, AUTH_STATUSES, request_fn)
}

/// Like [`send_once`], with a caller-chosen set of statuses that mean "credentials rejected"
pub(crate) fn send_once_with_auth_statuses<F>(
    endpoint: &Url,
    auth_statuses: &[u16],
    request_fn: F,
) -> Result<String>
where
    F: FnOnce() -> std::result::Result<String, ureq::Error>,
{
    debug!("HTTP request to {}", endpoint);

    request_fn().map_err(|error| classify_error(endpoint, &error, auth_statuses))
}

fn classify_error(endpoint: &Url, error: &ureq::Error, auth_statuses: &[u16]) -> QaError {
    match error {
        ureq::Error::StatusCode(status) if auth_statuses.contains(status) => {
            warn!("{} rejected credentials (status {})", endpoint, status);
            QaError::Auth(format!("{} rejected credentials: HTTP {}", endpoint, status))
        }
        ureq::Error::StatusCode(status) => {
            warn!("{} returned status {}", endpoint, status);
            QaError::Upstream(format!("{} returned HTTP {}", endpoint, status))
        }
        ureq::Error::ConnectionFailed
        | ureq::Error::HostNotFound
        | ureq::Error::Timeout(_)
        | ureq::Error::Io(_) => {
            warn!("Transport error calling {}: {}", endpoint, error);
            QaError::Transport(format!("{}: {}", endpoint, error))
        }
        _ => {
            warn!("Request to {} failed: {}", endpoint, error);
            QaError::Transport(format!("{}: {}", endpoint, error))
        }
    }
}
