// Microsoft identity platform authentication.
// Client-credentials grant for Graph; the token is used as-is until it expires, never refreshed.


use std::fmt;
use std::time::Duration;

use chrono::{DateTime, TimeDelta, Utc};
use serde::Deserialize;
use tracing::{debug, info, warn};
use url::Url;

use crate::config::Config;
use crate::http::{build_agent, endpoint, send_once_with_auth_statuses};
use crate::{QaError, Result};

// The token endpoint answers 400 for unknown clients, bad secrets and invalid scopes
const TOKEN_AUTH_STATUSES: &[u16] = &[400, 401, 403];

/// Bearer credential and the moment it stops being valid
#[derive(Clone, PartialEq, Eq)]
pub struct AccessToken {
    pub value: String,
    pub expires_at: DateTime<Utc>,
}

impl AccessToken {
    #[inline]
    pub fn is_expired(&self) -> bool {
        self.is_expired_at(Utc::now())
    }

    #[inline]
    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        now >= self.expires_at
    }

    #[inline]
    pub fn bearer(&self) -> String {
        format!("Bearer {}", self.value)
    }
}

impl fmt::Debug for AccessToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AccessToken")
            .field("expires_at", &self.expires_at)
            .finish_non_exhaustive()
    }
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: Option<String>,
    expires_in: Option<i64>,
    error: Option<String>,
    error_description: Option<String>,
}

/// Obtains app-only Graph tokens for one tenant
#[derive(Clone)]
pub struct GraphAuthenticator {
    token_url: Url,
    client_id: String,
    client_secret: String,
    scope: String,
    agent: ureq::Agent,
}

impl fmt::Debug for GraphAuthenticator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GraphAuthenticator")
            .field("token_url", &self.token_url)
            .field("client_id", &self.client_id)
            .field("scope", &self.scope)
            .finish_non_exhaustive()
    }
}

impl GraphAuthenticator {
    #[inline]
    pub fn new(config: &Config) -> Result<Self> {
        let authority = config
            .authority_url()
            .map_err(|e| QaError::Config(e.to_string()))?;
        let graph = config
            .graph_url()
            .map_err(|e| QaError::Config(e.to_string()))?;

        let token_url = endpoint(
            &authority,
            &format!("{}/oauth2/v2.0/token", config.graph.tenant_id),
        )?;
        let scope = endpoint(&graph, ".default")?.to_string();

        Ok(Self {
            token_url,
            client_id: config.graph.client_id.clone(),
            client_secret: config.graph.client_secret.clone(),
            scope,
            agent: build_agent(Duration::from_secs(config.graph.timeout_seconds)),
        })
    }

    #[inline]
    pub fn token_url(&self) -> &Url {
        &self.token_url
    }

    #[inline]
    pub fn scope(&self) -> &str {
        &self.scope
    }

    /// Request a fresh token.
    ///
    /// # Errors
    /// `Auth` when the identity platform rejects the request or returns no token,
    /// `Transport` when it cannot be reached.
    #[inline]
    pub fn acquire_token(&self) -> Result<AccessToken> {
        debug!("Requesting Graph token from {}", self.token_url);

        let response_text = send_once_with_auth_statuses(&self.token_url, TOKEN_AUTH_STATUSES, || {
            self.agent
                .post(self.token_url.as_str())
                .send_form([
                    ("grant_type", "client_credentials"),
                    ("client_id", self.client_id.as_str()),
                    ("client_secret", self.client_secret.as_str()),
                    ("scope", self.scope.as_str()),
                ])
                .and_then(|mut resp| resp.body_mut().read_to_string())
        })?;

        let response: TokenResponse = serde_json::from_str(&response_text)
            .map_err(|e| QaError::Auth(format!("Failed to parse token response: {}", e)))?;

        let Some(value) = response.access_token.filter(|t| !t.is_empty()) else {
            let reason = response
                .error_description
                .or(response.error)
                .unwrap_or_else(|| "response did not contain an access token".to_string());
            warn!("Token request failed: {}", reason);
            return Err(QaError::Auth(reason));
        };

        let lifetime = TimeDelta::try_seconds(response.expires_in.unwrap_or(0).max(0))
            .unwrap_or_else(TimeDelta::zero);
        let token = AccessToken {
            value,
            expires_at: Utc::now() + lifetime,
        };

        info!("Acquired Graph token valid until {}", token.expires_at);
        Ok(token)
    }
}
