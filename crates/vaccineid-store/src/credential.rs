//! Workload identity credential
//!
//! Exchanges the projected service account token for a store access token
//! using the OAuth 2.0 client-credentials grant with a JWT bearer client
//! assertion:
//!
//! ```text
//! POST {authority_host}/{tenant_id}/oauth2/v2.0/token
//!   grant_type=client_credentials
//!   client_id={client_id}
//!   client_assertion_type=urn:ietf:params:oauth:client-assertion-type:jwt-bearer
//!   client_assertion={contents of federated_token_file}
//!   scope={store scope}
//! ```
//!
//! The token is cached and reused until it is within [`REFRESH_MARGIN_SECS`]
//! of expiry. The cache lock is held across the exchange, so concurrent callers
//! share one refresh. The assertion file is re-read on every refresh because
//! the platform rotates it.

use async_trait::async_trait;
use chrono::{Duration, Utc};
use reqwest::Client;
use serde::Deserialize;
use tokio::sync::Mutex;
use tracing::{debug, info};

use crate::config::WorkloadIdentityConfig;
use crate::error::{StoreError, StoreResult};
use crate::traits::{AccessToken, TokenCredential};

/// Refresh tokens expiring within this many seconds
pub const REFRESH_MARGIN_SECS: i64 = 300;

const CLIENT_ASSERTION_TYPE: &str = "urn:ietf:params:oauth:client-assertion-type:jwt-bearer";

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    expires_in: i64,
}

#[derive(Debug, Deserialize)]
struct TokenErrorResponse {
    error: String,
    #[serde(default)]
    error_description: Option<String>,
}

/// Credential backed by workload identity federation
pub struct WorkloadIdentityCredential {
    client: Client,
    config: WorkloadIdentityConfig,
    scope: String,
    cached: Mutex<Option<AccessToken>>,
}

impl WorkloadIdentityCredential {
    /// Create a credential requesting tokens for `scope`
    pub fn new(client: Client, config: WorkloadIdentityConfig, scope: impl Into<String>) -> Self {
        Self {
            client,
            config,
            scope: scope.into(),
            cached: Mutex::new(None),
        }
    }

    async fn exchange(&self) -> StoreResult<AccessToken> {
        let assertion = tokio::fs::read_to_string(&self.config.federated_token_file)
            .await
            .map_err(|e| {
                StoreError::Credential(format!(
                    "Failed to read federated token file {}: {}",
                    self.config.federated_token_file.display(),
                    e
                ))
            })?;

        let params = [
            ("grant_type", "client_credentials"),
            ("client_id", self.config.client_id.as_str()),
            ("client_assertion_type", CLIENT_ASSERTION_TYPE),
            ("client_assertion", assertion.trim()),
            ("scope", self.scope.as_str()),
        ];

        let response = self
            .client
            .post(self.config.token_endpoint())
            .form(&params)
            .send()
            .await
            .map_err(|e| StoreError::Credential(format!("Token exchange request failed: {}", e)))?;

        let status = response.status();
        let body = response.text().await?;

        if !status.is_success() {
            let message = match serde_json::from_str::<TokenErrorResponse>(&body) {
                Ok(err) => err.error_description.unwrap_or(err.error),
                Err(_) => format!("token endpoint returned {}", status),
            };
            return Err(StoreError::Credential(message));
        }

        let token: TokenResponse = serde_json::from_str(&body)
            .map_err(|e| StoreError::Credential(format!("Invalid token response: {}", e)))?;

        Ok(AccessToken::new(
            token.access_token,
            Utc::now() + Duration::seconds(token.expires_in),
        ))
    }
}

#[async_trait]
impl TokenCredential for WorkloadIdentityCredential {
    async fn access_token(&self) -> StoreResult<AccessToken> {
        let mut cached = self.cached.lock().await;

        if let Some(token) = cached.as_ref() {
            if !token.expires_within(Duration::seconds(REFRESH_MARGIN_SECS), Utc::now()) {
                debug!("Reusing cached store access token");
                return Ok(token.clone());
            }
        }

        let token = self.exchange().await?;
        info!("Acquired store access token expiring at {}", token.expires_at);
        *cached = Some(token.clone());

        Ok(token)
    }
}
