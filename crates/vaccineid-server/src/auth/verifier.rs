//! Bearer token verifier

use axum::http::HeaderMap;
use chrono::Utc;
use jsonwebtoken::{decode, decode_header, Algorithm, Validation};
use reqwest::Client;
use serde::Deserialize;
use std::sync::Arc;
use std::time::Duration;
use tracing::info;

use super::{bearer_token, Authorization, JwksClient, KeyResolver, TokenError};
use crate::config::AuthConfig;

/// Expected token claims
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VerifierSettings {
    pub issuer: String,
    pub audience: String,
    pub required_scope: String,
}

impl VerifierSettings {
    pub fn from_config(config: &AuthConfig) -> Self {
        Self {
            issuer: config.issuer(),
            audience: config.audience.clone(),
            required_scope: config.required_scope.clone(),
        }
    }
}

#[derive(Debug, Deserialize)]
struct ScopeClaims {
    #[serde(default)]
    scp: Option<String>,
    #[serde(default)]
    iat: Option<i64>,
}

/// Verifies caller tokens and their scope
pub struct TokenVerifier {
    settings: VerifierSettings,
    keys: Arc<dyn KeyResolver>,
    validation: Validation,
}

impl TokenVerifier {
    pub fn new(settings: VerifierSettings, keys: Arc<dyn KeyResolver>) -> Self {
        let mut validation = Validation::new(Algorithm::RS256);
        validation.set_audience(&[settings.audience.as_str()]);
        validation.set_issuer(&[settings.issuer.as_str()]);
        validation.set_required_spec_claims(&["aud", "exp", "iss"]);
        validation.validate_exp = true;
        validation.validate_nbf = true;
        validation.leeway = 0;

        Self {
            settings,
            keys,
            validation,
        }
    }

    /// Verifier backed by the tenant's remote JWKS
    pub fn from_config(config: &AuthConfig, client: Client) -> Self {
        let keys = JwksClient::new(
            client,
            config.jwks_url(),
            Duration::from_secs(config.key_cache_ttl_secs),
        );
        Self::new(VerifierSettings::from_config(config), Arc::new(keys))
    }

    pub fn settings(&self) -> &VerifierSettings {
        &self.settings
    }

    /// Authorize the bearer token carried by request headers
    pub async fn authorize_request(&self, headers: &HeaderMap) -> Authorization {
        match bearer_token(headers) {
            Some(token) => self.authorize(token).await,
            None => {
                info!("jwt validation error - missing or malformed authorization header");
                Authorization::Invalid
            }
        }
    }

    /// Authorize a raw bearer token
    pub async fn authorize(&self, token: &str) -> Authorization {
        match self.verify(token).await {
            Ok(scope) if scope == self.settings.required_scope => {
                info!("got valid jwt and scope match");
                Authorization::Granted
            }
            Ok(_) => {
                info!("got valid jwt without required scope");
                Authorization::Denied
            }
            Err(e) => {
                info!("jwt validation error - {}", e);
                Authorization::Invalid
            }
        }
    }

    /// Verify signature and claims, returning the token's scope
    async fn verify(&self, token: &str) -> Result<String, TokenError> {
        let header = decode_header(token)?;
        let kid = header.kid.ok_or(TokenError::MissingKeyId)?;
        let key = self.keys.resolve(&kid).await?;

        let claims = decode::<ScopeClaims>(token, &key, &self.validation)?.claims;

        if let Some(iat) = claims.iat {
            if iat > Utc::now().timestamp() {
                return Err(TokenError::IssuedInFuture);
            }
        }

        claims.scp.ok_or(TokenError::MissingScope)
    }
}
