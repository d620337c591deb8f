//! Signing key resolution
//!
//! [`JwksClient`] fetches the tenant's JSON Web Key Set and caches it for a
//! fixed TTL. A key id missing from a fresh cache triggers one refetch, which
//! picks up rotated keys. Refetches are spaced by a cooldown so unknown key
//! ids cannot drive traffic to the endpoint.

use async_trait::async_trait;
use jsonwebtoken::jwk::JwkSet;
use jsonwebtoken::DecodingKey;
use reqwest::Client;
use std::time::{Duration, Instant};
use tokio::sync::RwLock;
use tracing::{debug, info};

use super::TokenError;

/// Source of token signing keys
#[async_trait]
pub trait KeyResolver: Send + Sync {
    /// Verification key for the given key id
    async fn resolve(&self, kid: &str) -> Result<DecodingKey, TokenError>;
}

/// Minimum time between fetches triggered by unknown key ids
const REFETCH_COOLDOWN: Duration = Duration::from_secs(30);

struct CachedKeys {
    keys: JwkSet,
    fetched_at: Instant,
}

enum Lookup {
    Hit(DecodingKey),
    /// Fresh cache without the key, fetched within the cooldown
    RecentMiss,
    Stale,
}

/// Remote JWKS endpoint with a TTL cache
pub struct JwksClient {
    client: Client,
    url: String,
    ttl: Duration,
    refetch_cooldown: Duration,
    cache: RwLock<Option<CachedKeys>>,
}

impl JwksClient {
    pub fn new(client: Client, url: impl Into<String>, ttl: Duration) -> Self {
        Self {
            client,
            url: url.into(),
            ttl,
            refetch_cooldown: REFETCH_COOLDOWN,
            cache: RwLock::new(None),
        }
    }

    pub fn with_refetch_cooldown(mut self, cooldown: Duration) -> Self {
        self.refetch_cooldown = cooldown;
        self
    }

    async fn cached(&self, kid: &str) -> Lookup {
        let cache = self.cache.read().await;
        let Some(cached) = cache.as_ref() else {
            return Lookup::Stale;
        };
        let age = cached.fetched_at.elapsed();
        if age > self.ttl {
            return Lookup::Stale;
        }

        match cached.keys.find(kid).and_then(|jwk| DecodingKey::from_jwk(jwk).ok()) {
            Some(key) => Lookup::Hit(key),
            None if age < self.refetch_cooldown => Lookup::RecentMiss,
            None => Lookup::Stale,
        }
    }

    async fn fetch(&self) -> Result<JwkSet, TokenError> {
        let response = self
            .client
            .get(&self.url)
            .send()
            .await
            .and_then(|r| r.error_for_status())
            .map_err(|e| TokenError::KeyLookup(e.to_string()))?;

        response
            .json::<JwkSet>()
            .await
            .map_err(|e| TokenError::KeyLookup(format!("invalid key set: {}", e)))
    }
}

#[async_trait]
impl KeyResolver for JwksClient {
    async fn resolve(&self, kid: &str) -> Result<DecodingKey, TokenError> {
        match self.cached(kid).await {
            Lookup::Hit(key) => {
                debug!("Using cached signing key {}", kid);
                return Ok(key);
            }
            Lookup::RecentMiss => {
                debug!("Signing key {} unknown, key set fetched recently", kid);
                return Err(TokenError::UnknownKey(kid.to_string()));
            }
            Lookup::Stale => {}
        }

        let keys = self.fetch().await?;
        info!("Fetched {} signing keys from {}", keys.keys.len(), self.url);

        let key = keys.find(kid).map(DecodingKey::from_jwk);
        *self.cache.write().await = Some(CachedKeys {
            keys,
            fetched_at: Instant::now(),
        });

        match key {
            Some(key) => Ok(key?),
            None => Err(TokenError::UnknownKey(kid.to_string())),
        }
    }
}

/// Fixed key set, for pinned keys and tests
pub struct StaticKeys {
    keys: JwkSet,
}

impl StaticKeys {
    pub fn new(keys: JwkSet) -> Self {
        Self { keys }
    }

    /// Parse a JWKS JSON document
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        Ok(Self::new(serde_json::from_str(json)?))
    }
}

#[async_trait]
impl KeyResolver for StaticKeys {
    async fn resolve(&self, kid: &str) -> Result<DecodingKey, TokenError> {
        let jwk = self
            .keys
            .find(kid)
            .ok_or_else(|| TokenError::UnknownKey(kid.to_string()))?;
        Ok(DecodingKey::from_jwk(jwk)?)
    }
}
