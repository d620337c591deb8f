//! Core trait definitions for document storage
//!
//! - [`DocumentStore`]: point read, predicate query, upsert and ping over JSON
//!   documents
//! - [`TokenCredential`]: access tokens for authenticating store requests
//!
//! # Thread Safety
//!
//! Implementations must be `Send + Sync`; one instance is shared by every
//! request handler.

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use futures::stream::BoxStream;
use serde_json::Value;

use crate::query::DocumentQuery;
use crate::StoreResult;

/// Document store collaborator
///
/// Documents are partitioned; every point operation takes the partition key.
#[async_trait]
pub trait DocumentStore: Send + Sync {
    /// Read one document, `None` if it does not exist
    async fn read_document(&self, id: &str, partition_key: &str) -> StoreResult<Option<Value>>;

    /// Lazily stream every document matching `query` across all partitions
    ///
    /// Each call starts a fresh scan.
    fn query_documents(&self, query: DocumentQuery) -> BoxStream<'_, StoreResult<Value>>;

    /// Insert or fully replace a document
    async fn upsert_document(&self, partition_key: &str, document: Value) -> StoreResult<()>;

    /// Establish the client connection without touching data
    async fn ping(&self) -> StoreResult<()>;
}

/// Bearer access token with its expiry
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AccessToken {
    pub token: String,
    pub expires_at: DateTime<Utc>,
}

impl AccessToken {
    pub fn new(token: impl Into<String>, expires_at: DateTime<Utc>) -> Self {
        Self {
            token: token.into(),
            expires_at,
        }
    }

    /// Whether the token expires within `margin` of `now`
    pub fn expires_within(&self, margin: Duration, now: DateTime<Utc>) -> bool {
        self.expires_at - now <= margin
    }
}

/// Source of store access tokens
#[async_trait]
pub trait TokenCredential: Send + Sync {
    /// Current access token, refreshed when it is close to expiry
    async fn access_token(&self) -> StoreResult<AccessToken>;
}
