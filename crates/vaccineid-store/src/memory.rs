//! In-memory document store
//!
//! Keeps documents in a `BTreeMap` keyed by `(partition_key, id)`. Used by
//! the adapter and router tests.

use async_trait::async_trait;
use futures::stream::{self, BoxStream, StreamExt, TryStreamExt};
use serde_json::Value;
use std::collections::BTreeMap;
use tokio::sync::RwLock;

use crate::error::{StoreError, StoreResult};
use crate::query::DocumentQuery;
use crate::traits::DocumentStore;

/// Document store held in process memory
#[derive(Default)]
pub struct MemoryStore {
    documents: RwLock<BTreeMap<(String, String), Value>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored documents
    pub async fn len(&self) -> usize {
        self.documents.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.documents.read().await.is_empty()
    }

    /// Snapshot of all stored documents
    pub async fn documents(&self) -> Vec<Value> {
        self.documents.read().await.values().cloned().collect()
    }
}

fn document_id(document: &Value) -> StoreResult<String> {
    document
        .get("id")
        .and_then(Value::as_str)
        .map(str::to_string)
        .ok_or_else(|| StoreError::Status {
            status: 400,
            message: "document is missing a string 'id'".to_string(),
        })
}

#[async_trait]
impl DocumentStore for MemoryStore {
    async fn read_document(&self, id: &str, partition_key: &str) -> StoreResult<Option<Value>> {
        let documents = self.documents.read().await;
        Ok(documents
            .get(&(partition_key.to_string(), id.to_string()))
            .cloned())
    }

    fn query_documents(&self, query: DocumentQuery) -> BoxStream<'_, StoreResult<Value>> {
        stream::once(async move {
            let documents = self.documents.read().await;
            let matches: Vec<Value> = documents
                .values()
                .filter(|doc| query.matches(doc))
                .cloned()
                .collect();
            Ok::<_, StoreError>(stream::iter(matches.into_iter().map(Ok::<Value, StoreError>)))
        })
        .try_flatten()
        .boxed()
    }

    async fn upsert_document(&self, partition_key: &str, document: Value) -> StoreResult<()> {
        let id = document_id(&document)?;
        self.documents
            .write()
            .await
            .insert((partition_key.to_string(), id), document);
        Ok(())
    }

    async fn ping(&self) -> StoreResult<()> {
        Ok(())
    }
}
