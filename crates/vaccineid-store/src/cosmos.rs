//! Cosmos DB SQL API document store
//!
//! Talks to the account's REST endpoint with `reqwest`, authenticating every
//! request with a Microsoft Entra access token from a [`TokenCredential`].
//!
//! # Requests
//!
//! | Operation | Request |
//! |---|---|
//! | point read | `GET /dbs/{db}/colls/{coll}/docs/{id}` |
//! | query | `POST /dbs/{db}/colls/{coll}/docs` (`application/query+json`) |
//! | upsert | `POST /dbs/{db}/colls/{coll}/docs` (`x-ms-documentdb-is-upsert`) |
//!
//! Queries run cross-partition and are paged with `x-ms-continuation`; the
//! next page is only requested once the caller has consumed the current one.

use async_trait::async_trait;
use chrono::Utc;
use futures::stream::{self, BoxStream, StreamExt, TryStreamExt};
use reqwest::{Client, RequestBuilder, Response, StatusCode, Url};
use serde::Deserialize;
use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;

use crate::config::StoreConfig;
use crate::error::{StoreError, StoreResult};
use crate::query::DocumentQuery;
use crate::traits::{DocumentStore, TokenCredential};

/// REST API version sent with every request
pub const API_VERSION: &str = "2018-12-31";

const CONTINUATION_HEADER: &str = "x-ms-continuation";

/// Maximum documents per query page
const PAGE_SIZE: u32 = 100;

#[derive(Debug, Deserialize)]
struct QueryPage {
    #[serde(rename = "Documents", default)]
    documents: Vec<Value>,
}

/// Cosmos DB container client
pub struct CosmosStore {
    client: Client,
    endpoint: String,
    database: String,
    container: String,
    credential: Arc<dyn TokenCredential>,
}

impl CosmosStore {
    /// Create a container client
    ///
    /// # Errors
    ///
    /// Returns an error if the endpoint, database or container is empty or
    /// the HTTP client cannot be built.
    pub fn new(config: &StoreConfig, credential: Arc<dyn TokenCredential>) -> StoreResult<Self> {
        if config.endpoint.is_empty() {
            return Err(StoreError::Config("store endpoint is not set".to_string()));
        }
        if config.database.is_empty() {
            return Err(StoreError::Config("store database is not set".to_string()));
        }
        if config.container.is_empty() {
            return Err(StoreError::Config("store container is not set".to_string()));
        }

        let client = Client::builder()
            .timeout(Duration::from_secs(30))
            .build()
            .map_err(|e| StoreError::Config(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self {
            client,
            endpoint: config.endpoint.trim_end_matches('/').to_string(),
            database: config.database.clone(),
            container: config.container.clone(),
            credential,
        })
    }

    fn documents_url(&self) -> String {
        format!(
            "{}/dbs/{}/colls/{}/docs",
            self.endpoint, self.database, self.container
        )
    }

    async fn authorized(&self, request: RequestBuilder) -> StoreResult<RequestBuilder> {
        let token = self.credential.access_token().await?;

        Ok(request
            .header("authorization", format!("type%3Daad%26ver%3D1.0%26sig%3D{}", token.token))
            .header("x-ms-date", Utc::now().format("%a, %d %b %Y %H:%M:%S GMT").to_string())
            .header("x-ms-version", API_VERSION))
    }

    async fn query_page(
        &self,
        body: &Value,
        continuation: Option<&str>,
    ) -> StoreResult<(Vec<Value>, Option<String>)> {
        let mut request = self
            .client
            .post(self.documents_url())
            .header("content-type", "application/query+json")
            .header("x-ms-documentdb-isquery", "True")
            .header("x-ms-documentdb-query-enablecrosspartition", "True")
            .header("x-ms-max-item-count", PAGE_SIZE.to_string());

        if let Some(token) = continuation {
            request = request.header(CONTINUATION_HEADER, token);
        }

        let response = self
            .authorized(request)
            .await?
            .body(body.to_string())
            .send()
            .await?;
        let response = ensure_success(response).await?;

        let next = response
            .headers()
            .get(CONTINUATION_HEADER)
            .and_then(|v| v.to_str().ok())
            .filter(|v| !v.is_empty())
            .map(str::to_string);

        let page: QueryPage = response.json().await?;
        debug!(
            "Query page returned {} documents, more={}",
            page.documents.len(),
            next.is_some()
        );

        Ok((page.documents, next))
    }
}

/// Scope for tokens accepted by a store endpoint, `{scheme}://{host}/.default`
pub fn scope_for_endpoint(endpoint: &str) -> StoreResult<String> {
    let url = Url::parse(endpoint)
        .map_err(|e| StoreError::Config(format!("Invalid store endpoint '{}': {}", endpoint, e)))?;
    let host = url
        .host_str()
        .ok_or_else(|| StoreError::Config(format!("Store endpoint '{}' has no host", endpoint)))?;

    Ok(format!("{}://{}/.default", url.scheme(), host))
}

fn partition_key_header(partition_key: &str) -> String {
    Value::Array(vec![Value::String(partition_key.to_string())]).to_string()
}

async fn ensure_success(response: Response) -> StoreResult<Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let message = response.text().await.unwrap_or_default();
    Err(StoreError::Status {
        status: status.as_u16(),
        message,
    })
}

#[async_trait]
impl DocumentStore for CosmosStore {
    async fn read_document(&self, id: &str, partition_key: &str) -> StoreResult<Option<Value>> {
        let request = self
            .client
            .get(format!("{}/{}", self.documents_url(), id))
            .header("x-ms-documentdb-partitionkey", partition_key_header(partition_key));

        let response = self.authorized(request).await?.send().await?;
        if response.status() == StatusCode::NOT_FOUND {
            return Ok(None);
        }

        let response = ensure_success(response).await?;
        Ok(Some(response.json().await?))
    }

    fn query_documents(&self, query: DocumentQuery) -> BoxStream<'_, StoreResult<Value>> {
        let body = query.to_request_body();

        // None: exhausted, Some(None): first page, Some(Some(token)): next page
        stream::try_unfold(Some(None::<String>), move |cursor| {
            let body = body.clone();
            async move {
                let Some(continuation) = cursor else {
                    return Ok::<_, StoreError>(None);
                };
                let (documents, next) = self.query_page(&body, continuation.as_deref()).await?;
                Ok(Some((documents, next.map(Some))))
            }
        })
        .map_ok(|documents| stream::iter(documents.into_iter().map(Ok::<Value, StoreError>)))
        .try_flatten()
        .boxed()
    }

    async fn upsert_document(&self, partition_key: &str, document: Value) -> StoreResult<()> {
        let request = self
            .client
            .post(self.documents_url())
            .header("content-type", "application/json")
            .header("x-ms-documentdb-is-upsert", "True")
            .header("x-ms-documentdb-partitionkey", partition_key_header(partition_key));

        let response = self
            .authorized(request)
            .await?
            .body(document.to_string())
            .send()
            .await?;
        ensure_success(response).await?;

        Ok(())
    }

    async fn ping(&self) -> StoreResult<()> {
        self.credential.access_token().await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::traits::AccessToken;
    use mockito::{Matcher, Server};
    use serde_json::json;

    struct FixedCredential(Option<&'static str>);

    #[async_trait]
    impl TokenCredential for FixedCredential {
        async fn access_token(&self) -> StoreResult<AccessToken> {
            match self.0 {
                Some(token) => Ok(AccessToken::new(token, Utc::now() + chrono::Duration::hours(1))),
                None => Err(StoreError::Credential("no token".to_string())),
            }
        }
    }

    fn store(server: &Server) -> CosmosStore {
        let config = StoreConfig::new(format!("{}/", server.url()), "vaccineid");
        CosmosStore::new(&config, Arc::new(FixedCredential(Some("aad-token")))).unwrap()
    }

    const DOCS: &str = "/dbs/vaccineid/colls/patients/docs";

    #[test]
    fn test_scope_for_endpoint_drops_port_and_path() {
        assert_eq!(
            scope_for_endpoint("https://acct.documents.azure.com:443/").unwrap(),
            "https://acct.documents.azure.com/.default"
        );
    }

    #[test]
    fn test_scope_for_endpoint_rejects_garbage() {
        assert!(matches!(
            scope_for_endpoint("not a url"),
            Err(StoreError::Config(_))
        ));
    }

    #[test]
    fn test_new_requires_endpoint_and_database() {
        let credential: Arc<dyn TokenCredential> = Arc::new(FixedCredential(None));
        assert!(CosmosStore::new(&StoreConfig::new("", "db"), credential.clone()).is_err());
        assert!(CosmosStore::new(&StoreConfig::new("https://localhost", ""), credential).is_err());
    }

    #[tokio::test]
    async fn test_read_document_sends_partition_key_and_auth() {
        let mut server = Server::new_async().await;
        let mock = server
            .mock("GET", format!("{}/patient-1", DOCS).as_str())
            .match_header("authorization", "type%3Daad%26ver%3D1.0%26sig%3Daad-token")
            .match_header("x-ms-version", API_VERSION)
            .match_header("x-ms-documentdb-partitionkey", r#"["patient-1"]"#)
            .match_header("x-ms-date", Matcher::Regex("GMT$".to_string()))
            .with_status(200)
            .with_body(r#"{"id":"patient-1","name":"ANN"}"#)
            .create_async()
            .await;

        let doc = store(&server).read_document("patient-1", "patient-1").await.unwrap();

        assert_eq!(doc, Some(json!({"id": "patient-1", "name": "ANN"})));
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_read_document_not_found() {
        let mut server = Server::new_async().await;
        let _mock = server
            .mock("GET", format!("{}/missing", DOCS).as_str())
            .with_status(404)
            .with_body(r#"{"code":"NotFound"}"#)
            .create_async()
            .await;

        let doc = store(&server).read_document("missing", "missing").await.unwrap();
        assert!(doc.is_none());
    }

    #[tokio::test]
    async fn test_read_document_server_error() {
        let mut server = Server::new_async().await;
        let _mock = server
            .mock("GET", format!("{}/patient-1", DOCS).as_str())
            .with_status(503)
            .with_body("unavailable")
            .create_async()
            .await;

        let err = store(&server).read_document("patient-1", "patient-1").await.unwrap_err();
        assert!(matches!(err, StoreError::Status { status: 503, .. }));
    }

    #[tokio::test]
    async fn test_upsert_document() {
        let mut server = Server::new_async().await;
        let mock = server
            .mock("POST", DOCS)
            .match_header("x-ms-documentdb-is-upsert", "True")
            .match_header("x-ms-documentdb-partitionkey", r#"["patient-1"]"#)
            .match_body(Matcher::Json(json!({"id": "patient-1", "immunizations": []})))
            .with_status(201)
            .with_body("{}")
            .create_async()
            .await;

        store(&server)
            .upsert_document("patient-1", json!({"id": "patient-1", "immunizations": []}))
            .await
            .unwrap();

        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_query_follows_continuation() {
        let mut server = Server::new_async().await;
        let first = server
            .mock("POST", DOCS)
            .match_header("x-ms-documentdb-isquery", "True")
            .match_header("x-ms-documentdb-query-enablecrosspartition", "True")
            .match_header("content-type", "application/query+json")
            .match_header(CONTINUATION_HEADER, Matcher::Missing)
            .match_body(Matcher::PartialJson(json!({
                "query": "SELECT * FROM c WHERE c.surname = @surname",
                "parameters": [{"name": "@surname", "value": "LEE"}]
            })))
            .with_status(200)
            .with_header(CONTINUATION_HEADER, "page-2")
            .with_body(r#"{"Documents":[{"id":"a"}],"_count":1}"#)
            .create_async()
            .await;
        let second = server
            .mock("POST", DOCS)
            .match_header(CONTINUATION_HEADER, "page-2")
            .with_status(200)
            .with_body(r#"{"Documents":[{"id":"b"},{"id":"c"}],"_count":2}"#)
            .create_async()
            .await;

        let store = store(&server);
        let docs: Vec<Value> = store
            .query_documents(DocumentQuery::new().where_eq("surname", "LEE"))
            .try_collect()
            .await
            .unwrap();

        let ids: Vec<&str> = docs.iter().filter_map(|d| d["id"].as_str()).collect();
        assert_eq!(ids, vec!["a", "b", "c"]);
        first.assert_async().await;
        second.assert_async().await;
    }

    #[tokio::test]
    async fn test_query_stops_after_first_match_when_not_polled() {
        let mut server = Server::new_async().await;
        let first = server
            .mock("POST", DOCS)
            .match_header(CONTINUATION_HEADER, Matcher::Missing)
            .with_status(200)
            .with_header(CONTINUATION_HEADER, "page-2")
            .with_body(r#"{"Documents":[{"id":"a"}]}"#)
            .expect(1)
            .create_async()
            .await;
        let second = server
            .mock("POST", DOCS)
            .match_header(CONTINUATION_HEADER, "page-2")
            .with_status(200)
            .with_body(r#"{"Documents":[]}"#)
            .expect(0)
            .create_async()
            .await;

        let store = store(&server);
        let mut matches = store.query_documents(DocumentQuery::new().where_eq("surname", "LEE"));
        let doc = matches.try_next().await.unwrap();

        assert_eq!(doc, Some(json!({"id": "a"})));
        first.assert_async().await;
        second.assert_async().await;
    }

    #[tokio::test]
    async fn test_query_error_surfaces() {
        let mut server = Server::new_async().await;
        let _mock = server
            .mock("POST", DOCS)
            .with_status(400)
            .with_body(r#"{"code":"BadRequest"}"#)
            .create_async()
            .await;

        let store = store(&server);
        let result: StoreResult<Vec<Value>> = store
            .query_documents(DocumentQuery::new())
            .try_collect()
            .await;

        assert!(matches!(result, Err(StoreError::Status { status: 400, .. })));
    }

    #[tokio::test]
    async fn test_ping_requires_credential() {
        let config = StoreConfig::new("https://acct.documents.azure.com:443/", "vaccineid");

        let healthy = CosmosStore::new(&config, Arc::new(FixedCredential(Some("t")))).unwrap();
        assert!(healthy.ping().await.is_ok());

        let broken = CosmosStore::new(&config, Arc::new(FixedCredential(None))).unwrap();
        assert!(matches!(broken.ping().await, Err(StoreError::Credential(_))));
    }
}
