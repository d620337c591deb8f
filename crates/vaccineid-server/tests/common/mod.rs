//! Shared helpers for router integration tests

#![allow(dead_code)]

use async_trait::async_trait;
use axum::{
    body::Body,
    http::{header, Request, StatusCode},
    Router,
};
use chrono::Utc;
use futures::stream::{self, BoxStream, StreamExt};
use http_body_util::BodyExt;
use jsonwebtoken::{encode, Algorithm, EncodingKey, Header};
use serde_json::{json, Value};
use std::sync::Arc;
use tower::ServiceExt;
use vaccineid_server::api::{create_router, AppState};
use vaccineid_server::auth::{StaticKeys, TokenVerifier, VerifierSettings};
use vaccineid_store::{
    DocumentQuery, DocumentStore, MemoryStore, PatientStore, StoreError, StoreResult,
};

pub const JWKS: &str = include_str!("../fixtures/jwks.json");
pub const SIGNING_KEY: &[u8] = include_bytes!("../fixtures/signing_key.pem");
pub const KID: &str = "test-key-1";
pub const ISSUER: &str = "https://login.microsoftonline.com/tenant-1/v2.0";
pub const AUDIENCE: &str = "api://vaccineid";
pub const SCOPE: &str = "VaccineID.Admin";

fn verifier() -> TokenVerifier {
    let settings = VerifierSettings {
        issuer: ISSUER.to_string(),
        audience: AUDIENCE.to_string(),
        required_scope: SCOPE.to_string(),
    };
    TokenVerifier::new(settings, Arc::new(StaticKeys::from_json(JWKS).unwrap()))
}

/// Router over the given store, trusting the fixture key
pub fn router_with(store: Arc<dyn DocumentStore>) -> Router {
    create_router(AppState::new(verifier(), PatientStore::new(store)))
}

/// Router over a fresh memory store, with the store for inspection
pub fn test_router() -> (Router, Arc<MemoryStore>) {
    let store = Arc::new(MemoryStore::new());
    (router_with(store.clone()), store)
}

/// Token signed by the fixture key with the given scope
pub fn token_with_scope(scope: &str) -> String {
    let now = Utc::now().timestamp();
    let claims = json!({
        "iss": ISSUER,
        "aud": AUDIENCE,
        "exp": now + 3600,
        "nbf": now - 60,
        "iat": now - 60,
        "scp": scope,
    });

    let mut header = Header::new(Algorithm::RS256);
    header.kid = Some(KID.to_string());
    encode(&header, &claims, &EncodingKey::from_rsa_pem(SIGNING_KEY).unwrap()).unwrap()
}

/// Token carrying the required scope
pub fn admin_token() -> String {
    token_with_scope(SCOPE)
}

/// Send a request and decode the JSON response body
pub async fn send(
    app: &Router,
    method: &str,
    uri: &str,
    token: Option<&str>,
    body: Option<Value>,
) -> (StatusCode, Value) {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(token) = token {
        builder = builder.header(header::AUTHORIZATION, format!("Bearer {}", token));
    }

    let body = match body {
        Some(body) => {
            builder = builder.header(header::CONTENT_TYPE, "application/json");
            Body::from(body.to_string())
        }
        None => Body::empty(),
    };

    let response = app
        .clone()
        .oneshot(builder.body(body).unwrap())
        .await
        .unwrap();

    let status = response.status();
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    let json = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap()
    };

    (status, json)
}

/// Send an authorized request with a raw, possibly non-JSON body
pub async fn send_raw(app: &Router, method: &str, uri: &str, body: &'static str) -> (StatusCode, Value) {
    let request = Request::builder()
        .method(method)
        .uri(uri)
        .header(header::AUTHORIZATION, format!("Bearer {}", admin_token()))
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body))
        .unwrap();

    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    (status, serde_json::from_slice(&bytes).unwrap())
}

/// Create a patient through the API, returning its id
pub async fn create_patient(app: &Router, name: &str, surname: &str, dob: &str) -> String {
    let (status, body) = send(
        app,
        "POST",
        "/patient",
        Some(&admin_token()),
        Some(json!({ "name": name, "surname": surname, "dob": dob })),
    )
    .await;

    assert_eq!(status, StatusCode::CREATED, "{body}");
    body["id"].as_str().unwrap().to_string()
}

/// Store whose every operation fails
pub struct FailingStore;

fn unavailable() -> StoreError {
    StoreError::Status {
        status: 503,
        message: "service unavailable".to_string(),
    }
}

#[async_trait]
impl DocumentStore for FailingStore {
    async fn read_document(&self, _id: &str, _partition_key: &str) -> StoreResult<Option<Value>> {
        Err(unavailable())
    }

    fn query_documents(&self, _query: DocumentQuery) -> BoxStream<'_, StoreResult<Value>> {
        stream::once(async { Err(unavailable()) }).boxed()
    }

    async fn upsert_document(&self, _partition_key: &str, _document: Value) -> StoreResult<()> {
        Err(unavailable())
    }

    async fn ping(&self) -> StoreResult<()> {
        Err(StoreError::Credential("token file not found".to_string()))
    }
}
