//! Custom extractors
//!
//! Request bodies are read leniently so that a missing or unparsable body
//! surfaces as a validation error from the handler, never as a rejection.

use axum::{
    body::Bytes,
    extract::{FromRequest, Request},
};
use serde_json::{Map, Value};
use std::convert::Infallible;
use tracing::debug;

/// JSON object body, or `None` when the body is absent or not an object
///
/// The `Content-Type` header is not checked.
pub struct JsonObject(pub Option<Map<String, Value>>);

impl JsonObject {
    /// Borrow the parsed fields
    pub fn fields(&self) -> Option<&Map<String, Value>> {
        self.0.as_ref()
    }
}

#[axum::async_trait]
impl<S> FromRequest<S> for JsonObject
where
    S: Send + Sync,
{
    type Rejection = Infallible;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let bytes = match Bytes::from_request(req, state).await {
            Ok(bytes) => bytes,
            Err(rejection) => {
                debug!("Failed to read request body: {}", rejection);
                return Ok(Self(None));
            }
        };

        match serde_json::from_slice::<Value>(&bytes) {
            Ok(Value::Object(map)) => Ok(Self(Some(map))),
            Ok(_) => Ok(Self(None)),
            Err(e) => {
                debug!("Request body is not JSON: {}", e);
                Ok(Self(None))
            }
        }
    }
}
