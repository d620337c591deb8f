//! Store and workload identity configuration types

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Default container holding patient documents
pub const DEFAULT_CONTAINER: &str = "patients";

/// Default Microsoft identity platform authority
pub const DEFAULT_AUTHORITY_HOST: &str = "https://login.microsoftonline.com/";

/// Document store location
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreConfig {
    /// Account endpoint, e.g. `https://account.documents.azure.com:443/`
    pub endpoint: String,

    /// Database name
    pub database: String,

    /// Container name (partitioned by `/id`)
    pub container: String,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            endpoint: String::new(),
            database: String::new(),
            container: DEFAULT_CONTAINER.to_string(),
        }
    }
}

impl StoreConfig {
    pub fn new(endpoint: impl Into<String>, database: impl Into<String>) -> Self {
        Self {
            endpoint: endpoint.into(),
            database: database.into(),
            ..Self::default()
        }
    }

    pub fn with_container(mut self, container: impl Into<String>) -> Self {
        self.container = container.into();
        self
    }
}

/// Workload identity federation settings
///
/// In a cluster these come from the identity webhook's injected
/// `AZURE_CLIENT_ID`, `AZURE_TENANT_ID`, `AZURE_AUTHORITY_HOST` and
/// `AZURE_FEDERATED_TOKEN_FILE` variables.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct WorkloadIdentityConfig {
    /// Application (client) id the federated credential is bound to
    pub client_id: String,

    /// Directory (tenant) id
    pub tenant_id: String,

    /// Authority base URL
    pub authority_host: String,

    /// Path of the projected service account token
    pub federated_token_file: PathBuf,
}

impl Default for WorkloadIdentityConfig {
    fn default() -> Self {
        Self {
            client_id: String::new(),
            tenant_id: String::new(),
            authority_host: DEFAULT_AUTHORITY_HOST.to_string(),
            federated_token_file: PathBuf::new(),
        }
    }
}

impl WorkloadIdentityConfig {
    /// Token endpoint, `{authority_host}/{tenant_id}/oauth2/v2.0/token`
    pub fn token_endpoint(&self) -> String {
        format!(
            "{}/{}/oauth2/v2.0/token",
            self.authority_host.trim_end_matches('/'),
            self.tenant_id
        )
    }
}
