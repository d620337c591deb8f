//! Server configuration
//!
//! Sources, lowest precedence first:
//!
//! 1. built-in defaults
//! 2. optional `config/server.{yaml,toml,json}`
//! 3. `VACCINEID_*` environment variables, `__` between nested keys
//!    (`VACCINEID_AUTH__REQUIRED_SCOPE`)
//! 4. the deployment variables listed in [`DEPLOYMENT_VARS`]

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use vaccineid_store::{StoreConfig, WorkloadIdentityConfig};

/// Scope every caller token must carry
pub const DEFAULT_REQUIRED_SCOPE: &str = "VaccineID.Admin";

/// Authority serving the JWKS and issuing caller tokens
pub const DEFAULT_JWKS_AUTHORITY: &str = "https://login.microsoftonline.com";

/// Plain environment variables and the config keys they set
pub const DEPLOYMENT_VARS: &[(&str, &str)] = &[
    ("AZURE_CLIENT_ID", "identity.client_id"),
    ("AZURE_TENANT_ID", "identity.tenant_id"),
    ("AZURE_AUTHORITY_HOST", "identity.authority_host"),
    ("AZURE_FEDERATED_TOKEN_FILE", "identity.federated_token_file"),
    ("COSMOS_URL", "store.endpoint"),
    ("COSMOS_DB", "store.database"),
    ("JWT_AUD", "auth.audience"),
    ("TENANT_ID", "auth.tenant_id"),
];

/// Caller token verification settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AuthConfig {
    /// Tenant whose keys sign caller tokens; also part of the expected issuer
    pub tenant_id: String,

    /// Expected `aud` claim
    pub audience: String,

    /// Exact `scp` claim required for access
    pub required_scope: String,

    /// Base URL of the JWKS and issuer, without trailing slash
    pub jwks_authority: String,

    /// How long a fetched key set is trusted before refetching
    pub key_cache_ttl_secs: u64,
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            tenant_id: String::new(),
            audience: String::new(),
            required_scope: DEFAULT_REQUIRED_SCOPE.to_string(),
            jwks_authority: DEFAULT_JWKS_AUTHORITY.to_string(),
            key_cache_ttl_secs: 3600,
        }
    }
}

impl AuthConfig {
    fn authority(&self) -> &str {
        self.jwks_authority.trim_end_matches('/')
    }

    /// `{authority}/{tenant_id}/discovery/v2.0/keys`
    pub fn jwks_url(&self) -> String {
        format!("{}/{}/discovery/v2.0/keys", self.authority(), self.tenant_id)
    }

    /// `{authority}/{tenant_id}/v2.0`
    pub fn issuer(&self) -> String {
        format!("{}/{}/v2.0", self.authority(), self.tenant_id)
    }
}

/// Server configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Server host
    pub host: String,

    /// Server port (HTTP)
    pub port: u16,

    /// Log level for the workspace crates when `RUST_LOG` is unset
    pub log_level: String,

    /// Emit logs as JSON lines
    pub log_json: bool,

    /// Caller token verification
    pub auth: AuthConfig,

    /// Document store location
    pub store: StoreConfig,

    /// Workload identity used to reach the store
    pub identity: WorkloadIdentityConfig,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8080,
            log_level: "info".to_string(),
            log_json: false,
            auth: AuthConfig::default(),
            store: StoreConfig::default(),
            identity: WorkloadIdentityConfig::default(),
        }
    }
}

impl ServerConfig {
    /// Load configuration from the process environment and `config/server`
    pub fn load() -> anyhow::Result<Self> {
        // Load .env file if exists
        dotenvy::dotenv().ok();

        Self::from_sources(Some("config/server"), std::env::vars().collect())
    }

    /// Load configuration from an optional file and an explicit variable map
    pub fn from_sources(file: Option<&str>, vars: HashMap<String, String>) -> anyhow::Result<Self> {
        let mut builder = config::Config::builder();

        if let Some(file) = file {
            builder = builder.add_source(config::File::with_name(file).required(false));
        }

        builder = builder.add_source(
            config::Environment::with_prefix("VACCINEID")
                .prefix_separator("_")
                .separator("__")
                .source(Some(vars.clone())),
        );

        for (var, key) in DEPLOYMENT_VARS {
            if let Some(value) = vars.get(*var) {
                builder = builder.set_override(*key, value.as_str())?;
            }
        }

        builder
            .build()
            .and_then(|cfg| cfg.try_deserialize())
            .map_err(|e| anyhow::anyhow!("Failed to load config: {}", e))
    }

    /// Settings that are empty and will make requests fail at runtime
    pub fn missing_settings(&self) -> Vec<&'static str> {
        let checks = [
            ("auth.tenant_id", self.auth.tenant_id.is_empty()),
            ("auth.audience", self.auth.audience.is_empty()),
            ("store.endpoint", self.store.endpoint.is_empty()),
            ("store.database", self.store.database.is_empty()),
            ("identity.client_id", self.identity.client_id.is_empty()),
            ("identity.tenant_id", self.identity.tenant_id.is_empty()),
            (
                "identity.federated_token_file",
                self.identity.federated_token_file.as_os_str().is_empty(),
            ),
        ];

        checks
            .into_iter()
            .filter(|(_, missing)| *missing)
            .map(|(name, _)| name)
            .collect()
    }
}
