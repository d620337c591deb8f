//! Application state initialization
//!
//! Wires the configured store, workload identity credential and token
//! verifier into an [`AppState`].

use crate::api::AppState;
use crate::auth::TokenVerifier;
use crate::config::ServerConfig;
use anyhow::{Context, Result};
use reqwest::Client;
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};
use vaccineid_store::{scope_for_endpoint, CosmosStore, PatientStore, WorkloadIdentityCredential};

/// Timeout for JWKS and token exchange requests
const HTTP_TIMEOUT: Duration = Duration::from_secs(30);

/// Build application state from configuration
///
/// Empty auth or identity settings are logged and tolerated; requests that
/// need them fail at runtime. A store without endpoint or database fails
/// here.
pub fn init_state(config: &ServerConfig) -> Result<AppState> {
    for setting in config.missing_settings() {
        warn!("Configuration value {} is not set", setting);
    }

    let client = Client::builder()
        .timeout(HTTP_TIMEOUT)
        .build()
        .context("Failed to create HTTP client")?;

    let scope = scope_for_endpoint(&config.store.endpoint).context("Invalid store configuration")?;
    let credential = WorkloadIdentityCredential::new(client.clone(), config.identity.clone(), scope);
    let store = CosmosStore::new(&config.store, Arc::new(credential))
        .context("Invalid store configuration")?;
    info!(
        "Using document store {} (database {}, container {})",
        config.store.endpoint, config.store.database, config.store.container
    );

    let verifier = TokenVerifier::from_config(&config.auth, client);
    info!(
        "Verifying caller tokens against {} with scope {}",
        config.auth.jwks_url(),
        config.auth.required_scope
    );

    Ok(AppState::new(verifier, PatientStore::new(Arc::new(store))))
}
