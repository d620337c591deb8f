//! VaccineID Patient Service HTTP Server
//!
//! Serves patient profiles and immunization records.

use anyhow::Result;
use tokio::net::TcpListener;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use vaccineid_server::api::create_router;
use vaccineid_server::bootstrap::init_state;
use vaccineid_server::config::ServerConfig;

#[tokio::main]
async fn main() -> Result<()> {
    // Load configuration
    let config = ServerConfig::load()?;

    // Initialize tracing
    init_tracing(&config.log_level, config.log_json)?;
    info!("Loaded configuration: {:?}", config);

    let state = init_state(&config)?;
    info!("Application state initialized");

    let app = create_router(state);

    // Start server
    let addr = format!("{}:{}", config.host, config.port);
    info!("Starting server on {}", addr);

    let listener = TcpListener::bind(&addr).await?;
    info!("✓ Server listening on http://{}", addr);
    info!("  Health check: http://{}/health", addr);
    info!("  Patients: http://{}/patient", addr);

    axum::serve(listener, app).await?;

    Ok(())
}

/// Initialize tracing subscriber
fn init_tracing(level: &str, json: bool) -> Result<()> {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        format!("vaccineid_server={level},vaccineid_store={level},tower_http=debug").into()
    });

    let registry = tracing_subscriber::registry().with(filter);
    let result = if json {
        registry.with(tracing_subscriber::fmt::layer().json()).try_init()
    } else {
        registry.with(tracing_subscriber::fmt::layer()).try_init()
    };

    result.map_err(|e| anyhow::anyhow!("Failed to initialize tracing: {}", e))
}
