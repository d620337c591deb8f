//! REST API implementation
//!
//! - types: application state and response bodies
//! - extractors: lenient JSON body extractor
//! - handlers: patient, record and health endpoints
//! - router: router creation and configuration

mod extractors;
mod handlers;
mod router;
pub mod types;

// Re-export public API
pub use extractors::JsonObject;
pub use router::create_router;
pub use types::{
    AppState, CreatedResponse, HealthResponse, PatientResponse, PatientSummary, SearchResponse,
};
