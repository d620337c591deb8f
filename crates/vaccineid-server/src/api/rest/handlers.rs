//! API endpoint handlers
//!
//! Every patient endpoint authorizes the caller first, then validates its
//! inputs, and only then touches the store.

use super::extractors::JsonObject;
use super::types::*;
use crate::auth::Authorization;
use crate::error::ApiError;
use axum::{
    extract::{rejection::PathRejection, Path, Query, State},
    http::{HeaderMap, StatusCode},
    Json,
};
use futures::TryStreamExt;
use std::collections::HashMap;
use tracing::{error, info};
use vaccineid_core::{
    validate_id, validate_immunization, validate_new_patient, validate_patient_search,
    ValidationError,
};
use vaccineid_store::{AppendOutcome, CreateOutcome, StoreError};

/// Map the caller's authorization to an early return
async fn authorize(state: &AppState, headers: &HeaderMap) -> Result<(), ApiError> {
    match state.verifier.authorize_request(headers).await {
        Authorization::Granted => Ok(()),
        Authorization::Denied => Err(ApiError::Forbidden),
        Authorization::Invalid => Err(ApiError::Unauthorized),
    }
}

fn store_failure(context: &'static str) -> impl FnOnce(StoreError) -> ApiError {
    move |e| {
        error!("{} - {}", context, e);
        ApiError::Store(e)
    }
}

/// Health check endpoint
pub(super) async fn health(State(state): State<AppState>) -> (StatusCode, Json<HealthResponse>) {
    let (status, label) = match state.patients.ping().await {
        Ok(()) => (StatusCode::OK, "online"),
        Err(e) => {
            error!("health check failed - {}", e);
            (StatusCode::INTERNAL_SERVER_ERROR, "error")
        }
    };

    (
        status,
        Json(HealthResponse {
            status: label.to_string(),
            version: env!("CARGO_PKG_VERSION").to_string(),
        }),
    )
}

/// Fetch patient endpoint
pub(super) async fn get_patient(
    State(state): State<AppState>,
    headers: HeaderMap,
    Query(params): Query<HashMap<String, String>>,
) -> Result<Json<PatientResponse>, ApiError> {
    info!("getting patient profile...");
    authorize(&state, &headers).await?;

    let id = params.get("id").ok_or(ValidationError::MissingId)?;
    let id = validate_id(id)?;

    let patient = state
        .patients
        .get_by_id(&id)
        .await
        .map_err(store_failure("error getting patient from db"))?;

    match patient {
        Some(patient) => Ok(Json(patient.into())),
        None => {
            info!("patient ({}) not found", id);
            Err(ApiError::NotFound("Patient Not Found"))
        }
    }
}

/// Create patient endpoint
pub(super) async fn create_patient(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: JsonObject,
) -> Result<(StatusCode, Json<CreatedResponse>), ApiError> {
    info!("creating patient profile...");
    authorize(&state, &headers).await?;

    let new_patient = validate_new_patient(body.fields())?;

    let outcome = state
        .patients
        .create_if_absent(&new_patient.name, &new_patient.surname, &new_patient.dob)
        .await
        .map_err(store_failure("error creating patient"))?;

    match outcome {
        CreateOutcome::Created(id) => Ok((StatusCode::CREATED, Json(CreatedResponse { id }))),
        CreateOutcome::AlreadyExists => {
            info!("patient profile already exists");
            Err(ApiError::Conflict)
        }
    }
}

/// Search patients endpoint
pub(super) async fn search_patients(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: JsonObject,
) -> Result<Json<SearchResponse>, ApiError> {
    info!("searching patient profiles...");
    authorize(&state, &headers).await?;

    let search = validate_patient_search(body.fields())?;

    let patients = state
        .patients
        .search_by_surname_dob(&search.surname, &search.dob)
        .map_ok(PatientSummary::from)
        .try_collect::<Vec<_>>()
        .await
        .map_err(store_failure("error searching patients"))?;

    info!("found {} matching patients", patients.len());
    Ok(Json(SearchResponse { patients }))
}

/// Add immunization record endpoint
///
/// An undecodable path segment is reported as an invalid id, after the
/// caller is authorized.
pub(super) async fn add_record(
    State(state): State<AppState>,
    headers: HeaderMap,
    path: Result<Path<String>, PathRejection>,
    body: JsonObject,
) -> Result<(StatusCode, Json<CreatedResponse>), ApiError> {
    info!("adding immunization record...");
    authorize(&state, &headers).await?;

    let Path(id) = path.map_err(|_| ValidationError::InvalidId)?;
    let id = validate_id(&id)?;
    info!("adding record for patient ({})", id);
    let record = validate_immunization(body.fields())?;

    let outcome = state
        .patients
        .append_record(&id, record)
        .await
        .map_err(store_failure("error adding record to patient"))?;

    match outcome {
        AppendOutcome::Appended => Ok((StatusCode::CREATED, Json(CreatedResponse { id }))),
        AppendOutcome::PatientNotFound => {
            info!("patient ({}) not found", id);
            Err(ApiError::NotFound("Not Found"))
        }
    }
}
