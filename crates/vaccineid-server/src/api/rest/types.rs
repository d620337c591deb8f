//! REST API type definitions
//!
//! Application state and response bodies for the REST API endpoints.

use crate::auth::TokenVerifier;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use vaccineid_core::{ImmunizationRecord, Patient};
use vaccineid_store::PatientStore;

/// Application state
#[derive(Clone)]
pub struct AppState {
    pub verifier: Arc<TokenVerifier>,
    pub patients: Arc<PatientStore>,
}

impl AppState {
    pub fn new(verifier: TokenVerifier, patients: PatientStore) -> Self {
        Self {
            verifier: Arc::new(verifier),
            patients: Arc::new(patients),
        }
    }
}

/// Health check response
#[derive(Debug, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
}

/// Full patient profile, names title-cased
#[derive(Debug, Serialize, Deserialize)]
pub struct PatientResponse {
    pub id: String,
    pub name: String,
    pub surname: String,
    pub dob: String,
    pub immunizations: Vec<ImmunizationRecord>,
}

impl From<Patient> for PatientResponse {
    fn from(patient: Patient) -> Self {
        Self {
            name: patient.display_name(),
            surname: patient.display_surname(),
            id: patient.id,
            dob: patient.dob,
            immunizations: patient.immunizations,
        }
    }
}

/// Search hit, names title-cased
#[derive(Debug, Serialize, Deserialize)]
pub struct PatientSummary {
    pub id: String,
    pub name: String,
    pub surname: String,
    pub dob: String,
}

impl From<Patient> for PatientSummary {
    fn from(patient: Patient) -> Self {
        Self {
            name: patient.display_name(),
            surname: patient.display_surname(),
            id: patient.id,
            dob: patient.dob,
        }
    }
}

/// Search patients response
#[derive(Debug, Serialize, Deserialize)]
pub struct SearchResponse {
    pub patients: Vec<PatientSummary>,
}

/// Id of a created profile or of the patient a record was added to
#[derive(Debug, Serialize, Deserialize)]
pub struct CreatedResponse {
    pub id: String,
}
