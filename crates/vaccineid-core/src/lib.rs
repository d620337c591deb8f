//! VaccineID core types
//!
//! Patient and immunization record models shared by the store and the HTTP
//! server, together with the per-endpoint request validators.

pub mod error;
pub mod patient;
pub mod validation;

pub use error::{ValidationError, ValidationResult};
pub use patient::{title_case, ImmunizationRecord, Patient};
pub use validation::{
    require_fields, validate_date, validate_id, validate_immunization, validate_new_patient,
    validate_patient_search, FieldSet, NewPatient, PatientSearch,
};
