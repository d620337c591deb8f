//! Request validation
//!
//! Stateless checks run by the endpoint handlers after authorization and
//! before any store call. Each endpoint has one function returning a typed,
//! normalized parameter bundle or the first [`ValidationError`] found.
//!
//! # Ordering
//!
//! Required-field presence is checked first, in the order the endpoint lists
//! its fields. Format checks (such as the date check) only run once every
//! field is present, so a missing `dob` reports `MissingField("dob")`, never
//! `InvalidDate`.
//!
//! # Date checks
//!
//! [`validate_date`] checks digit ranges only: month `01`-`12`, day `01`-`31`.
//! `2023-02-30` is accepted.

use crate::error::{ValidationError, ValidationResult};
use crate::patient::ImmunizationRecord;
use regex::Regex;
use serde_json::{Map, Value};
use std::collections::HashMap;
use std::sync::LazyLock;

static UUID_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[0-9a-f]{8}-[0-9a-f]{4}-[0-5][0-9a-f]{3}-[089ab][0-9a-f]{3}-[0-9a-f]{12}$")
        .expect("uuid pattern is valid")
});

static DATE_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[0-9]{4}-(0[1-9]|1[0-2])-(0[1-9]|[12][0-9]|3[01])$")
        .expect("date pattern is valid")
});

/// Fields required by create-patient, in checking order
pub const NEW_PATIENT_FIELDS: &[&str] = &["name", "surname", "dob"];

/// Fields required by search-patients, in checking order
pub const PATIENT_SEARCH_FIELDS: &[&str] = &["surname", "dob"];

/// Fields required by add-immunization-record, in checking order
pub const IMMUNIZATION_FIELDS: &[&str] = &["name", "manufacturer", "provider", "date", "lot"];

/// Validated create-patient parameters
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewPatient {
    pub name: String,
    pub surname: String,
    pub dob: String,
}

/// Validated search-patients parameters
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PatientSearch {
    /// Upper-cased to match the stored form
    pub surname: String,
    pub dob: String,
}

/// String values of a body's required fields
#[derive(Debug, Clone, Default)]
pub struct FieldSet {
    values: HashMap<String, String>,
}

impl FieldSet {
    /// Borrow a field value
    pub fn get(&self, field: &str) -> Option<&str> {
        self.values.get(field).map(String::as_str)
    }

    /// Move a field value out of the set
    ///
    /// Returns an empty string for a field that was not requested.
    pub fn take(&mut self, field: &str) -> String {
        self.values.remove(field).unwrap_or_default()
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

/// Check a patient id is a canonical lowercase UUID (versions 0-5, RFC variant)
pub fn validate_id(id: &str) -> ValidationResult<String> {
    if UUID_PATTERN.is_match(id) {
        Ok(id.to_string())
    } else {
        Err(ValidationError::InvalidId)
    }
}

/// Check a date is `YYYY-MM-DD` with month and day in range
pub fn validate_date(date: &str) -> ValidationResult<String> {
    if DATE_PATTERN.is_match(date) {
        Ok(date.to_string())
    } else {
        Err(ValidationError::InvalidDate)
    }
}

fn field_value<'a>(body: Option<&'a Map<String, Value>>, field: &str) -> Option<&'a Value> {
    body.and_then(|b| b.get(field))
}

/// Collect the required string fields from a request body
///
/// Presence of every field is checked before any value's type, so the first
/// absent field is reported even when an earlier field is not a string.
/// `None` stands for an absent or unparsable body and reports the first
/// field as missing.
pub fn require_fields(body: Option<&Map<String, Value>>, fields: &[&str]) -> ValidationResult<FieldSet> {
    if let Some(missing) = fields.iter().find(|&&field| field_value(body, field).is_none()) {
        return Err(ValidationError::MissingField(missing.to_string()));
    }

    let mut set = FieldSet::default();
    for field in fields {
        let value = field_value(body, field)
            .and_then(Value::as_str)
            .ok_or_else(|| ValidationError::Malformed {
                field: field.to_string(),
            })?;

        set.values.insert(field.to_string(), value.to_string());
    }

    Ok(set)
}

/// Validate a create-patient body
pub fn validate_new_patient(body: Option<&Map<String, Value>>) -> ValidationResult<NewPatient> {
    let mut fields = require_fields(body, NEW_PATIENT_FIELDS)?;
    let dob = validate_date(&fields.take("dob"))?;

    Ok(NewPatient {
        name: fields.take("name"),
        surname: fields.take("surname"),
        dob,
    })
}

/// Validate a search-patients body
pub fn validate_patient_search(body: Option<&Map<String, Value>>) -> ValidationResult<PatientSearch> {
    let mut fields = require_fields(body, PATIENT_SEARCH_FIELDS)?;
    let dob = validate_date(&fields.take("dob"))?;

    Ok(PatientSearch {
        surname: fields.take("surname").to_uppercase(),
        dob,
    })
}

/// Validate an add-immunization-record body
pub fn validate_immunization(body: Option<&Map<String, Value>>) -> ValidationResult<ImmunizationRecord> {
    let mut fields = require_fields(body, IMMUNIZATION_FIELDS)?;
    let date = validate_date(&fields.take("date"))?;

    Ok(ImmunizationRecord {
        name: fields.take("name"),
        manufacturer: fields.take("manufacturer"),
        provider: fields.take("provider"),
        date,
        lot: fields.take("lot"),
    })
}
