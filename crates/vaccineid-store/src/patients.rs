//! Patient store adapter
//!
//! Typed patient operations over a [`DocumentStore`]. Patient documents are
//! partitioned by id, so lookups by name, surname and date of birth are
//! cross-partition scans.
//!
//! # Concurrency
//!
//! [`PatientStore::create_if_absent`] is check-then-act and
//! [`PatientStore::append_record`] is read-modify-write. Neither is atomic:
//! two concurrent creates for the same person can both succeed, and two
//! concurrent appends to one patient can lose the first writer's record.

use futures::stream::{BoxStream, StreamExt, TryStreamExt};
use serde_json::Value;
use std::sync::Arc;
use tracing::{debug, info};
use uuid::Uuid;
use vaccineid_core::{ImmunizationRecord, Patient};

use crate::error::{StoreError, StoreResult};
use crate::query::DocumentQuery;
use crate::traits::DocumentStore;

/// Result of [`PatientStore::create_if_absent`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CreateOutcome {
    /// New profile stored under this id
    Created(String),
    /// A profile with the same name, surname and date of birth exists
    AlreadyExists,
}

/// Result of [`PatientStore::append_record`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AppendOutcome {
    Appended,
    PatientNotFound,
}

/// Patient operations over a shared document store
#[derive(Clone)]
pub struct PatientStore {
    store: Arc<dyn DocumentStore>,
}

impl PatientStore {
    pub fn new(store: Arc<dyn DocumentStore>) -> Self {
        Self { store }
    }

    /// Look up a patient by id
    pub async fn get_by_id(&self, id: &str) -> StoreResult<Option<Patient>> {
        match self.store.read_document(id, id).await? {
            Some(document) => Ok(Some(serde_json::from_value(document)?)),
            None => Ok(None),
        }
    }

    /// Stream patients whose stored name, surname and dob equal the arguments
    ///
    /// Values are compared as given; pass upper-cased names to match the
    /// stored form.
    pub fn find_by_name_surname_dob(
        &self,
        name: &str,
        surname: &str,
        dob: &str,
    ) -> BoxStream<'_, StoreResult<Patient>> {
        let query = DocumentQuery::new()
            .where_eq("name", name)
            .where_eq("surname", surname)
            .where_eq("dob", dob);
        self.patients(query)
    }

    /// Stream patients with the given stored surname and dob
    pub fn search_by_surname_dob(&self, surname: &str, dob: &str) -> BoxStream<'_, StoreResult<Patient>> {
        let query = DocumentQuery::new()
            .where_eq("surname", surname)
            .where_eq("dob", dob);
        self.patients(query)
    }

    fn patients(&self, query: DocumentQuery) -> BoxStream<'_, StoreResult<Patient>> {
        self.store
            .query_documents(query)
            .and_then(|document| async move {
                serde_json::from_value::<Patient>(document).map_err(StoreError::from)
            })
            .boxed()
    }

    /// Create a profile unless one with the same name, surname and dob exists
    ///
    /// Name and surname are upper-cased before the duplicate check and in the
    /// stored document. The new profile has a random v4 id and no
    /// immunizations.
    pub async fn create_if_absent(&self, name: &str, surname: &str, dob: &str) -> StoreResult<CreateOutcome> {
        let name = name.to_uppercase();
        let surname = surname.to_uppercase();

        let existing = self
            .find_by_name_surname_dob(&name, &surname, dob)
            .try_next()
            .await?;
        if let Some(patient) = existing {
            debug!("Patient profile already exists as {}", patient.id);
            return Ok(CreateOutcome::AlreadyExists);
        }

        let id = Uuid::new_v4().to_string();
        let patient = Patient::new(id.clone(), &name, &surname, dob);
        self.store
            .upsert_document(&id, serde_json::to_value(&patient)?)
            .await?;

        info!("Created patient profile {}", id);
        Ok(CreateOutcome::Created(id))
    }

    /// Append an immunization record to a patient's history
    ///
    /// The stored document is edited as read, so fields outside the patient
    /// model survive the write.
    pub async fn append_record(&self, id: &str, record: ImmunizationRecord) -> StoreResult<AppendOutcome> {
        let Some(mut document) = self.store.read_document(id, id).await? else {
            return Ok(AppendOutcome::PatientNotFound);
        };

        let invalid = |reason: &str| StoreError::InvalidDocument {
            id: id.to_string(),
            reason: reason.to_string(),
        };
        let immunizations = document
            .as_object_mut()
            .ok_or_else(|| invalid("not an object"))?
            .entry("immunizations")
            .or_insert_with(|| Value::Array(Vec::new()))
            .as_array_mut()
            .ok_or_else(|| invalid("immunizations is not an array"))?;

        immunizations.push(serde_json::to_value(&record)?);
        let total = immunizations.len();
        self.store.upsert_document(id, document).await?;

        info!("Appended immunization record to patient {} ({} total)", id, total);
        Ok(AppendOutcome::Appended)
    }

    /// Check the store client can be established
    pub async fn ping(&self) -> StoreResult<()> {
        self.store.ping().await
    }
}
