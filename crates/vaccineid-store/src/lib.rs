//! Document store access for the VaccineID patient service
//!
//! This crate provides the patient store adapter and the document store
//! backends it runs on.
//!
//! # Features
//!
//! - **Patient Store Adapter**: lookup by id, predicate search, create-if-absent
//!   and append-record over any [`DocumentStore`]
//! - **Cosmos DB**: REST client for the SQL API with cross-partition queries
//! - **Workload identity**: cached, self-refreshing store access tokens
//! - **Memory store**: in-process backend for tests and local runs
//!
//! # Quick Start
//!
//! ```no_run
//! use std::sync::Arc;
//! use vaccineid_store::{CreateOutcome, MemoryStore, PatientStore};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let patients = PatientStore::new(Arc::new(MemoryStore::new()));
//!
//!     if let CreateOutcome::Created(id) = patients.create_if_absent("ann", "lee", "1990-05-02").await? {
//!         let patient = patients.get_by_id(&id).await?;
//!         println!("{:?}", patient);
//!     }
//!
//!     Ok(())
//! }
//! ```

pub mod config;
pub mod cosmos;
pub mod credential;
pub mod error;
pub mod memory;
pub mod patients;
pub mod query;
pub mod traits;

pub use config::{StoreConfig, WorkloadIdentityConfig};
pub use cosmos::{scope_for_endpoint, CosmosStore};
pub use credential::WorkloadIdentityCredential;
pub use error::{StoreError, StoreResult};
pub use memory::MemoryStore;
pub use patients::{AppendOutcome, CreateOutcome, PatientStore};
pub use query::DocumentQuery;
pub use traits::{AccessToken, DocumentStore, TokenCredential};
