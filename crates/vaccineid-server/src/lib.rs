//! VaccineID Patient Service HTTP Server Library
//!
//! Provides the REST API components for the binary and for integration tests.

pub mod api;
pub mod auth;
pub mod bootstrap;
pub mod config;
pub mod error;
