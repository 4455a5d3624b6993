//! Rollout Registry
//!
//! This crate turns the declarative service registry into work:
//! - Loading and validating the registry document (JSON or YAML)
//! - Generating the ordered build and deploy pipeline definitions per service
//! - Deriving the scheduler job registrations per service

pub mod error;
pub mod generator;
pub mod loader;

pub use error::{RegistryError, Result};
pub use generator::{generate_build, generate_deploy, job_registration, job_registrations};
pub use loader::{RegistryFormat, find_service, load, load_file};

pub use rollout_core::domain::service::ServiceRecord;
