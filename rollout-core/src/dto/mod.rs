//! Data Transfer Objects
//!
//! This module contains DTOs exchanged with the external scheduler
//! (job registrations, folders) and the reports produced by reconciliation.

pub mod job;
pub mod seed;
