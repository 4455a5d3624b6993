//! Rollout Seed
//!
//! Registers one build and one deploy job per registry entry with the job
//! scheduler, creating missing folders on the way. Reconciliation is
//! idempotent: a job is only written when its derived registration differs
//! from what the scheduler already holds.

pub mod config;
pub mod reconcile;

pub use config::SeedConfig;
pub use reconcile::{reconcile, reconcile_service};
