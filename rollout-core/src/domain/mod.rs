//! Core domain types
//!
//! This module contains the core domain structures used across Rollout crates.
//! These types are shared between the registry (loading and generation),
//! the runner (execution) and the seed process (registration).

pub mod context;
pub mod pipeline;
pub mod run;
pub mod service;
