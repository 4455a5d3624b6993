//! Rollout Core
//!
//! Core types and abstractions for the Rollout deployment orchestrator.
//!
//! This crate contains:
//! - Domain types: Core business entities (ServiceRecord, PipelineDefinition, ExecutionContext, etc.)
//! - DTOs: Data exchanged with the external scheduler and reported by the seed process

pub mod domain;
pub mod dto;
