//! Rollout Runner
//!
//! Executes one service's build or deploy pipeline.
//!
//! Architecture:
//! - Configuration: Load settings from environment or defaults
//! - Toolchain: Blocking delegation to npm, sonar-scanner, docker, aws, git and helm
//! - Executor: Runs a single operation against the execution context
//! - Runner: Fail-fast sequencing with a scoped, always-removed workspace
//! - Abort: Signal-driven cancellation between operations

pub mod abort;
pub mod config;
pub mod error;
pub mod executor;
pub mod runner;
pub mod toolchain;
pub mod workspace;

pub use abort::spawn_abort_listener;
pub use config::{AnalysisPolicy, Config};
pub use error::OperationError;
pub use executor::{ExecutionResult, OperationExecutor, StandardExecutor};
pub use runner::{CancellationFlag, PipelineRunner, RunState};
pub use toolchain::{CommandToolchain, ReleaseRequest, ToolFailure, Toolchain, ToolchainConfig};
pub use workspace::Workspace;
