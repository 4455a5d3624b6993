//! Run domain types

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::domain::context::ExecutionContext;
use crate::domain::pipeline::{OperationType, PipelineKind};

/// Terminal status of a pipeline run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RunStatus {
    Succeeded,
    Failed,
}

impl std::fmt::Display for RunStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RunStatus::Succeeded => write!(f, "Succeeded"),
            RunStatus::Failed => write!(f, "Failed"),
        }
    }
}

/// Outcome of one executed operation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum StageStatus {
    Succeeded,
    /// Failed but configured as non-fatal
    Advisory,
    Failed,
}

/// Timeline entry for an executed operation
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StageRecord {
    pub operation: OperationType,
    pub status: StageStatus,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    pub detail: Option<String>,
}

/// Result of a pipeline run
///
/// Exactly one of Succeeded/Failed; a failure names the operation that stopped the run
/// (none when the run was aborted before an operation started).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunResult {
    pub run_id: Uuid,
    pub service: String,
    pub kind: PipelineKind,
    pub status: RunStatus,
    pub failed_operation: Option<OperationType>,
    pub error_detail: Option<String>,
    /// Context as it was when the run ended
    pub context: ExecutionContext,
    pub stages: Vec<StageRecord>,
}

impl RunResult {
    pub fn succeeded(&self) -> bool {
        self.status == RunStatus::Succeeded
    }

    /// Process exit code reported to the scheduler
    pub fn exit_code(&self) -> i32 {
        match self.status {
            RunStatus::Succeeded => 0,
            RunStatus::Failed => 1,
        }
    }
}
