//! Pipeline runner
//!
//! Executes the operations of one `PipelineDefinition` strictly in order:
//! - Creating an isolated workspace for the run
//! - Threading the execution context through every operation
//! - Stopping at the first failing operation (no retries)
//! - Removing the workspace on every exit path, including panics and cancellation

use chrono::Utc;
use rollout_core::domain::context::{ContextUpdate, ExecutionContext};
use rollout_core::domain::pipeline::{OperationType, PipelineDefinition};
use rollout_core::domain::run::{RunResult, RunStatus, StageRecord, StageStatus};
use std::panic::{self, AssertUnwindSafe};
use std::path::PathBuf;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use crate::executor::OperationExecutor;
use crate::workspace::Workspace;

/// Position of a run in its lifecycle
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunState {
    Idle,
    /// Executing the operation at this index
    Running(usize),
    Succeeded,
    Failed,
}

impl RunState {
    /// Moves to the next operation, or to Succeeded after the last one
    pub fn advance(self, total: usize) -> RunState {
        match self {
            RunState::Idle if total == 0 => RunState::Succeeded,
            RunState::Idle => RunState::Running(0),
            RunState::Running(i) if i + 1 < total => RunState::Running(i + 1),
            RunState::Running(_) => RunState::Succeeded,
            terminal => terminal,
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, RunState::Succeeded | RunState::Failed)
    }
}

/// Abort signal shared with whoever can cancel the run
#[derive(Debug, Clone, Default)]
pub struct CancellationFlag(Arc<AtomicBool>);

impl CancellationFlag {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// Failure that stopped a run
struct Halt {
    operation: Option<OperationType>,
    detail: String,
}

/// Runs pipeline definitions with an operation executor
pub struct PipelineRunner {
    executor: Arc<dyn OperationExecutor>,
    workspace_base: PathBuf,
    cancellation: CancellationFlag,
}

impl PipelineRunner {
    pub fn new(executor: Arc<dyn OperationExecutor>, workspace_base: impl Into<PathBuf>) -> Self {
        Self {
            executor,
            workspace_base: workspace_base.into(),
            cancellation: CancellationFlag::new(),
        }
    }

    /// Uses an externally owned cancellation flag
    pub fn with_cancellation(mut self, cancellation: CancellationFlag) -> Self {
        self.cancellation = cancellation;
        self
    }

    pub fn cancellation(&self) -> CancellationFlag {
        self.cancellation.clone()
    }

    /// Runs a pipeline definition to a terminal state
    ///
    /// Values bound on the definition (environment, version) override the
    /// matching fields of `initial`.
    pub fn run(&self, definition: &PipelineDefinition, initial: ExecutionContext) -> RunResult {
        let run_id = Uuid::new_v4();
        let mut context = initial;
        context.apply(ContextUpdate {
            fields: definition.parameters.clone(),
        });

        info!(
            "Starting {} pipeline for {} (run {}, {} operations)",
            definition.kind,
            definition.service_name,
            run_id,
            definition.operations.len()
        );

        let mut workspace =
            match Workspace::create(&self.workspace_base, &definition.service_name, run_id) {
                Ok(workspace) => workspace,
                Err(e) => {
                    error!("Failed to create workspace: {}", e);
                    return finish(
                        run_id,
                        definition,
                        context,
                        Vec::new(),
                        Some(Halt {
                            operation: None,
                            detail: format!("Failed to create workspace: {}", e),
                        }),
                    );
                }
            };
        context.workspace = Some(workspace.path().to_path_buf());

        let mut stages = Vec::with_capacity(definition.operations.len());
        let mut current = None;

        let outcome = panic::catch_unwind(AssertUnwindSafe(|| {
            self.run_operations(definition, &mut context, &mut stages, &mut current)
        }));

        let halt = match outcome {
            Ok(halt) => halt,
            Err(payload) => {
                let detail = format!("Internal error: {}", panic_message(payload.as_ref()));
                error!("{}", detail);
                Some(Halt {
                    operation: current,
                    detail,
                })
            }
        };

        if let Err(e) = workspace.cleanup() {
            warn!("Failed to remove workspace {}: {}", workspace.path().display(), e);
        }
        context.workspace = None;

        finish(run_id, definition, context, stages, halt)
    }

    /// Drives the state machine; returns the failure that halted the run, if any
    fn run_operations(
        &self,
        definition: &PipelineDefinition,
        context: &mut ExecutionContext,
        stages: &mut Vec<StageRecord>,
        current: &mut Option<OperationType>,
    ) -> Option<Halt> {
        let total = definition.operations.len();
        let mut state = RunState::Idle.advance(total);
        let mut halt = None;

        while !state.is_terminal() {
            let RunState::Running(idx) = state else {
                break;
            };
            let spec = &definition.operations[idx];
            let operation = spec.operation_type();

            if self.cancellation.is_cancelled() {
                warn!("Run cancelled before {}", operation);
                halt = Some(Halt {
                    operation: None,
                    detail: format!("Run cancelled before {}", operation),
                });
                state = RunState::Failed;
                continue;
            }

            *current = Some(operation);
            info!("Executing operation {}/{}: {}", idx + 1, total, operation);

            let started_at = Utc::now();
            let result = self.executor.execute(spec, context);
            let finished_at = Utc::now();

            if !result.success {
                let detail = result
                    .error_detail
                    .unwrap_or_else(|| format!("{} failed", operation));
                error!("Operation {} failed: {}", operation, detail);
                stages.push(StageRecord {
                    operation,
                    status: StageStatus::Failed,
                    started_at,
                    finished_at,
                    detail: Some(detail.clone()),
                });
                halt = Some(Halt {
                    operation: Some(operation),
                    detail,
                });
                state = RunState::Failed;
                continue;
            }

            let status = if result.warning.is_some() {
                StageStatus::Advisory
            } else {
                StageStatus::Succeeded
            };
            stages.push(StageRecord {
                operation,
                status,
                started_at,
                finished_at,
                detail: result.warning,
            });

            if !result.updated_fields.is_empty() {
                debug!("{} updated context: {:?}", operation, result.updated_fields.fields);
            }
            context.apply(result.updated_fields);

            state = state.advance(total);
        }

        debug!("Run reached state {:?}", state);
        halt
    }
}

fn finish(
    run_id: Uuid,
    definition: &PipelineDefinition,
    context: ExecutionContext,
    stages: Vec<StageRecord>,
    halt: Option<Halt>,
) -> RunResult {
    let (status, failed_operation, error_detail) = match halt {
        None => (RunStatus::Succeeded, None, None),
        Some(halt) => (RunStatus::Failed, halt.operation, Some(halt.detail)),
    };

    info!(
        "{} pipeline for {} finished: {}",
        definition.kind, definition.service_name, status
    );

    RunResult {
        run_id,
        service: definition.service_name.clone(),
        kind: definition.kind,
        status,
        failed_operation,
        error_detail,
        context,
        stages,
    }
}

fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "operation panicked".to_string()
    }
}
