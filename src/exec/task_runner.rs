// src/exec/task_runner.rs

//! One scheduled task from start to `TaskCompleted`.

use std::sync::Arc;

use anyhow::{Result, anyhow};
use tokio::sync::{mpsc, oneshot};
use tracing::{debug, error, info};

use crate::dag::{BuiltinTask, ScheduledTask};
use crate::engine::{RuntimeEvent, TaskOutcome};
use crate::tasks::{TaskContext, TaskReporter, run_builtin};

/// Outcome code for a task body that returned an error.
const FAILURE_CODE: i32 = 1;

/// Run `task` and report how it ended.
///
/// When `cancel_rx` resolves first (a newer instance replaced this one) the
/// task body is dropped and nothing is reported, so a stale completion can
/// never reach the scheduler.
pub async fn run_task(
    task: ScheduledTask,
    ctx: Arc<TaskContext>,
    runtime_tx: mpsc::Sender<RuntimeEvent>,
    cancel_rx: oneshot::Receiver<()>,
) {
    let reporter = TaskReporter::new(task.name.clone(), task.run_id, runtime_tx.clone());
    info!(task = %task.name, run_id = task.run_id, "task started");

    let result = tokio::select! {
        result = execute(&task, ctx, reporter) => result,
        _ = cancel_rx => {
            debug!(task = %task.name, run_id = task.run_id, "task instance cancelled");
            return;
        }
    };

    let outcome = match result {
        Ok(()) => {
            info!(task = %task.name, run_id = task.run_id, "task succeeded");
            TaskOutcome::Success
        }
        Err(err) => {
            error!(task = %task.name, run_id = task.run_id, "task failed: {err:#}");
            TaskOutcome::Failed(FAILURE_CODE)
        }
    };

    let event = RuntimeEvent::TaskCompleted {
        task: task.name.clone(),
        outcome,
    };
    if runtime_tx.send(event).await.is_err() {
        debug!(task = %task.name, "runtime gone; completion dropped");
    }
}

async fn execute(task: &ScheduledTask, ctx: Arc<TaskContext>, reporter: TaskReporter) -> Result<()> {
    let builtin = BuiltinTask::from_name(&task.name)
        .ok_or_else(|| anyhow!("no built-in task named '{}'", task.name))?;
    run_builtin(builtin, ctx, reporter).await
}
