// src/exec/backend.rs

//! The seam between the runtime and whatever runs tasks.

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use anyhow::anyhow;
use tokio::sync::mpsc;

use crate::dag::ScheduledTask;
use crate::engine::RuntimeEvent;
use crate::errors::Result;
use crate::tasks::TaskContext;

use super::executor_loop::spawn_executor;

/// Receives tasks the scheduler marked ready.
///
/// Implementations report back through `RuntimeEvent`s: `TaskCompleted`
/// for finite tasks, `TaskProgressed` once a long-lived task is up. The
/// integration tests plug in a fake that answers immediately.
pub trait ExecutorBackend: Send {
    fn spawn_ready_tasks(
        &mut self,
        tasks: Vec<ScheduledTask>,
    ) -> Pin<Box<dyn Future<Output = Result<()>> + Send + '_>>;
}

/// Runs the built-in tasks on the executor loop.
#[derive(Debug)]
pub struct TaskExecutorBackend {
    tx: mpsc::Sender<ScheduledTask>,
}

impl TaskExecutorBackend {
    pub fn new(runtime_tx: mpsc::Sender<RuntimeEvent>, ctx: Arc<TaskContext>) -> Self {
        Self {
            tx: spawn_executor(runtime_tx, ctx),
        }
    }
}

impl ExecutorBackend for TaskExecutorBackend {
    fn spawn_ready_tasks(
        &mut self,
        tasks: Vec<ScheduledTask>,
    ) -> Pin<Box<dyn Future<Output = Result<()>> + Send + '_>> {
        Box::pin(async move {
            for task in tasks {
                self.tx
                    .send(task)
                    .await
                    .map_err(|e| anyhow!("executor loop stopped; dropped task '{}'", e.0.name))?;
            }
            Ok(())
        })
    }
}
