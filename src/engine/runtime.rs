// src/engine/runtime.rs

use std::fmt;

use tokio::sync::mpsc;
use tracing::{debug, info};

use crate::errors::Result;
use crate::exec::ExecutorBackend;

use super::core::{CoreCommand, CoreRuntime, RunReport};
use super::RuntimeEvent;

/// Async shell around [`CoreRuntime`]: reads events from a channel and hands
/// dispatched tasks to an executor.
pub struct Runtime<E: ExecutorBackend> {
    core: CoreRuntime,
    event_rx: mpsc::Receiver<RuntimeEvent>,
    executor: E,
}

impl<E: ExecutorBackend> fmt::Debug for Runtime<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Runtime")
            .field("core", &self.core)
            .finish_non_exhaustive()
    }
}

impl<E: ExecutorBackend> Runtime<E> {
    pub fn new(core: CoreRuntime, event_rx: mpsc::Receiver<RuntimeEvent>, executor: E) -> Self {
        Self {
            core,
            event_rx,
            executor,
        }
    }

    /// Process events until the core asks to stop or every sender is gone.
    /// Returns the failures recorded along the way.
    pub async fn run(mut self) -> Result<RunReport> {
        info!("runtime started");

        while let Some(event) = self.event_rx.recv().await {
            debug!(?event, "event");
            let step = self.core.step(event);

            for command in step.commands {
                match command {
                    CoreCommand::DispatchTasks(tasks) => {
                        let names: Vec<&str> = tasks.iter().map(|t| t.name.as_str()).collect();
                        debug!(?names, "dispatching");
                        self.executor.spawn_ready_tasks(tasks).await?;
                    }
                    CoreCommand::RequestExit => debug!("plan finished"),
                }
            }

            if !step.keep_running {
                break;
            }
        }

        let report = self.core.report();
        info!(failed = report.failed.len(), "runtime stopped");
        Ok(report)
    }
}
