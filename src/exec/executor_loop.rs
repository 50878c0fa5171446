// src/exec/executor_loop.rs

//! The loop that owns running task instances.
//!
//! Per task name at most one instance runs at a time. A new request for a
//! task that is still running either replaces it (`rerun`, all finite
//! tasks) or is answered by the running instance (long-lived `watch`).

use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tracing::{debug, info};

use crate::dag::ScheduledTask;
use crate::engine::{RuntimeEvent, TaskName};
use crate::exec::task_runner::run_task;
use crate::tasks::TaskContext;

struct Running {
    /// Dropping or firing this stops the instance without a completion.
    cancel: oneshot::Sender<()>,
    handle: JoinHandle<()>,
}

struct Executor {
    ctx: Arc<TaskContext>,
    runtime_tx: mpsc::Sender<RuntimeEvent>,
    running: HashMap<TaskName, Running>,
}

impl Executor {
    async fn dispatch(&mut self, task: ScheduledTask) {
        self.running.retain(|_, r| !r.handle.is_finished());

        if let Some(current) = self.running.remove(&task.name) {
            if !task.rerun {
                debug!(task = %task.name, run_id = task.run_id, "already running; reusing instance");
                self.running.insert(task.name.clone(), current);
                if task.long_lived {
                    // The live instance is already up: it counts as ready
                    // for this run too.
                    let _ = self
                        .runtime_tx
                        .send(RuntimeEvent::TaskProgressed { task: task.name })
                        .await;
                }
                return;
            }
            info!(task = %task.name, run_id = task.run_id, "restarting task");
            if current.cancel.send(()).is_err() {
                debug!(task = %task.name, "previous instance already gone");
            }
        }

        let (cancel, cancel_rx) = oneshot::channel();
        let name = task.name.clone();
        let handle = tokio::spawn(run_task(
            task,
            Arc::clone(&self.ctx),
            self.runtime_tx.clone(),
            cancel_rx,
        ));
        self.running.insert(name, Running { cancel, handle });
    }
}

/// Start the executor loop and return the sender that feeds it.
pub fn spawn_executor(
    runtime_tx: mpsc::Sender<RuntimeEvent>,
    ctx: Arc<TaskContext>,
) -> mpsc::Sender<ScheduledTask> {
    let (tx, mut rx) = mpsc::channel::<ScheduledTask>(32);
    let mut executor = Executor {
        ctx,
        runtime_tx,
        running: HashMap::new(),
    };

    tokio::spawn(async move {
        while let Some(task) = rx.recv().await {
            executor.dispatch(task).await;
        }
        debug!("executor loop finished");
    });

    tx
}
