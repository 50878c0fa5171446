use std::collections::HashSet;
use std::future::Future;
use std::pin::Pin;
use std::sync::{Arc, Mutex};

use anyhow::anyhow;
use tokio::sync::mpsc;

use assetflow::dag::ScheduledTask;
use assetflow::engine::{RuntimeEvent, TaskOutcome};
use assetflow::errors::Result;
use assetflow::exec::ExecutorBackend;

/// Executor that runs nothing.
///
/// Each dispatched task is appended to `executed` and answered right away.
/// Names registered through [`FakeExecutor::failing`] complete with
/// `Failed(1)`; other long-lived tasks report readiness and the rest
/// complete successfully.
pub struct FakeExecutor {
    runtime_tx: mpsc::Sender<RuntimeEvent>,
    executed: Arc<Mutex<Vec<String>>>,
    failing: HashSet<String>,
}

impl FakeExecutor {
    pub fn new(runtime_tx: mpsc::Sender<RuntimeEvent>, executed: Arc<Mutex<Vec<String>>>) -> Self {
        Self {
            runtime_tx,
            executed,
            failing: HashSet::new(),
        }
    }

    pub fn failing(mut self, task: &str) -> Self {
        self.failing.insert(task.to_string());
        self
    }

    fn answer(&self, task: &ScheduledTask) -> RuntimeEvent {
        let name = task.name.clone();
        if self.failing.contains(&name) {
            return RuntimeEvent::TaskCompleted {
                task: name,
                outcome: TaskOutcome::Failed(1),
            };
        }
        if task.long_lived {
            return RuntimeEvent::TaskProgressed { task: name };
        }
        RuntimeEvent::TaskCompleted {
            task: name,
            outcome: TaskOutcome::Success,
        }
    }
}

impl ExecutorBackend for FakeExecutor {
    fn spawn_ready_tasks(
        &mut self,
        tasks: Vec<ScheduledTask>,
    ) -> Pin<Box<dyn Future<Output = Result<()>> + Send + '_>> {
        Box::pin(async move {
            for task in tasks {
                self.executed.lock().unwrap().push(task.name.clone());
                let event = self.answer(&task);
                self.runtime_tx
                    .send(event)
                    .await
                    .map_err(|_| anyhow!("runtime channel closed"))?;
            }
            Ok(())
        })
    }
}
