// src/dag/task_info.rs

//! Scheduler bookkeeping for a single task.

use crate::dag::plan::PlanNode;
use crate::engine::TaskName;

/// Where a task stands in the active run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RunState {
    /// Not part of the active run, or no run is active.
    #[default]
    NotInRun,
    /// In the run, waiting for its dependencies.
    Pending,
    /// Handed to the executor.
    Running,
    /// Completed, or (long-lived) reported ready.
    Succeeded,
    /// Failed, or blocked by a failed dependency.
    Failed,
}

impl RunState {
    /// Still holding the run open.
    pub fn is_active(self) -> bool {
        matches!(self, RunState::Pending | RunState::Running)
    }
}

#[derive(Debug, Clone)]
pub struct TaskInfo {
    pub name: TaskName,
    pub long_lived: bool,
    pub rerun: bool,
    pub deps: Vec<TaskName>,
    pub state: RunState,
    /// Run id of the latest success. Survives across runs so a later run
    /// can skip dependencies that already did their work.
    pub last_success: Option<u64>,
    pub last_failure: Option<u64>,
}

impl TaskInfo {
    pub fn new(node: &PlanNode) -> Self {
        Self {
            name: node.name.clone(),
            long_lived: node.long_lived,
            rerun: node.rerun,
            deps: node.after.clone(),
            state: RunState::NotInRun,
            last_success: None,
            last_failure: None,
        }
    }

    pub fn succeed(&mut self, run_id: u64) {
        self.state = RunState::Succeeded;
        self.last_success = Some(run_id);
    }

    pub fn fail(&mut self, run_id: u64) {
        self.state = RunState::Failed;
        self.last_failure = Some(run_id);
    }

    /// Has this task been dispatched in any earlier run?
    pub fn ran_before(&self) -> bool {
        self.last_success.is_some() || self.last_failure.is_some()
    }

    pub fn schedule(&self, run_id: u64) -> ScheduledTask {
        ScheduledTask {
            name: self.name.clone(),
            long_lived: self.long_lived,
            rerun: self.rerun,
            run_id,
        }
    }
}

/// A task the scheduler wants executed now.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScheduledTask {
    pub name: TaskName,
    /// Reports readiness through `TaskProgressed` instead of completing.
    pub long_lived: bool,
    /// A new request cancels a still-running instance.
    pub rerun: bool,
    /// Run this dispatch belongs to.
    pub run_id: u64,
}
