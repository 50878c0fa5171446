// src/dag/state_manager.rs

//! Per-run state transitions for the scheduler.

use std::collections::{HashMap, HashSet};

use tracing::{debug, info, warn};

use crate::dag::DagGraph;
use crate::dag::task_info::{RunState, ScheduledTask, TaskInfo};
use crate::engine::TaskName;

/// Whether every dependency of `info` lets it start in the current run.
///
/// A dependency in the run must have succeeded (or, when long-lived,
/// reported ready). A dependency outside the run counts when it succeeded
/// in some earlier run: a stylesheet save re-runs `css` without re-running
/// `clean`.
pub fn deps_satisfied(tasks: &HashMap<TaskName, TaskInfo>, info: &TaskInfo) -> bool {
    info.deps.iter().all(|dep_name| {
        let Some(dep) = tasks.get(dep_name) else {
            warn!(task = %info.name, dep = %dep_name, "unknown dependency");
            return false;
        };
        match dep.state {
            RunState::Succeeded => true,
            RunState::Pending | RunState::Running | RunState::Failed => false,
            RunState::NotInRun => dep.last_success.is_some(),
        }
    })
}

/// Mutable view over the task table for one scheduler step.
pub struct StateManager<'a> {
    graph: &'a DagGraph,
    tasks: &'a mut HashMap<TaskName, TaskInfo>,
    run_id: Option<u64>,
}

impl<'a> StateManager<'a> {
    pub fn new(
        graph: &'a DagGraph,
        tasks: &'a mut HashMap<TaskName, TaskInfo>,
        run_id: Option<u64>,
    ) -> Self {
        Self {
            graph,
            tasks,
            run_id,
        }
    }

    /// Pull `root` and everything downstream of it into the run as
    /// `Pending`. Tasks already in the run keep their state.
    pub fn mark_task_and_dependents_pending(&mut self, root: &str) {
        let mut stack = vec![root.to_string()];
        let mut seen = HashSet::new();

        while let Some(name) = stack.pop() {
            if !seen.insert(name.clone()) {
                continue;
            }
            let Some(info) = self.tasks.get_mut(&name) else {
                warn!(task = %name, "task missing from scheduler table");
                continue;
            };
            if info.state == RunState::NotInRun {
                info.state = RunState::Pending;
                debug!(task = %name, "joined run");
            }
            stack.extend(self.graph.dependents_of(&name).iter().cloned());
        }
    }

    /// Fail everything in the run that (transitively) waits on
    /// `failed_task`. Returns the newly failed names, not including
    /// `failed_task` itself.
    pub fn mark_dependents_failed(&mut self, failed_task: &str) -> Vec<TaskName> {
        let mut stack: Vec<TaskName> = self.graph.dependents_of(failed_task).to_vec();
        let mut failed = Vec::new();

        while let Some(name) = stack.pop() {
            let Some(info) = self.tasks.get_mut(&name) else {
                continue;
            };
            if info.state.is_active() {
                info.state = RunState::Failed;
                debug!(task = %name, upstream = failed_task, "blocked by failed dependency");
                failed.push(name.clone());
                stack.extend(self.graph.dependents_of(&name).iter().cloned());
            }
        }

        failed
    }

    /// Move every `Pending` task whose dependencies are met to `Running`
    /// and return them for dispatch, sorted by name.
    pub fn collect_new_ready_tasks(&mut self) -> Vec<ScheduledTask> {
        let tasks: &HashMap<TaskName, TaskInfo> = self.tasks;
        let mut ready: Vec<TaskName> = tasks
            .values()
            .filter(|info| info.state == RunState::Pending)
            .filter(|info| deps_satisfied(tasks, info))
            .map(|info| info.name.clone())
            .collect();
        ready.sort();

        let run_id = self.run_id.unwrap_or(0);
        ready
            .into_iter()
            .filter_map(|name| {
                let info = self.tasks.get_mut(&name)?;
                info!(task = %name, run_id, rerun = info.ran_before(), "dispatching task");
                info.state = RunState::Running;
                Some(info.schedule(run_id))
            })
            .collect()
    }

    /// No task of the run is still pending or running.
    pub fn all_tasks_terminal(&self) -> bool {
        !self.tasks.values().any(|info| info.state.is_active())
    }
}
