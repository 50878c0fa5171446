// src/dag/scheduler.rs

//! Per-run DAG state machine.
//!
//! A run starts with [`Scheduler::start_new_run`] and ends as soon as no task
//! in it is pending or running. Triggering a task pulls it and everything
//! downstream of it into the run; tasks are handed out once their
//! dependencies are satisfied, and a failure fails its dependents for the
//! rest of the run.

use std::collections::HashMap;

use tracing::{debug, info, warn};

use crate::dag::graph::DagGraph;
use crate::dag::plan::TaskPlan;
use crate::dag::state_manager::StateManager;
use crate::dag::task_info::{RunState, ScheduledTask, TaskInfo};
use crate::engine::{TaskName, TaskOutcome};

/// What changed in one scheduler call.
#[derive(Debug, Clone, Default)]
pub struct SchedulerStep {
    /// Tasks to dispatch now.
    pub newly_scheduled: Vec<ScheduledTask>,
    /// The failed task followed by every dependent it blocked.
    pub newly_failed: Vec<TaskName>,
    /// This call ended the active run.
    pub run_just_finished: bool,
}

#[derive(Debug)]
pub struct Scheduler {
    graph: DagGraph,
    tasks: HashMap<TaskName, TaskInfo>,
    run_counter: u64,
    current_run: Option<u64>,
}

impl Scheduler {
    pub fn from_plan(plan: &TaskPlan) -> Self {
        Self {
            graph: DagGraph::from_plan(plan),
            tasks: plan
                .nodes()
                .map(|node| (node.name.clone(), TaskInfo::new(node)))
                .collect(),
            run_counter: 0,
            current_run: None,
        }
    }

    pub fn is_idle(&self) -> bool {
        self.current_run.is_none()
    }

    /// State of `task` in the active run; `None` for unknown tasks.
    pub fn run_state_of(&self, task: &str) -> Option<RunState> {
        self.tasks.get(task).map(|info| info.state)
    }

    pub fn has_long_lived(&self) -> bool {
        self.tasks.values().any(|info| info.long_lived)
    }

    /// Long-lived tasks that reported ready at least once.
    pub fn ready_long_lived(&self) -> impl Iterator<Item = &str> {
        self.tasks
            .values()
            .filter(|info| info.long_lived && info.last_success.is_some())
            .map(|info| info.name.as_str())
    }

    /// Open a new run. Success history is kept for dependency checks.
    pub fn start_new_run(&mut self) {
        self.run_counter += 1;
        self.current_run = Some(self.run_counter);
        for info in self.tasks.values_mut() {
            info.state = RunState::NotInRun;
        }
        debug!(run_id = self.run_counter, "run started");
    }

    /// Add `task` and its dependents to the run. Opens a run if none is
    /// active.
    pub fn trigger(&mut self, task: &str) -> SchedulerStep {
        if self.current_run.is_none() {
            warn!(task, "trigger without an active run; starting one");
            self.start_new_run();
        }
        if self.tasks.contains_key(task) {
            self.manager().mark_task_and_dependents_pending(task);
        } else {
            warn!(task, "trigger for unknown task ignored");
        }
        self.advance(Vec::new())
    }

    /// A long-lived task is ready: its dependents may start.
    pub fn progress(&mut self, task: &str) -> SchedulerStep {
        let Some(run_id) = self.active_run(task, "progress") else {
            return SchedulerStep::default();
        };
        let Some(info) = self.tasks.get_mut(task) else {
            warn!(task, "progress from unknown task ignored");
            return SchedulerStep::default();
        };
        info.succeed(run_id);
        debug!(task, run_id, "task ready");
        self.advance(Vec::new())
    }

    /// A task finished with `outcome`.
    pub fn complete(&mut self, task: &str, outcome: TaskOutcome) -> SchedulerStep {
        let Some(run_id) = self.active_run(task, "completion") else {
            return SchedulerStep::default();
        };
        let Some(info) = self.tasks.get_mut(task) else {
            warn!(task, "completion from unknown task ignored");
            return self.advance(Vec::new());
        };

        let mut failed = Vec::new();
        match outcome {
            TaskOutcome::Success => {
                info.succeed(run_id);
                debug!(task, run_id, "task succeeded");
            }
            TaskOutcome::Failed(code) => {
                info.fail(run_id);
                warn!(task, run_id, code, "task failed; failing its dependents");
                failed.push(task.to_string());
                failed.extend(self.manager().mark_dependents_failed(task));
            }
        }
        self.advance(failed)
    }

    fn active_run(&self, task: &str, what: &str) -> Option<u64> {
        if self.current_run.is_none() {
            warn!(task, "{what} outside of a run ignored");
        }
        self.current_run
    }

    fn manager(&mut self) -> StateManager<'_> {
        StateManager::new(&self.graph, &mut self.tasks, self.current_run)
    }

    /// Dispatch whatever became ready and close the run when nothing is
    /// left in flight.
    fn advance(&mut self, newly_failed: Vec<TaskName>) -> SchedulerStep {
        let newly_scheduled = self.manager().collect_new_ready_tasks();

        let mut run_just_finished = false;
        if self.current_run.is_some() && self.manager().all_tasks_terminal() {
            info!(run_id = self.current_run, "run finished");
            self.current_run = None;
            run_just_finished = true;
        }

        SchedulerStep {
            newly_scheduled,
            newly_failed,
            run_just_finished,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dag::plan::ExposedTask;

    fn names(step: &SchedulerStep) -> Vec<String> {
        step.newly_scheduled.iter().map(|t| t.name.clone()).collect()
    }

    fn build() -> Scheduler {
        Scheduler::from_plan(&TaskPlan::for_exposed(ExposedTask::Build).unwrap())
    }

    /// Clean done, group done, watch ready.
    fn warm_up(scheduler: &mut Scheduler) {
        scheduler.start_new_run();
        scheduler.trigger("clean");
        scheduler.complete("clean", TaskOutcome::Success);
        for task in ["css", "html", "images", "scripts"] {
            scheduler.complete(task, TaskOutcome::Success);
        }
        scheduler.progress("watch");
    }

    #[test]
    fn clean_gates_the_parallel_group() {
        let mut scheduler = build();
        scheduler.start_new_run();

        assert_eq!(names(&scheduler.trigger("clean")), ["clean"]);
        assert_eq!(scheduler.run_state_of("css"), Some(RunState::Pending));

        let step = scheduler.complete("clean", TaskOutcome::Success);
        assert_eq!(names(&step), ["css", "html", "images", "scripts", "watch"]);
        let run_ids: Vec<u64> = step.newly_scheduled.iter().map(|t| t.run_id).collect();
        assert!(run_ids.iter().all(|id| *id == 1));
    }

    #[test]
    fn watch_readiness_lets_the_run_finish() {
        let mut scheduler = build();
        scheduler.start_new_run();
        scheduler.trigger("clean");
        scheduler.complete("clean", TaskOutcome::Success);
        for task in ["css", "html", "images", "scripts"] {
            scheduler.complete(task, TaskOutcome::Success);
        }
        assert!(!scheduler.is_idle());

        assert_eq!(scheduler.ready_long_lived().count(), 0);

        let step = scheduler.progress("watch");
        assert!(step.run_just_finished);
        assert!(scheduler.is_idle());
        assert_eq!(scheduler.ready_long_lived().collect::<Vec<_>>(), ["watch"]);
    }

    #[test]
    fn later_css_trigger_reuses_clean_history() {
        let mut scheduler = build();
        warm_up(&mut scheduler);

        scheduler.start_new_run();
        let step = scheduler.trigger("css");
        assert_eq!(names(&step), ["css"]);
        assert_eq!(step.newly_scheduled[0].run_id, 2);
        assert_eq!(scheduler.run_state_of("clean"), Some(RunState::NotInRun));

        assert!(scheduler.complete("css", TaskOutcome::Success).run_just_finished);
    }

    #[test]
    fn failed_clean_fails_the_whole_group() {
        let mut scheduler = build();
        scheduler.start_new_run();
        scheduler.trigger("clean");

        let step = scheduler.complete("clean", TaskOutcome::Failed(1));
        assert!(step.newly_scheduled.is_empty());
        assert_eq!(step.newly_failed[0], "clean");
        assert_eq!(step.newly_failed.len(), 6);
        assert!(step.run_just_finished);
        assert_eq!(scheduler.run_state_of("html"), Some(RunState::Failed));
        assert!(scheduler.has_long_lived());
        assert_eq!(scheduler.ready_long_lived().count(), 0);
    }

    #[test]
    fn events_outside_a_run_are_ignored() {
        let mut scheduler = build();
        let step = scheduler.complete("css", TaskOutcome::Success);
        assert!(step.newly_scheduled.is_empty());
        assert!(!step.run_just_finished);
        assert!(scheduler.is_idle());
        assert_eq!(scheduler.run_state_of("nope"), None);
    }
}
