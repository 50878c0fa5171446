// src/engine/core.rs

//! Synchronous heart of the engine.
//!
//! [`CoreRuntime`] consumes one [`RuntimeEvent`] at a time and answers with a
//! [`CoreStep`]: tasks to dispatch and whether to keep going. It owns the
//! scheduler and the trigger queue and never touches channels or the
//! filesystem, so every rule about runs and re-triggers is unit-testable.

use std::collections::BTreeSet;

use tracing::{debug, warn};

use crate::dag::{RunState, ScheduledTask, Scheduler};
use crate::engine::queue::TriggerQueue;
use crate::engine::{RuntimeEvent, RuntimeOptions, TaskName, TaskOutcome, TriggerReason};
use crate::types::TriggerWhileRunningBehaviour;

/// Instruction for the async shell.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CoreCommand {
    DispatchTasks(Vec<ScheduledTask>),
    /// Nothing left to do: a one-shot plan went idle, or no long-lived
    /// task of the plan is up any more.
    RequestExit,
}

#[derive(Debug, Clone)]
pub struct CoreStep {
    pub commands: Vec<CoreCommand>,
    pub keep_running: bool,
}

/// Summary handed back when the runtime stops.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunReport {
    /// Tasks whose most recent execution failed, sorted by name.
    pub failed: Vec<TaskName>,
}

impl RunReport {
    pub fn is_success(&self) -> bool {
        self.failed.is_empty()
    }
}

#[derive(Debug)]
pub struct CoreRuntime {
    scheduler: Scheduler,
    queue: TriggerQueue,
    options: RuntimeOptions,
    failed: BTreeSet<TaskName>,
}

impl CoreRuntime {
    pub fn new(
        scheduler: Scheduler,
        behaviour: TriggerWhileRunningBehaviour,
        queue_length: usize,
        options: RuntimeOptions,
    ) -> Self {
        Self {
            scheduler,
            queue: TriggerQueue::new(behaviour, queue_length),
            options,
            failed: BTreeSet::new(),
        }
    }

    pub fn scheduler(&self) -> &Scheduler {
        &self.scheduler
    }

    /// Failures recorded so far.
    pub fn report(&self) -> RunReport {
        RunReport {
            failed: self.failed.iter().cloned().collect(),
        }
    }

    pub fn is_idle(&self) -> bool {
        self.scheduler.is_idle()
    }

    pub fn queue_is_empty(&self) -> bool {
        self.queue.is_empty()
    }

    pub fn step(&mut self, event: RuntimeEvent) -> CoreStep {
        let mut ready = Vec::new();

        match event {
            RuntimeEvent::ShutdownRequested => {
                return CoreStep {
                    commands: Vec::new(),
                    keep_running: false,
                };
            }
            RuntimeEvent::TaskTriggered { task, reason } => {
                self.on_trigger(task, reason, &mut ready);
                return Self::continue_with(ready);
            }
            RuntimeEvent::TaskProgressed { task } => {
                ready.extend(self.scheduler.progress(&task).newly_scheduled);
            }
            RuntimeEvent::TaskCompleted { task, outcome } => {
                match outcome {
                    TaskOutcome::Success => self.failed.remove(&task),
                    TaskOutcome::Failed(_) => self.failed.insert(task.clone()),
                };
                ready.extend(self.scheduler.complete(&task, outcome).newly_scheduled);
            }
        }

        self.start_queued_run(&mut ready);

        let idle = self.scheduler.is_idle() && self.queue.is_empty();
        if idle && (self.options.exit_when_idle || self.long_lived_down()) {
            let mut step = Self::continue_with(ready);
            step.commands.push(CoreCommand::RequestExit);
            step.keep_running = false;
            return step;
        }
        Self::continue_with(ready)
    }

    /// The plan has long-lived tasks but none of them is up: each one either
    /// failed or never reported ready. Nothing will trigger further work.
    fn long_lived_down(&self) -> bool {
        if !self.scheduler.has_long_lived() {
            return false;
        }
        let up = self
            .scheduler
            .ready_long_lived()
            .any(|task| !self.failed.contains(task));
        if !up {
            warn!(failed = ?self.failed, "no long-lived task is running; stopping");
        }
        !up
    }

    /// Start a run for `task`, join it to the active run, or hold it back
    /// when it is already part of that run.
    fn on_trigger(&mut self, task: TaskName, reason: TriggerReason, ready: &mut Vec<ScheduledTask>) {
        debug!(task = %task, ?reason, "trigger");

        if self.scheduler.is_idle() {
            let mut roots = self.queue.drain_pending();
            if !roots.contains(&task) {
                roots.push(task);
            }
            self.start_run(&roots, ready);
            return;
        }

        match self.scheduler.run_state_of(&task) {
            None => debug!(task = %task, "trigger for unknown task ignored"),
            Some(RunState::NotInRun) => {
                ready.extend(self.scheduler.trigger(&task).newly_scheduled);
            }
            Some(_) => {
                debug!(task = %task, "already in the active run; queued");
                self.queue.record_trigger(&task);
            }
        }
    }

    fn start_queued_run(&mut self, ready: &mut Vec<ScheduledTask>) {
        if self.scheduler.is_idle() {
            let roots = self.queue.drain_pending();
            self.start_run(&roots, ready);
        }
    }

    fn start_run(&mut self, roots: &[TaskName], ready: &mut Vec<ScheduledTask>) {
        if roots.is_empty() {
            return;
        }
        self.scheduler.start_new_run();
        for root in roots {
            ready.extend(self.scheduler.trigger(root).newly_scheduled);
        }
    }

    fn continue_with(ready: Vec<ScheduledTask>) -> CoreStep {
        let mut commands = Vec::new();
        if !ready.is_empty() {
            commands.push(CoreCommand::DispatchTasks(ready));
        }
        CoreStep {
            commands,
            keep_running: true,
        }
    }
}
