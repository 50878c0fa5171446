// src/engine/mod.rs

//! The engine turns triggers into task dispatches.
//!
//! Events (startup roots, watch rules, task readiness and completion,
//! Ctrl-C) flow into [`Runtime`], which feeds them to the pure
//! [`CoreRuntime`] and carries out the resulting commands through an
//! [`ExecutorBackend`](crate::exec::ExecutorBackend).

pub mod core;
pub mod queue;
pub mod runtime;

pub use self::core::{CoreCommand, CoreRuntime, CoreStep, RunReport};
pub use crate::types::TriggerWhileRunningBehaviour;
pub use queue::TriggerQueue;
pub use runtime::Runtime;

pub type TaskName = String;

/// How a task execution ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TaskOutcome {
    Success,
    /// Carries an exit-style code; built-in tasks report 1.
    Failed(i32),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TriggerReason {
    /// Requested on the command line.
    Manual,
    /// A watch rule fired.
    FileWatch,
}

#[derive(Debug, Clone, Copy)]
pub struct RuntimeOptions {
    /// Stop once the scheduler is idle and nothing is queued. Set for plans
    /// without a long-lived task.
    pub exit_when_idle: bool,
}

#[derive(Debug, Clone)]
pub enum RuntimeEvent {
    TaskTriggered {
        task: TaskName,
        reason: TriggerReason,
    },
    /// A long-lived task is up.
    TaskProgressed {
        task: TaskName,
    },
    TaskCompleted {
        task: TaskName,
        outcome: TaskOutcome,
    },
    ShutdownRequested,
}
