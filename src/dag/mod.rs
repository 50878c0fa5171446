// src/dag/mod.rs

//! Task plans and scheduling.
//!
//! [`plan`] turns the exposed task names into a validated graph;
//! [`scheduler`] walks that graph once per run.

pub mod graph;
pub mod plan;
pub mod scheduler;
pub mod state_manager;
pub mod task_info;

pub use graph::DagGraph;
pub use plan::{BuiltinTask, Composition, ExposedTask, PlanNode, TaskPlan};
pub use scheduler::{Scheduler, SchedulerStep};
pub use task_info::{RunState, ScheduledTask};
