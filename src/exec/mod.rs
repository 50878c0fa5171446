// src/exec/mod.rs

//! Running scheduled tasks.

pub mod backend;
pub mod executor_loop;
pub mod task_runner;

pub use backend::{ExecutorBackend, TaskExecutorBackend};
pub use executor_loop::spawn_executor;
