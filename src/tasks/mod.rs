// src/tasks/mod.rs

//! The built-in asset tasks.
//!
//! Each task reads its inputs through the [`TaskContext`] and returns an
//! `anyhow::Result`; the executor turns that into a `TaskOutcome`.

use std::sync::Arc;

use anyhow::{Context, Result};
use lightningcss::targets::Targets;
use tokio::sync::mpsc;
use tracing::info;

use crate::config::ConfigFile;
use crate::dag::BuiltinTask;
use crate::engine::{RuntimeEvent, TaskName};
use crate::fs::{FileSystem, RealFileSystem};
use crate::paths::PathTable;
use crate::server::ReloadHub;

pub mod clean;
pub mod copy;
pub mod css;
pub mod images;
pub mod optimize;
pub mod watch;

/// Everything a task needs: config, resolved paths, filesystem and the
/// live-reload hub shared with the dev server.
#[derive(Debug)]
pub struct TaskContext {
    pub config: ConfigFile,
    pub paths: PathTable,
    pub fs: Arc<dyn FileSystem>,
    pub reload: ReloadHub,
    css_targets: Targets,
}

impl TaskContext {
    pub fn new(config: ConfigFile, paths: PathTable, fs: Arc<dyn FileSystem>) -> Result<Self> {
        let css_targets = css::browser_targets(&config.css.browsers)?;
        Ok(Self {
            config,
            paths,
            fs,
            reload: ReloadHub::new(),
            css_targets,
        })
    }

    /// Context over the real filesystem.
    pub fn with_real_fs(config: ConfigFile, paths: PathTable) -> Result<Self> {
        Self::new(config, paths, Arc::new(RealFileSystem))
    }

    pub fn css_targets(&self) -> Targets {
        self.css_targets
    }
}

/// Handle a running task uses to talk back to the runtime.
#[derive(Debug, Clone)]
pub struct TaskReporter {
    task: TaskName,
    run_id: u64,
    runtime_tx: mpsc::Sender<RuntimeEvent>,
}

impl TaskReporter {
    pub fn new(task: impl Into<TaskName>, run_id: u64, runtime_tx: mpsc::Sender<RuntimeEvent>) -> Self {
        Self {
            task: task.into(),
            run_id,
            runtime_tx,
        }
    }

    pub fn task(&self) -> &str {
        &self.task
    }

    pub fn run_id(&self) -> u64 {
        self.run_id
    }

    /// Tell the scheduler a long-lived task is up, so its dependents (and
    /// the run) can move on.
    pub async fn ready(&self) -> Result<()> {
        self.runtime_tx
            .send(RuntimeEvent::TaskProgressed {
                task: self.task.clone(),
            })
            .await
            .with_context(|| format!("reporting readiness of task '{}'", self.task))
    }

    /// Sender for events originating inside the task (watch rules).
    pub fn runtime_sender(&self) -> mpsc::Sender<RuntimeEvent> {
        self.runtime_tx.clone()
    }
}

/// Run one built-in task to completion.
pub async fn run_builtin(
    task: BuiltinTask,
    ctx: Arc<TaskContext>,
    reporter: TaskReporter,
) -> Result<()> {
    match task {
        BuiltinTask::Clean => {
            let report = clean::run(&ctx)?;
            info!(task = %task, removed = report.removed.len(), "clean finished");
        }
        BuiltinTask::Html => {
            let report = copy::run_html(&ctx)?;
            info!(task = %task, copied = report.copied.len(), "html finished");
        }
        BuiltinTask::Scripts => {
            let report = copy::run_scripts(&ctx)?;
            info!(task = %task, copied = report.copied.len(), "scripts finished");
        }
        BuiltinTask::Images => {
            let report = images::run(&ctx).await?;
            info!(
                task = %task,
                optimized = report.optimized,
                verbatim = report.verbatim,
                skipped = report.skipped,
                "images finished"
            );
        }
        BuiltinTask::Css => {
            let report = css::run(&ctx).await?;
            info!(
                task = %task,
                compiled = report.compiled.len(),
                errors = report.errors.len(),
                "css finished"
            );
        }
        BuiltinTask::Watch => watch::run(ctx, reporter).await?,
    }
    Ok(())
}
