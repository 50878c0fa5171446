// src/tasks/watch.rs

use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use tracing::info;

use super::{TaskContext, TaskReporter};
use crate::server::DevServer;
use crate::watch::{builtin_rules, spawn_watcher};

/// Serve the source tree with live reload and react to edits until the
/// process is stopped.
pub async fn run(ctx: Arc<TaskContext>, reporter: TaskReporter) -> Result<()> {
    let server_cfg = &ctx.config.server;
    let server = DevServer::start(
        ctx.paths.server_root().to_path_buf(),
        &server_cfg.host,
        server_cfg.port,
        ctx.reload.clone(),
    )
    .await?;

    let watcher = spawn_watcher(
        ctx.paths.root().to_path_buf(),
        builtin_rules(&ctx.paths),
        reporter.runtime_sender(),
        ctx.reload.clone(),
        Duration::from_millis(ctx.config.watch.debounce_ms),
    )
    .await?;

    info!(
        task = %reporter.task(),
        url = %server.url(),
        dirs = watcher.watched().len(),
        "watching for changes"
    );
    reporter.ready().await?;

    // `server` and `watcher` stop when this future is dropped.
    std::future::pending().await
}
