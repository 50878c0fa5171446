// src/tasks/clean.rs

use std::path::PathBuf;

use anyhow::{Context, Result};
use tracing::{debug, info};

use super::TaskContext;

#[derive(Debug, Default)]
pub struct CleanReport {
    pub removed: Vec<PathBuf>,
}

/// Delete the generated CSS and JS directories. Missing directories are
/// skipped, so running clean twice is fine.
pub fn run(ctx: &TaskContext) -> Result<CleanReport> {
    let mut report = CleanReport::default();

    for dir in [ctx.paths.dest_css(), ctx.paths.dest_js()] {
        if !ctx.fs.exists(dir) {
            debug!(dir = %dir.display(), "nothing to clean");
            continue;
        }
        ctx.fs
            .remove_dir_all(dir)
            .with_context(|| format!("removing {}", dir.display()))?;
        info!(dir = %dir.display(), "removed");
        report.removed.push(dir.to_path_buf());
    }

    Ok(report)
}
