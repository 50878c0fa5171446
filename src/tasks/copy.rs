// src/tasks/copy.rs

//! Verbatim copies for HTML and scripts.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use tracing::debug;

use super::TaskContext;
use crate::fs::FileSystem;
use crate::paths::{Category, SourceGlob};

#[derive(Debug, Default)]
pub struct CopyReport {
    /// Destination paths written.
    pub copied: Vec<PathBuf>,
}

/// Copy every file matched by `glob` into `dest`, keeping relative paths.
pub fn copy_matched(fs: &dyn FileSystem, glob: &SourceGlob, dest: &Path) -> Result<CopyReport> {
    let mut report = CopyReport::default();
    for file in glob.collect(fs)? {
        let target = dest.join(&file.relative);
        let bytes = fs
            .read(&file.path)
            .with_context(|| format!("reading {}", file.path.display()))?;
        fs.write(&target, &bytes)
            .with_context(|| format!("writing {}", target.display()))?;
        debug!(file = %file.path.display(), to = %target.display(), "copied");
        report.copied.push(target);
    }
    Ok(report)
}

/// Copy HTML pages, then ask browsers for a full reload.
pub fn run_html(ctx: &TaskContext) -> Result<CopyReport> {
    let report = copy_matched(
        ctx.fs.as_ref(),
        ctx.paths.source(Category::Html),
        ctx.paths.dest_html(),
    )?;
    ctx.reload.reload();
    Ok(report)
}

/// Copy scripts as-is. Bundling, if any, happens outside assetflow.
pub fn run_scripts(ctx: &TaskContext) -> Result<CopyReport> {
    let report = copy_matched(
        ctx.fs.as_ref(),
        ctx.paths.source(Category::Js),
        ctx.paths.dest_js(),
    )?;
    ctx.reload.reload();
    Ok(report)
}
