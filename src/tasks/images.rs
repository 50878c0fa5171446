// src/tasks/images.rs

use std::path::Path;

use anyhow::{Context, Result};
use tracing::{debug, info};

use super::TaskContext;
use super::optimize::{ImageKind, Optimized, optimize};
use crate::fs::FileSystem;
use crate::paths::Category;

#[derive(Debug, Default)]
pub struct ImagesReport {
    pub optimized: usize,
    pub verbatim: usize,
    /// Up-to-date files left alone.
    pub skipped: usize,
}

/// `dest` exists and is not older than `src`.
fn is_up_to_date(fs: &dyn FileSystem, src: &Path, dest: &Path) -> bool {
    if !fs.is_file(dest) {
        return false;
    }
    match (fs.modified(src), fs.modified(dest)) {
        (Ok(src_time), Ok(dest_time)) => dest_time >= src_time,
        _ => false,
    }
}

/// Optimize new or changed images into the images destination.
pub async fn run(ctx: &TaskContext) -> Result<ImagesReport> {
    let fs = ctx.fs.as_ref();
    let mut report = ImagesReport::default();

    for file in ctx.paths.source(Category::Images).collect(fs)? {
        let dest = ctx.paths.dest_images().join(&file.relative);
        if is_up_to_date(fs, &file.path, &dest) {
            debug!(file = %file.path.display(), "unchanged; skipping");
            report.skipped += 1;
            continue;
        }

        let data = fs
            .read(&file.path)
            .with_context(|| format!("reading {}", file.path.display()))?;
        let kind = ImageKind::from_path(&file.path);

        let bytes = match optimize(kind, data.clone(), &ctx.config.images, &file.path).await? {
            Optimized::Bytes(bytes) => {
                report.optimized += 1;
                info!(
                    file = %file.relative.display(),
                    before = data.len(),
                    after = bytes.len(),
                    "image optimized"
                );
                bytes
            }
            Optimized::Unchanged => {
                report.verbatim += 1;
                data
            }
        };

        fs.write(&dest, &bytes)
            .with_context(|| format!("writing {}", dest.display()))?;
    }

    Ok(report)
}
