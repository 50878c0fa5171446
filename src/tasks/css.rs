// src/tasks/css.rs

//! Sass → CSS, in two outputs.
//!
//! For every non-partial stylesheet `site.scss`:
//!
//! 1. compile to expanded CSS with grass;
//! 2. write `site.css` to the unminified copy directory and to `dest.css`;
//! 3. prefix and minify with lightningcss for the configured browsers;
//! 4. write `site.min.css` to `dest.css`;
//! 5. tell connected browsers to refresh both stylesheets.
//!
//! A stylesheet that fails to compile is logged and skipped so that a typo
//! does not take the watch process down. Write failures fail the task.

use std::path::Path;

use anyhow::{Context, Result, anyhow};
use lightningcss::stylesheet::{MinifyOptions, ParserOptions, PrinterOptions, StyleSheet};
use lightningcss::targets::{Browsers, Targets};
use tracing::{error, info};

use super::TaskContext;
use crate::paths::{Category, SourceFile};

#[derive(Debug, Default)]
pub struct CssReport {
    /// Stem of every stylesheet written.
    pub compiled: Vec<String>,
    /// `(file, message)` for stylesheets that failed to compile.
    pub errors: Vec<(String, String)>,
}

/// Resolve a browserslist query into lightningcss targets.
pub fn browser_targets(query: &str) -> Result<Targets> {
    let browsers = Browsers::from_browserslist([query])
        .map_err(|e| anyhow!("invalid browserslist query '{query}': {e}"))?;
    Ok(browsers.map(Targets::from).unwrap_or_default())
}

fn is_partial(file: &SourceFile) -> bool {
    file.path
        .file_name()
        .and_then(|n| n.to_str())
        .is_some_and(|n| n.starts_with('_'))
}

/// Compile one Sass source to expanded CSS.
///
/// Imports resolve against the stylesheet's own directory.
pub async fn compile_scss(source: String, dir: &Path) -> Result<String, String> {
    let dir = dir.to_path_buf();
    tokio::task::spawn_blocking(move || {
        let options = grass::Options::default()
            .style(grass::OutputStyle::Expanded)
            .load_path(&dir);
        grass::from_string(source, &options).map_err(|e| e.to_string())
    })
    .await
    .map_err(|e| format!("sass compiler panicked: {e}"))?
}

/// Add vendor prefixes and minify.
pub fn prefix_and_minify(css: &str, filename: &str, targets: Targets) -> Result<String, String> {
    let mut sheet = StyleSheet::parse(
        css,
        ParserOptions {
            filename: filename.to_string(),
            ..ParserOptions::default()
        },
    )
    .map_err(|e| e.to_string())?;

    sheet
        .minify(MinifyOptions {
            targets,
            ..MinifyOptions::default()
        })
        .map_err(|e| e.to_string())?;

    let out = sheet
        .to_css(PrinterOptions {
            minify: true,
            targets,
            ..PrinterOptions::default()
        })
        .map_err(|e| e.to_string())?;
    Ok(out.code)
}

pub async fn run(ctx: &TaskContext) -> Result<CssReport> {
    let fs = ctx.fs.as_ref();
    let mut report = CssReport::default();

    for file in ctx.paths.source(Category::Scss).collect(fs)? {
        if is_partial(&file) {
            continue;
        }
        let shown = file.relative.display().to_string();
        let stem = match file.path.file_stem().and_then(|s| s.to_str()) {
            Some(stem) => stem.to_string(),
            None => continue,
        };

        let source = fs
            .read_to_string(&file.path)
            .with_context(|| format!("reading {}", file.path.display()))?;
        let dir = file.path.parent().unwrap_or(Path::new("."));

        let expanded = match compile_scss(source, dir).await {
            Ok(css) => css,
            Err(message) => {
                error!(file = %shown, "sass compile error:\n{message}");
                report.errors.push((shown, message));
                continue;
            }
        };

        let plain_name = format!("{stem}.css");
        let min_name = format!("{stem}.min.css");
        let rel_dir = file.relative.parent().unwrap_or(Path::new(""));

        for dest in [ctx.paths.dest_css_unminified(), ctx.paths.dest_css()] {
            let target = dest.join(rel_dir).join(&plain_name);
            fs.write(&target, expanded.as_bytes())
                .with_context(|| format!("writing {}", target.display()))?;
        }

        let minified = match prefix_and_minify(&expanded, &plain_name, ctx.css_targets()) {
            Ok(css) => css,
            Err(message) => {
                error!(file = %shown, "css minify error: {message}");
                report.errors.push((shown, message));
                continue;
            }
        };
        let target = ctx.paths.dest_css().join(rel_dir).join(&min_name);
        fs.write(&target, minified.as_bytes())
            .with_context(|| format!("writing {}", target.display()))?;

        info!(
            file = %shown,
            expanded = expanded.len(),
            minified = minified.len(),
            "stylesheet built"
        );
        ctx.reload.inject_css(plain_name);
        ctx.reload.inject_css(min_name);
        report.compiled.push(stem);
    }

    Ok(report)
}
