// src/tasks/optimize.rs

//! Per-format image optimizers.
//!
//! PNGs go through oxipng in-process. GIF, JPEG and SVG are piped through
//! the external commands from `[images]` (stdin in, stdout out).

use std::borrow::Cow;
use std::path::{Path, PathBuf};
use std::process::Stdio;

use anyhow::{Context, Result, anyhow, bail};
use tokio::io::AsyncWriteExt;
use tokio::process::Command;
use tracing::{debug, warn};

use crate::config::ImagesSection;

/// Exit codes a shell uses for "command not found".
const NOT_FOUND_CODES: [i32; 2] = [127, 9009];

/// Placeholder in the svg command for the bundled svgo config.
pub const SVGO_CONFIG_PLACEHOLDER: &str = "{svgo_config}";

const SVGO_CONFIG: &str = include_str!("svgo.config.mjs");

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImageKind {
    Png,
    Gif,
    Jpeg,
    Svg,
    Other,
}

impl ImageKind {
    pub fn from_path(path: &Path) -> Self {
        let ext = path
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| e.to_ascii_lowercase());
        match ext.as_deref() {
            Some("png") => ImageKind::Png,
            Some("gif") => ImageKind::Gif,
            Some("jpg") | Some("jpeg") => ImageKind::Jpeg,
            Some("svg") => ImageKind::Svg,
            _ => ImageKind::Other,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Optimized {
    Bytes(Vec<u8>),
    /// No optimizer for this file: either the format has none or the
    /// configured tool is not installed. The caller copies it as-is.
    Unchanged,
}

/// Optimize one image.
pub async fn optimize(
    kind: ImageKind,
    data: Vec<u8>,
    cfg: &ImagesSection,
    file: &Path,
) -> Result<Optimized> {
    match kind {
        ImageKind::Png => optimize_png(data, cfg.png_level).await.map(Optimized::Bytes),
        ImageKind::Gif => run_filter(&cfg.gif, data, file).await,
        ImageKind::Jpeg => run_filter(&cfg.jpeg, data, file).await,
        ImageKind::Svg => {
            let cmd = expand_svg_command(&cfg.svg).await?;
            run_filter(&cmd, data, file).await
        }
        ImageKind::Other => Ok(Optimized::Unchanged),
    }
}

async fn optimize_png(data: Vec<u8>, level: u8) -> Result<Vec<u8>> {
    tokio::task::spawn_blocking(move || {
        let options = oxipng::Options::from_preset(level);
        oxipng::optimize_from_memory(&data, &options).map_err(|e| anyhow!("oxipng: {e}"))
    })
    .await
    .context("png optimizer panicked")?
}

/// Write the bundled svgo config and return its path.
async fn svgo_config_file() -> Result<PathBuf> {
    let path = std::env::temp_dir().join("assetflow-svgo.config.mjs");
    tokio::fs::write(&path, SVGO_CONFIG)
        .await
        .with_context(|| format!("writing {}", path.display()))?;
    Ok(path)
}

async fn expand_svg_command(cmd: &str) -> Result<Cow<'_, str>> {
    if !cmd.contains(SVGO_CONFIG_PLACEHOLDER) {
        return Ok(Cow::Borrowed(cmd));
    }
    let config = svgo_config_file().await?;
    let quoted = format!("\"{}\"", config.display());
    Ok(Cow::Owned(cmd.replace(SVGO_CONFIG_PLACEHOLDER, &quoted)))
}

fn shell_command(cmd: &str) -> Command {
    if cfg!(windows) {
        let mut c = Command::new("cmd");
        c.arg("/C").arg(cmd);
        c
    } else {
        let mut c = Command::new("sh");
        c.arg("-c").arg(cmd);
        c
    }
}

/// Pipe `input` through an external command.
pub async fn run_filter(cmd: &str, input: Vec<u8>, file: &Path) -> Result<Optimized> {
    if cmd.trim().is_empty() {
        return Ok(Optimized::Unchanged);
    }

    let mut child = shell_command(cmd)
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true)
        .spawn()
        .with_context(|| format!("spawning optimizer `{cmd}`"))?;

    let mut stdin = child
        .stdin
        .take()
        .ok_or_else(|| anyhow!("optimizer `{cmd}` has no stdin"))?;
    let writer = tokio::spawn(async move {
        // A tool that exits early closes the pipe; its exit status says why.
        let _ = stdin.write_all(&input).await;
        let _ = stdin.shutdown().await;
    });

    let output = child
        .wait_with_output()
        .await
        .with_context(|| format!("waiting for optimizer `{cmd}`"))?;
    let _ = writer.await;

    if output.status.success() {
        debug!(file = %file.display(), cmd, bytes = output.stdout.len(), "optimized");
        return Ok(Optimized::Bytes(output.stdout));
    }

    match output.status.code() {
        Some(code) if NOT_FOUND_CODES.contains(&code) => {
            warn!(
                file = %file.display(),
                cmd,
                "optimizer not available; copying verbatim"
            );
            Ok(Optimized::Unchanged)
        }
        code => {
            let stderr = String::from_utf8_lossy(&output.stderr);
            bail!(
                "optimizer `{cmd}` failed on {} (exit {:?}): {}",
                file.display(),
                code,
                stderr.trim()
            )
        }
    }
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;

    #[test]
    fn kinds_follow_extensions() {
        assert_eq!(ImageKind::from_path(Path::new("a/B.JPG")), ImageKind::Jpeg);
        assert_eq!(ImageKind::from_path(Path::new("logo.svg")), ImageKind::Svg);
        assert_eq!(ImageKind::from_path(Path::new("favicon.ico")), ImageKind::Other);
    }

    #[tokio::test]
    async fn filter_pipes_stdin_to_stdout() {
        let out = run_filter("cat", b"GIF89a".to_vec(), Path::new("x.gif"))
            .await
            .unwrap();
        assert_eq!(out, Optimized::Bytes(b"GIF89a".to_vec()));
    }

    #[tokio::test]
    async fn missing_tool_means_unchanged() {
        let out = run_filter(
            "assetflow-no-such-optimizer --flag",
            b"data".to_vec(),
            Path::new("x.svg"),
        )
        .await
        .unwrap();
        assert_eq!(out, Optimized::Unchanged);
    }

    #[tokio::test]
    async fn svg_command_gets_the_bundled_svgo_config() {
        let cfg = ImagesSection {
            svg: format!("cat {SVGO_CONFIG_PLACEHOLDER}"),
            ..ImagesSection::default()
        };
        let out = optimize(ImageKind::Svg, b"<svg/>".to_vec(), &cfg, Path::new("x.svg"))
            .await
            .unwrap();
        let Optimized::Bytes(config) = out else {
            panic!("expected the config contents, got {out:?}");
        };
        let config = String::from_utf8(config).unwrap();
        assert!(config.contains("removeViewBox: false"), "{config}");
    }

    #[test]
    fn default_svg_command_uses_the_placeholder() {
        assert!(ImagesSection::default().svg.contains(SVGO_CONFIG_PLACEHOLDER));
    }

    #[tokio::test]
    async fn failing_tool_is_an_error() {
        let err = run_filter("exit 3", b"data".to_vec(), Path::new("x.jpg"))
            .await
            .unwrap_err();
        assert!(err.to_string().contains("exit Some(3)"));
    }
}
