// src/watch/watcher.rs

use std::collections::BTreeSet;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use notify::{Config, Event, RecommendedWatcher, RecursiveMode, Watcher};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::engine::RuntimeEvent;
use crate::fs::{FileSystem, RealFileSystem};
use crate::server::ReloadHub;
use crate::watch::event_handler::{ChangeDetector, changes_from_events, dispatch};
use crate::watch::rules::WatchRule;

/// Handle for the filesystem watcher.
///
/// Keeps the underlying `RecommendedWatcher` alive. Dropping this handle
/// stops file watching.
pub struct WatcherHandle {
    _inner: RecommendedWatcher,
    task: JoinHandle<()>,
    watched: Vec<PathBuf>,
}

impl WatcherHandle {
    /// Directories being watched.
    pub fn watched(&self) -> &[PathBuf] {
        &self.watched
    }
}

impl std::fmt::Debug for WatcherHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WatcherHandle")
            .field("watched", &self.watched)
            .finish_non_exhaustive()
    }
}

impl Drop for WatcherHandle {
    fn drop(&mut self) {
        self.task.abort();
    }
}

/// Spawn a filesystem watcher for `rules`.
///
/// - `root` is the project root the rule globs were resolved against.
/// - Events are collected until `debounce` passes without a new one, then
///   handed to a [`ChangeDetector`] as one batch.
/// - `RunTask` actions go to `runtime_tx`; `Reload` actions to `reload`.
pub async fn spawn_watcher(
    root: impl Into<PathBuf>,
    rules: Vec<WatchRule>,
    runtime_tx: mpsc::Sender<RuntimeEvent>,
    reload: ReloadHub,
    debounce: Duration,
) -> Result<WatcherHandle> {
    let root = root.into();
    let fs: Arc<dyn FileSystem> = Arc::new(RealFileSystem);

    // Watch each distinct glob base once.
    let bases: BTreeSet<PathBuf> = rules.iter().map(|r| r.glob().base().to_path_buf()).collect();

    // Channel from the blocking notify callback into the async world.
    let (event_tx, mut event_rx) = mpsc::unbounded_channel::<Event>();

    let mut watcher = RecommendedWatcher::new(
        move |res: notify::Result<Event>| match res {
            Ok(event) => {
                // Fails only once the event loop is gone.
                let _ = event_tx.send(event);
            }
            Err(err) => {
                warn!(error = %err, "file watch error");
            }
        },
        Config::default(),
    )
    .context("creating file watcher")?;

    let mut watched = Vec::new();
    for base in bases {
        if !fs.is_dir(&base) {
            warn!(dir = %base.display(), "watch directory does not exist; skipping");
            continue;
        }
        watcher
            .watch(&base, RecursiveMode::Recursive)
            .with_context(|| format!("watching {}", base.display()))?;
        info!(dir = %base.display(), "watching");
        watched.push(base);
    }

    let detector = ChangeDetector::new(fs, rules);
    detector.prime().await;

    let task = tokio::spawn(async move {
        while let Some(first) = event_rx.recv().await {
            let mut batch = vec![first];
            // Let the burst settle.
            loop {
                match tokio::time::timeout(debounce, event_rx.recv()).await {
                    Ok(Some(event)) => batch.push(event),
                    Ok(None) | Err(_) => break,
                }
            }

            let changes = changes_from_events(&root, &batch);
            debug!(events = batch.len(), changes = changes.len(), "settled event batch");
            if changes.is_empty() {
                continue;
            }

            let fired = detector.rules_to_fire(changes).await;
            if !dispatch(&fired, &runtime_tx, &reload).await {
                break;
            }
        }
        debug!("watcher event loop finished");
    });

    Ok(WatcherHandle {
        _inner: watcher,
        task,
        watched,
    })
}
