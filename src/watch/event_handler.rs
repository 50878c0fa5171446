// src/watch/event_handler.rs

//! Turning settled filesystem events into rule actions.

use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use anyhow::{Result, anyhow};
use notify::{Event, EventKind};
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use crate::engine::{RuntimeEvent, TriggerReason};
use crate::fs::FileSystem;
use crate::server::ReloadHub;
use crate::watch::hash::{FileHashes, HashStore, compute_aggregate_hash};
use crate::watch::rules::{WatchAction, WatchRule};

/// One changed path from a settled batch of events.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Change {
    /// `root.join(rel)`, the same spelling rule globs produce.
    pub path: PathBuf,
    /// Relative to the project root, forward slashes.
    pub rel: String,
    /// Whether any event for this path was a modification.
    pub modified: bool,
}

/// `path` relative to `root` with forward slashes.
///
/// Falls back to canonical paths when the plain prefix does not match
/// (symlinked temp dirs, `/private/var` on macOS).
fn relative_str(root: &Path, path: &Path) -> Option<String> {
    let rel = match path.strip_prefix(root) {
        Ok(rel) => rel.to_path_buf(),
        Err(_) => {
            let root = root.canonicalize().ok()?;
            let path = path.canonicalize().ok()?;
            path.strip_prefix(&root).ok()?.to_path_buf()
        }
    };
    Some(rel.to_string_lossy().replace('\\', "/"))
}

/// Flatten a batch of notify events into unique changed paths.
pub fn changes_from_events(root: &Path, events: &[Event]) -> Vec<Change> {
    let mut changes: Vec<Change> = Vec::new();

    for event in events {
        if matches!(event.kind, EventKind::Access(_)) {
            continue;
        }
        let modified = matches!(event.kind, EventKind::Modify(_));

        for path in &event.paths {
            let Some(rel) = relative_str(root, path) else {
                debug!(?path, "event outside project root; ignoring");
                continue;
            };
            match changes.iter_mut().find(|c| c.rel == rel) {
                Some(existing) => existing.modified |= modified,
                None => changes.push(Change {
                    path: root.join(&rel),
                    rel,
                    modified,
                }),
            }
        }
    }

    changes
}

fn rule_hash(fs: &dyn FileSystem, rule: &WatchRule, cache: &mut FileHashes) -> Result<String> {
    let files = rule.collect_files(fs)?;
    let mut hashes = Vec::with_capacity(files.len());
    for file in files {
        hashes.push(cache.get_or_compute(fs, &file)?);
    }
    Ok(compute_aggregate_hash(&hashes))
}

/// Decides which rules fire for a batch of changes.
///
/// A rule fires when a change matches its glob *and* the aggregated content
/// hash of all its files differs from the last one seen. Touching a file
/// without changing it, or a second event burst for the same save, fires
/// nothing.
#[derive(Debug, Clone)]
pub struct ChangeDetector {
    fs: Arc<dyn FileSystem>,
    rules: Arc<Vec<WatchRule>>,
    cache: Arc<Mutex<FileHashes>>,
    store: Arc<Mutex<HashStore>>,
}

impl ChangeDetector {
    pub fn new(fs: Arc<dyn FileSystem>, rules: Vec<WatchRule>) -> Self {
        Self {
            fs,
            rules: Arc::new(rules),
            cache: Arc::new(Mutex::new(FileHashes::new())),
            store: Arc::new(Mutex::new(HashStore::new())),
        }
    }

    pub fn rules(&self) -> &[WatchRule] {
        &self.rules
    }

    /// Record the current hash of every rule so the first real edit fires.
    pub async fn prime(&self) {
        let this = self.clone();
        let primed = tokio::task::spawn_blocking(move || {
            for rule in this.rules.iter() {
                let fired = this.check_rule(rule, &[]);
                debug!(rule = %rule.name(), fired, "primed rule hash");
            }
        })
        .await;
        if primed.is_err() {
            warn!("priming watch hashes panicked");
        }
    }

    /// Rules that should fire for `changes`.
    pub async fn rules_to_fire(&self, changes: Vec<Change>) -> Vec<WatchRule> {
        let this = self.clone();
        tokio::task::spawn_blocking(move || {
            this.rules
                .iter()
                .filter(|rule| {
                    let relevant: Vec<&Change> = changes
                        .iter()
                        .filter(|c| rule.matches(&c.rel))
                        .filter(|c| !rule.is_changes_only() || c.modified)
                        .collect();
                    !relevant.is_empty() && this.check_rule(rule, &relevant)
                })
                .cloned()
                .collect()
        })
        .await
        .unwrap_or_else(|_| {
            warn!("hashing watch rules panicked; skipping batch");
            Vec::new()
        })
    }

    /// Re-hash `rule` after dropping cached hashes of `changed` paths.
    /// Returns whether the aggregate changed. Hash failures count as a
    /// change.
    fn check_rule(&self, rule: &WatchRule, changed: &[&Change]) -> bool {
        let result = (|| -> Result<bool> {
            let mut cache = self
                .cache
                .lock()
                .map_err(|_| anyhow!("file cache mutex poisoned"))?;
            for change in changed {
                cache.invalidate(&change.path);
            }
            let hash = rule_hash(self.fs.as_ref(), rule, &mut cache)?;
            drop(cache);

            let mut store = self
                .store
                .lock()
                .map_err(|_| anyhow!("hash store mutex poisoned"))?;
            Ok(store.update(rule.name(), hash))
        })();

        match result {
            Ok(true) => true,
            Ok(false) => {
                info!(rule = %rule.name(), "content unchanged; skipping");
                false
            }
            Err(err) => {
                warn!(rule = %rule.name(), error = %err, "hashing failed; firing anyway");
                true
            }
        }
    }
}

/// Run the action of each fired rule.
///
/// Returns `false` once the runtime has gone away.
pub async fn dispatch(
    fired: &[WatchRule],
    runtime_tx: &mpsc::Sender<RuntimeEvent>,
    reload: &ReloadHub,
) -> bool {
    for rule in fired {
        info!(rule = %rule.name(), action = %rule.action(), "watch rule fired");
        match rule.action() {
            WatchAction::RunTask(task) => {
                let event = RuntimeEvent::TaskTriggered {
                    task: task.clone(),
                    reason: TriggerReason::FileWatch,
                };
                if let Err(err) = runtime_tx.send(event).await {
                    warn!("failed to send RuntimeEvent::TaskTriggered: {err}");
                    return false;
                }
            }
            WatchAction::Reload => {
                reload.reload();
            }
        }
    }
    true
}

#[cfg(test)]
mod tests {
    use notify::event::{CreateKind, DataChange, ModifyKind};

    use super::*;
    use crate::config::ConfigFile;
    use crate::fs::mock::MockFileSystem;
    use crate::paths::PathTable;
    use crate::watch::rules::builtin_rules;

    fn event(kind: EventKind, path: &str) -> Event {
        Event::new(kind).add_path(PathBuf::from(path))
    }

    fn modify(rel: &str) -> Change {
        Change {
            path: Path::new("/site").join(rel),
            rel: rel.to_string(),
            modified: true,
        }
    }

    fn detector(fs: Arc<MockFileSystem>) -> ChangeDetector {
        let paths = PathTable::from_config(&ConfigFile::defaults(), Path::new("/site")).unwrap();
        ChangeDetector::new(fs, builtin_rules(&paths))
    }

    #[test]
    fn relative_paths_use_forward_slashes() {
        assert_eq!(
            relative_str(Path::new("/site"), Path::new("/site/src/scss/a.scss")),
            Some("src/scss/a.scss".to_string())
        );
        assert_eq!(relative_str(Path::new("/site"), Path::new("/elsewhere/a.scss")), None);
    }

    #[test]
    fn events_collapse_per_path() {
        let events = vec![
            event(EventKind::Create(CreateKind::File), "/site/src/scss/a.scss"),
            event(
                EventKind::Modify(ModifyKind::Data(DataChange::Content)),
                "/site/src/scss/a.scss",
            ),
            event(EventKind::Create(CreateKind::File), "/site/src/index.html"),
        ];
        let changes = changes_from_events(Path::new("/site"), &events);
        assert_eq!(changes.len(), 2);
        assert!(changes[0].modified);
        assert_eq!(changes[1].rel, "src/index.html");
        assert!(!changes[1].modified);
    }

    #[tokio::test]
    async fn one_save_fires_once() {
        let fs = Arc::new(MockFileSystem::new());
        fs.add_file("/site/src/scss/site.scss", "a { color: red; }");
        let detector = detector(fs.clone());
        detector.prime().await;

        fs.add_file("/site/src/scss/site.scss", "a { color: blue; }");
        let fired = detector
            .rules_to_fire(vec![modify("src/scss/site.scss")])
            .await;
        assert_eq!(fired.len(), 1);
        assert_eq!(fired[0].name(), "scss");

        // A trailing event for the same save.
        let again = detector
            .rules_to_fire(vec![modify("src/scss/site.scss")])
            .await;
        assert!(again.is_empty());
    }

    #[tokio::test]
    async fn html_rule_ignores_creations() {
        let fs = Arc::new(MockFileSystem::new());
        let detector = detector(fs.clone());
        detector.prime().await;

        fs.add_file("/site/src/new.html", "<p>");
        let mut created = modify("src/new.html");
        created.modified = false;
        assert!(detector.rules_to_fire(vec![created]).await.is_empty());

        fs.add_file("/site/src/new.html", "<p>edited");
        let fired = detector.rules_to_fire(vec![modify("src/new.html")]).await;
        assert_eq!(fired.len(), 1);
        assert_eq!(fired[0].action(), &WatchAction::Reload);
    }
}
