// tests/watch_css.rs

//! The real filesystem watcher against a temporary project.

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use tempfile::tempdir;
use tokio::sync::mpsc;
use tokio::time::timeout;

use assetflow::engine::{RuntimeEvent, TriggerReason};
use assetflow::paths::PathTable;
use assetflow::server::{ReloadHub, ReloadSignal};
use assetflow::tasks::{TaskReporter, watch as watch_task};
use assetflow::watch::{WatcherHandle, builtin_rules, spawn_watcher};
use assetflow_test_utils::builders::{ConfigFileBuilder, site_context};
use assetflow_test_utils::init_tracing;

const DEBOUNCE: Duration = Duration::from_millis(100);

fn project() -> (tempfile::TempDir, PathBuf) {
    let dir = tempdir().unwrap();
    let root = dir.path().canonicalize().unwrap();
    fs::create_dir_all(root.join("src/scss")).unwrap();
    fs::write(root.join("src/scss/site.scss"), "a { color: red; }").unwrap();
    fs::write(root.join("src/index.html"), "<html></html>").unwrap();
    (dir, root)
}

async fn watch(
    root: &Path,
    hub: ReloadHub,
) -> (WatcherHandle, mpsc::Receiver<RuntimeEvent>) {
    let paths = PathTable::from_config(&ConfigFileBuilder::new().build(), root).unwrap();
    let (tx, rx) = mpsc::channel(16);
    let handle = spawn_watcher(root, builtin_rules(&paths), tx, hub, DEBOUNCE)
        .await
        .unwrap();
    (handle, rx)
}

#[tokio::test]
async fn one_stylesheet_save_triggers_css_once() {
    init_tracing();
    let (_dir, root) = project();
    let (handle, mut rx) = watch(&root, ReloadHub::new()).await;
    assert!(handle.watched().contains(&root.join("src/scss")));

    fs::write(root.join("src/scss/site.scss"), "a { color: blue; }").unwrap();

    let event = timeout(Duration::from_secs(5), rx.recv())
        .await
        .expect("css should be triggered")
        .expect("channel open");
    match event {
        RuntimeEvent::TaskTriggered { task, reason } => {
            assert_eq!(task, "css");
            assert_eq!(reason, TriggerReason::FileWatch);
        }
        other => panic!("unexpected event {other:?}"),
    }

    // No second trigger for the same save.
    assert!(
        timeout(Duration::from_millis(500), rx.recv()).await.is_err(),
        "css was triggered twice"
    );
}

#[tokio::test]
async fn rewriting_identical_content_does_not_trigger() {
    init_tracing();
    let (_dir, root) = project();
    let (_handle, mut rx) = watch(&root, ReloadHub::new()).await;

    fs::write(root.join("src/scss/site.scss"), "a { color: red; }").unwrap();

    assert!(timeout(Duration::from_millis(600), rx.recv()).await.is_err());
}

#[tokio::test]
async fn html_edit_reloads_browsers_without_running_tasks() {
    init_tracing();
    let (_dir, root) = project();
    let hub = ReloadHub::new();
    let mut signals = hub.subscribe();
    let (_handle, mut rx) = watch(&root, hub).await;

    fs::write(root.join("src/index.html"), "<html><p>new</p></html>").unwrap();

    let signal = timeout(Duration::from_secs(5), signals.recv())
        .await
        .expect("reload should be published")
        .unwrap();
    assert_eq!(signal, ReloadSignal::Reload);
    assert!(timeout(Duration::from_millis(300), rx.recv()).await.is_err());
}

#[tokio::test]
async fn watch_task_reports_ready_and_never_returns() {
    init_tracing();
    let (_dir, root) = project();
    let ctx = site_context(&root, ConfigFileBuilder::new().server_port(0).build());
    let (tx, mut rx) = mpsc::channel(16);

    let mut task = tokio::spawn(watch_task::run(ctx, TaskReporter::new("watch", 1, tx)));

    let ready = timeout(Duration::from_secs(5), rx.recv()).await.unwrap();
    assert!(
        matches!(&ready, Some(RuntimeEvent::TaskProgressed { task: name }) if name == "watch"),
        "{ready:?}"
    );
    assert!(timeout(Duration::from_millis(300), &mut task).await.is_err());

    task.abort();
    assert!(task.await.unwrap_err().is_cancelled());
}
