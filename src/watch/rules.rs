// src/watch/rules.rs

use std::fmt;
use std::path::PathBuf;

use anyhow::Result;

use crate::engine::TaskName;
use crate::fs::FileSystem;
use crate::paths::{Category, PathTable, SourceGlob};

/// What a watch rule does when its files change.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WatchAction {
    /// Trigger a task through the runtime.
    RunTask(TaskName),
    /// Tell connected browsers to reload.
    Reload,
}

impl fmt::Display for WatchAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            WatchAction::RunTask(task) => write!(f, "run {task}"),
            WatchAction::Reload => f.write_str("reload"),
        }
    }
}

/// A source glob bound to an action.
#[derive(Debug, Clone)]
pub struct WatchRule {
    name: String,
    glob: SourceGlob,
    action: WatchAction,
    /// Only react to modifications of existing files, not creations or
    /// removals.
    changes_only: bool,
}

impl WatchRule {
    pub fn new(name: impl Into<String>, glob: SourceGlob, action: WatchAction) -> Self {
        Self {
            name: name.into(),
            glob,
            action,
            changes_only: false,
        }
    }

    pub fn changes_only(mut self, yes: bool) -> Self {
        self.changes_only = yes;
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn glob(&self) -> &SourceGlob {
        &self.glob
    }

    pub fn action(&self) -> &WatchAction {
        &self.action
    }

    pub fn is_changes_only(&self) -> bool {
        self.changes_only
    }

    /// `rel` is relative to the project root, with forward slashes.
    pub fn matches(&self, rel: &str) -> bool {
        self.glob.matches_root_relative(rel)
    }

    /// Every file currently matched by this rule, sorted.
    pub fn collect_files(&self, fs: &dyn FileSystem) -> Result<Vec<PathBuf>> {
        Ok(self
            .glob
            .collect(fs)?
            .into_iter()
            .map(|f| f.path)
            .collect())
    }
}

/// The rules installed by the watch task: stylesheets re-run `css`, HTML
/// edits reload the browser.
pub fn builtin_rules(paths: &PathTable) -> Vec<WatchRule> {
    vec![
        WatchRule::new(
            "scss",
            paths.source(Category::Scss).clone(),
            WatchAction::RunTask("css".to_string()),
        ),
        WatchRule::new(
            "html",
            paths.source(Category::Html).clone(),
            WatchAction::Reload,
        )
        .changes_only(true),
    ]
}
