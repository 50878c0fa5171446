use std::path::Path;
use std::sync::Arc;

use assetflow::config::{ConfigFile, RawConfigFile};
use assetflow::dag::{PlanNode, TaskPlan};
use assetflow::paths::PathTable;
use assetflow::tasks::TaskContext;

/// Builder for `ConfigFile` to simplify test setup.
pub struct ConfigFileBuilder {
    config: RawConfigFile,
}

impl ConfigFileBuilder {
    pub fn new() -> Self {
        Self {
            config: RawConfigFile::default(),
        }
    }

    pub fn browsers(mut self, query: &str) -> Self {
        self.config.css.browsers = query.to_string();
        self
    }

    /// `0` binds an ephemeral port.
    pub fn server_port(mut self, port: u16) -> Self {
        self.config.server.port = port;
        self
    }

    /// Disable every external image optimizer (files are copied as-is).
    pub fn no_external_optimizers(mut self) -> Self {
        self.config.images.gif.clear();
        self.config.images.jpeg.clear();
        self.config.images.svg.clear();
        self
    }

    pub fn build(self) -> ConfigFile {
        ConfigFile::try_from(self.config).expect("Failed to build valid config from builder")
    }
}

impl Default for ConfigFileBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// Task context over the real filesystem, rooted at `root`.
pub fn site_context(root: &Path, config: ConfigFile) -> Arc<TaskContext> {
    let paths = PathTable::from_config(&config, root).expect("path table");
    Arc::new(TaskContext::with_real_fs(config, paths).expect("task context"))
}

/// Builder for ad-hoc task plans.
pub struct PlanBuilder {
    nodes: Vec<PlanNode>,
    roots: Vec<String>,
}

impl PlanBuilder {
    pub fn new() -> Self {
        Self {
            nodes: Vec::new(),
            roots: Vec::new(),
        }
    }

    /// Add a task depending on `after`.
    pub fn task(mut self, name: &str, after: &[&str]) -> Self {
        let mut node = PlanNode::new(name);
        node.after = after.iter().map(|s| s.to_string()).collect();
        self.nodes.push(node);
        self
    }

    /// Add a long-lived task (reports readiness, never completes).
    pub fn long_lived(mut self, name: &str, after: &[&str]) -> Self {
        let mut node = PlanNode::new(name);
        node.after = after.iter().map(|s| s.to_string()).collect();
        node.long_lived = true;
        node.rerun = false;
        self.nodes.push(node);
        self
    }

    pub fn root(mut self, name: &str) -> Self {
        self.roots.push(name.to_string());
        self
    }

    pub fn build(self) -> TaskPlan {
        TaskPlan::from_nodes("test", self.nodes, self.roots).expect("valid plan")
    }
}

impl Default for PlanBuilder {
    fn default() -> Self {
        Self::new()
    }
}
