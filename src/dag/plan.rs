// src/dag/plan.rs

//! Task plans: which built-in tasks exist, how the exposed task names
//! compose them, and the resulting dependency graph.
//!
//! Compositions are flattened into `after` edges:
//!
//! ```text
//! build = series(clean, parallel(css, images, js, watch, html))
//!
//!          ┌─► css
//!          ├─► images
//!   clean ─┼─► scripts      (js = series(scripts))
//!          ├─► watch
//!          └─► html
//! ```
//!
//! Every built-in task is a node of every plan, even when the exposed task
//! does not reach it. Only the composition's entry tasks are triggered at
//! startup; the rest stay idle until something (the watcher) triggers them.

use std::collections::BTreeMap;
use std::fmt;

use clap::ValueEnum;
use petgraph::algo::toposort;
use petgraph::graphmap::DiGraphMap;

use crate::engine::TaskName;
use crate::errors::{AssetflowError, Result};

/// The steps assetflow knows how to run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum BuiltinTask {
    Clean,
    Images,
    Css,
    Html,
    Scripts,
    Watch,
}

impl BuiltinTask {
    pub const ALL: [BuiltinTask; 6] = [
        BuiltinTask::Clean,
        BuiltinTask::Images,
        BuiltinTask::Css,
        BuiltinTask::Html,
        BuiltinTask::Scripts,
        BuiltinTask::Watch,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            BuiltinTask::Clean => "clean",
            BuiltinTask::Images => "images",
            BuiltinTask::Css => "css",
            BuiltinTask::Html => "html",
            BuiltinTask::Scripts => "scripts",
            BuiltinTask::Watch => "watch",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|t| t.name() == name)
    }

    /// Long-lived tasks report readiness instead of completing.
    pub fn long_lived(&self) -> bool {
        matches!(self, BuiltinTask::Watch)
    }

    /// Whether a new scheduling request replaces a still-running instance.
    pub fn rerun(&self) -> bool {
        !self.long_lived()
    }
}

impl fmt::Display for BuiltinTask {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Task names accepted on the command line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum ExposedTask {
    Images,
    Css,
    Js,
    Html,
    Clean,
    Build,
    Watch,
    /// Alias for `build`.
    Default,
}

impl ExposedTask {
    pub fn name(&self) -> &'static str {
        match self {
            ExposedTask::Images => "images",
            ExposedTask::Css => "css",
            ExposedTask::Js => "js",
            ExposedTask::Html => "html",
            ExposedTask::Clean => "clean",
            ExposedTask::Build => "build",
            ExposedTask::Watch => "watch",
            ExposedTask::Default => "default",
        }
    }

    /// How this name is composed from built-in tasks.
    pub fn composition(&self) -> Composition {
        use Composition::{Parallel, Series, Task};

        match self {
            ExposedTask::Images => Task(BuiltinTask::Images),
            ExposedTask::Css => Task(BuiltinTask::Css),
            ExposedTask::Js => Series(vec![Task(BuiltinTask::Scripts)]),
            ExposedTask::Html => Task(BuiltinTask::Html),
            ExposedTask::Clean => Task(BuiltinTask::Clean),
            ExposedTask::Watch => Task(BuiltinTask::Watch),
            ExposedTask::Build | ExposedTask::Default => Series(vec![
                Task(BuiltinTask::Clean),
                Parallel(vec![
                    Task(BuiltinTask::Css),
                    Task(BuiltinTask::Images),
                    ExposedTask::Js.composition(),
                    Task(BuiltinTask::Watch),
                    Task(BuiltinTask::Html),
                ]),
            ]),
        }
    }
}

impl fmt::Display for ExposedTask {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Series/parallel composition of built-in tasks.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Composition {
    Task(BuiltinTask),
    /// Each step starts once every task of the previous step is done.
    Series(Vec<Composition>),
    /// All children start together.
    Parallel(Vec<Composition>),
}

impl Composition {
    /// Add this composition's edges to `deps` and return its
    /// `(entry, exit)` task sets.
    fn wire(
        &self,
        deps: &mut BTreeMap<BuiltinTask, Vec<BuiltinTask>>,
    ) -> (Vec<BuiltinTask>, Vec<BuiltinTask>) {
        match self {
            Composition::Task(task) => {
                deps.entry(*task).or_default();
                (vec![*task], vec![*task])
            }
            Composition::Parallel(children) => {
                let mut entries = Vec::new();
                let mut exits = Vec::new();
                for child in children {
                    let (e, x) = child.wire(deps);
                    entries.extend(e);
                    exits.extend(x);
                }
                (entries, exits)
            }
            Composition::Series(steps) => {
                let mut entries: Option<Vec<BuiltinTask>> = None;
                let mut previous_exits: Vec<BuiltinTask> = Vec::new();
                for step in steps {
                    let (step_entries, step_exits) = step.wire(deps);
                    for entry in &step_entries {
                        let list = deps.entry(*entry).or_default();
                        for dep in &previous_exits {
                            if !list.contains(dep) {
                                list.push(*dep);
                            }
                        }
                    }
                    if entries.is_none() {
                        entries = Some(step_entries);
                    }
                    previous_exits = step_exits;
                }
                (entries.unwrap_or_default(), previous_exits)
            }
        }
    }
}

/// A node of a [`TaskPlan`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlanNode {
    pub name: TaskName,
    /// Direct dependencies (tasks that must finish first).
    pub after: Vec<TaskName>,
    pub long_lived: bool,
    pub rerun: bool,
}

impl PlanNode {
    pub fn new(name: impl Into<TaskName>) -> Self {
        Self {
            name: name.into(),
            after: Vec::new(),
            long_lived: false,
            rerun: true,
        }
    }

    fn for_builtin(task: BuiltinTask, after: &[BuiltinTask]) -> Self {
        Self {
            name: task.name().to_string(),
            after: after.iter().map(|t| t.name().to_string()).collect(),
            long_lived: task.long_lived(),
            rerun: task.rerun(),
        }
    }
}

/// A validated task graph plus the tasks to trigger at startup.
#[derive(Debug, Clone)]
pub struct TaskPlan {
    name: String,
    nodes: BTreeMap<TaskName, PlanNode>,
    roots: Vec<TaskName>,
}

impl TaskPlan {
    /// The plan behind a CLI task name.
    pub fn for_exposed(task: ExposedTask) -> Result<Self> {
        Self::from_composition(task.name(), &task.composition())
    }

    /// Flatten a composition into a plan containing every built-in task.
    pub fn from_composition(name: &str, composition: &Composition) -> Result<Self> {
        let mut deps: BTreeMap<BuiltinTask, Vec<BuiltinTask>> = BTreeMap::new();
        let (entries, _exits) = composition.wire(&mut deps);

        let nodes = BuiltinTask::ALL
            .iter()
            .map(|task| {
                let after = deps.get(task).map(Vec::as_slice).unwrap_or(&[]);
                PlanNode::for_builtin(*task, after)
            })
            .collect();
        let roots = entries.iter().map(|t| t.name().to_string()).collect();

        Self::from_nodes(name, nodes, roots)
    }

    /// Build a plan from explicit nodes, checking references and acyclicity.
    pub fn from_nodes(
        name: impl Into<String>,
        nodes: Vec<PlanNode>,
        roots: Vec<TaskName>,
    ) -> Result<Self> {
        let nodes: BTreeMap<TaskName, PlanNode> =
            nodes.into_iter().map(|n| (n.name.clone(), n)).collect();

        if nodes.is_empty() {
            return Err(AssetflowError::Config(
                "a task plan needs at least one task".to_string(),
            ));
        }
        validate_dependencies(&nodes)?;
        validate_acyclic(&nodes)?;
        for root in &roots {
            if !nodes.contains_key(root) {
                return Err(AssetflowError::UnknownTask(root.clone()));
            }
        }

        Ok(Self {
            name: name.into(),
            nodes,
            roots,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn nodes(&self) -> impl Iterator<Item = &PlanNode> {
        self.nodes.values()
    }

    pub fn node(&self, name: &str) -> Option<&PlanNode> {
        self.nodes.get(name)
    }

    /// Tasks triggered when the plan starts.
    pub fn roots(&self) -> &[TaskName] {
        &self.roots
    }

    /// Names reachable from the roots, in dependency order.
    pub fn reachable(&self) -> Vec<TaskName> {
        let mut graph: DiGraphMap<&str, ()> = DiGraphMap::new();
        for node in self.nodes.values() {
            graph.add_node(node.name.as_str());
            for dep in &node.after {
                graph.add_edge(dep.as_str(), node.name.as_str(), ());
            }
        }

        let mut reached: Vec<&str> = Vec::new();
        let mut stack: Vec<&str> = self.roots.iter().map(String::as_str).collect();
        while let Some(name) = stack.pop() {
            if reached.contains(&name) {
                continue;
            }
            reached.push(name);
            stack.extend(graph.neighbors(name));
        }

        // Validated acyclic in `from_nodes`.
        let order = toposort(&graph, None).unwrap_or_default();
        order
            .into_iter()
            .filter(|n| reached.contains(n))
            .map(str::to_string)
            .collect()
    }

    /// Whether running this plan starts a task that never completes, in
    /// which case the process keeps running after the first pass.
    pub fn keeps_running(&self) -> bool {
        self.reachable()
            .iter()
            .any(|name| self.nodes.get(name).is_some_and(|n| n.long_lived))
    }
}

fn validate_dependencies(nodes: &BTreeMap<TaskName, PlanNode>) -> Result<()> {
    for (name, node) in nodes {
        for dep in &node.after {
            if dep == name {
                return Err(AssetflowError::Config(format!(
                    "task '{name}' cannot depend on itself"
                )));
            }
            if !nodes.contains_key(dep) {
                return Err(AssetflowError::Config(format!(
                    "task '{name}' has unknown dependency '{dep}'"
                )));
            }
        }
    }
    Ok(())
}

fn validate_acyclic(nodes: &BTreeMap<TaskName, PlanNode>) -> Result<()> {
    // Edge direction: dep -> task.
    let mut graph: DiGraphMap<&str, ()> = DiGraphMap::new();
    for name in nodes.keys() {
        graph.add_node(name.as_str());
    }
    for (name, node) in nodes {
        for dep in &node.after {
            graph.add_edge(dep.as_str(), name.as_str(), ());
        }
    }

    match toposort(&graph, None) {
        Ok(_order) => Ok(()),
        Err(cycle) => Err(AssetflowError::DagCycle(format!(
            "cycle detected in task plan involving task '{}'",
            cycle.node_id()
        ))),
    }
}
