// src/dag/graph.rs

use std::collections::HashMap;

use crate::dag::plan::TaskPlan;
use crate::engine::TaskName;

/// Edges of a [`TaskPlan`] in both directions.
///
/// The plan already rejected cycles and dangling names; this is only the
/// lookup structure the scheduler walks.
#[derive(Debug, Clone, Default)]
pub struct DagGraph {
    deps: HashMap<TaskName, Vec<TaskName>>,
    dependents: HashMap<TaskName, Vec<TaskName>>,
}

impl DagGraph {
    pub fn from_plan(plan: &TaskPlan) -> Self {
        let mut graph = Self::default();
        for node in plan.nodes() {
            graph.deps.insert(node.name.clone(), node.after.clone());
            graph.dependents.entry(node.name.clone()).or_default();
            for dep in &node.after {
                graph
                    .dependents
                    .entry(dep.clone())
                    .or_default()
                    .push(node.name.clone());
            }
        }
        graph
    }

    /// Tasks that must finish before `name` starts.
    pub fn dependencies_of(&self, name: &str) -> &[TaskName] {
        self.deps.get(name).map_or(&[], Vec::as_slice)
    }

    /// Tasks waiting on `name`.
    pub fn dependents_of(&self, name: &str) -> &[TaskName] {
        self.dependents.get(name).map_or(&[], Vec::as_slice)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dag::plan::ExposedTask;

    #[test]
    fn build_plan_fans_out_from_clean() {
        let plan = TaskPlan::for_exposed(ExposedTask::Build).unwrap();
        let graph = DagGraph::from_plan(&plan);

        let mut dependents = graph.dependents_of("clean").to_vec();
        dependents.sort();
        assert_eq!(dependents, ["css", "html", "images", "scripts", "watch"]);
        assert_eq!(graph.dependencies_of("css"), ["clean".to_string()]);
        assert!(graph.dependencies_of("missing").is_empty());
        assert!(graph.dependents_of("watch").is_empty());
    }
}
