// tests/scheduler_properties.rs

use std::collections::{BTreeSet, HashMap, VecDeque};

use proptest::prelude::*;

use assetflow::dag::{PlanNode, Scheduler, TaskPlan};
use assetflow::engine::TaskOutcome;

/// Random acyclic plan: task `i` may only depend on tasks `< i`.
fn acyclic_plan() -> impl Strategy<Value = TaskPlan> {
    (1usize..9)
        .prop_flat_map(|n| {
            let edges = (0..n)
                .map(|i| proptest::collection::vec(any::<bool>(), i))
                .collect::<Vec<_>>();
            (Just(n), edges)
        })
        .prop_map(|(n, edges)| {
            let mut nodes = Vec::with_capacity(n);
            let mut roots = Vec::new();
            for (i, deps) in edges.iter().enumerate() {
                let mut node = PlanNode::new(format!("t{i}"));
                node.after = deps
                    .iter()
                    .enumerate()
                    .filter(|(_, on)| **on)
                    .map(|(j, _)| format!("t{j}"))
                    .collect();
                if node.after.is_empty() {
                    roots.push(node.name.clone());
                }
                nodes.push(node);
            }
            TaskPlan::from_nodes("prop", nodes, roots).expect("acyclic by construction")
        })
}

/// Drive one run to idle, completing tasks in dispatch order.
///
/// Returns the dispatch order. Tasks in `failing` complete with a failure.
fn drive(plan: &TaskPlan, failing: &BTreeSet<String>) -> (Vec<String>, Scheduler) {
    let mut scheduler = Scheduler::from_plan(plan);
    scheduler.start_new_run();

    let mut ready = VecDeque::new();
    for root in plan.roots() {
        ready.extend(scheduler.trigger(root).newly_scheduled);
    }

    let mut order = Vec::new();
    while let Some(task) = ready.pop_front() {
        order.push(task.name.clone());
        let outcome = if failing.contains(&task.name) {
            TaskOutcome::Failed(1)
        } else {
            TaskOutcome::Success
        };
        ready.extend(scheduler.complete(&task.name, outcome).newly_scheduled);
        assert!(order.len() <= plan.nodes().count(), "runaway scheduling");
    }

    (order, scheduler)
}

proptest! {
    #[test]
    fn every_task_runs_once_after_its_dependencies(plan in acyclic_plan()) {
        let (order, scheduler) = drive(&plan, &BTreeSet::new());

        prop_assert!(scheduler.is_idle());
        prop_assert_eq!(order.len(), plan.nodes().count());

        let position: HashMap<&str, usize> =
            order.iter().enumerate().map(|(i, n)| (n.as_str(), i)).collect();
        prop_assert_eq!(position.len(), order.len(), "a task ran twice");

        for node in plan.nodes() {
            for dep in &node.after {
                prop_assert!(position[dep.as_str()] < position[node.name.as_str()]);
            }
        }
    }

    #[test]
    fn failures_stop_dependents_and_the_run_still_ends(
        plan in acyclic_plan(),
        fail_mask in proptest::collection::vec(any::<bool>(), 9),
    ) {
        let failing: BTreeSet<String> = fail_mask
            .iter()
            .enumerate()
            .filter(|(_, f)| **f)
            .map(|(i, _)| format!("t{i}"))
            .collect();

        let (order, scheduler) = drive(&plan, &failing);
        prop_assert!(scheduler.is_idle());

        let ran: BTreeSet<&str> = order.iter().map(String::as_str).collect();
        for node in plan.nodes() {
            let blocked = node
                .after
                .iter()
                .any(|dep| failing.contains(dep) || !ran.contains(dep.as_str()));
            if blocked {
                prop_assert!(!ran.contains(node.name.as_str()), "{} ran after a failed dependency", node.name);
            }
        }
    }
}
