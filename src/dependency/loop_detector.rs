//! Cycle detection for candidate edges
//!
//! The check runs on the effective graph the scheduler walks:
//! - explicit edges `dependee -> dependant`
//! - inherited edges `dependee -> d` for every descendant `d` of the dependant
//! - implicit edges `child -> container`
//!
//! A candidate `dependee -> dependant` loops iff its dependee is reachable
//! from its dependant (or, through the inherited edges, from any of the
//! dependant's descendants).

use std::collections::HashSet;
use tracing::debug;

use super::collection::DependencyCollection;
use crate::domain::{DependencyKey, TaskHierarchy, TaskId};

/// How a task was reached
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
enum Mode {
    /// Through an explicit or inherited edge; the task's subtree is reached too
    Enter,
    /// Through a containment edge from one of its children
    Ascend,
}

/// Walks the effective graph of a collection
pub struct LoopDetector<'a> {
    collection: &'a DependencyCollection,
}

impl<'a> LoopDetector<'a> {
    pub fn new(collection: &'a DependencyCollection) -> Self {
        Self { collection }
    }

    /// Returns true if adding the edge would close a cycle
    pub fn is_looping(&self, candidate: DependencyKey) -> bool {
        let hierarchy = self.collection.hierarchy();
        let target = candidate.dependee;

        let mut stack = vec![(candidate.dependant, Mode::Enter)];
        let mut explored: HashSet<(TaskId, Mode)> = HashSet::new();

        while let Some((task, mode)) = stack.pop() {
            if !explored.insert((task, mode)) {
                continue;
            }
            // Entering a task already dominates ascending into it
            if mode == Mode::Ascend && explored.contains(&(task, Mode::Enter)) {
                continue;
            }

            if self.closes_loop(hierarchy, task, mode, target) {
                debug!(%candidate, via = %task, "dependency would create a loop");
                return true;
            }

            if mode == Mode::Enter {
                for child in hierarchy.nested_tasks(task) {
                    stack.push((child, Mode::Enter));
                }
            }
            for dependant in self.collection.dependant_tasks(task) {
                stack.push((dependant, Mode::Enter));
            }
            if let Some(parent) = hierarchy.container(task) {
                stack.push((parent, Mode::Ascend));
            }
        }

        false
    }

    fn closes_loop(&self, hierarchy: &dyn TaskHierarchy, task: TaskId, mode: Mode, target: TaskId) -> bool {
        if task == target {
            return true;
        }
        match mode {
            // Entering an ancestor of the target means the target inherits the edge
            Mode::Enter => !hierarchy.are_unrelated(task, target),
            Mode::Ascend => hierarchy.is_ancestor(target, task),
        }
    }
}
