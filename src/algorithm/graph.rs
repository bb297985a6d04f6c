//! Scheduling graph
//!
//! The effective graph the scheduler walks, built with petgraph:
//! - explicit edges: dependee -> dependant
//! - inherited edges: dependee -> every descendant of the dependant
//! - implicit edges: subtask -> supertask
//!
//! The collection keeps this graph acyclic, so it always has a
//! topological order.

use petgraph::algo::toposort;
use petgraph::graph::{DiGraph, NodeIndex};
use petgraph::visit::EdgeRef;
use petgraph::Direction;
use std::collections::HashMap;

use super::ScheduleError;
use crate::dependency::{DependencyCollection, TaskDependency};
use crate::domain::{TaskHierarchy, TaskId, TaskTree};

/// Why one task constrains another
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EdgeKind {
    /// A dependency edge
    Explicit(TaskDependency),
    /// A dependency of a supertask, applied to one of its descendants
    Inherited(TaskDependency),
    /// Subtask to its direct container
    SubSuper,
}

/// A directed acyclic graph over all tasks of a tree
#[derive(Debug, Default)]
pub struct SchedulingGraph {
    /// The underlying directed graph
    graph: DiGraph<TaskId, EdgeKind>,

    /// Map from TaskId to node index
    node_map: HashMap<TaskId, NodeIndex>,
}

impl SchedulingGraph {
    /// Creates an empty graph
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds the effective graph of a tree and its dependencies
    pub fn build(tree: &TaskTree, collection: &DependencyCollection) -> Self {
        let mut graph = Self::new();

        // First pass: add all nodes
        for id in tree.ids() {
            graph.add_task(id);
        }

        // Second pass: containment and dependency edges
        for id in tree.ids() {
            if let Some(parent) = tree.container(id) {
                graph.add_edge(id, parent, EdgeKind::SubSuper);
            }
        }
        for dependency in collection.dependencies() {
            graph.add_edge(dependency.dependee(), dependency.dependant(), EdgeKind::Explicit(dependency));
            for descendant in tree.deep_nested_tasks(dependency.dependant()) {
                graph.add_edge(dependency.dependee(), descendant, EdgeKind::Inherited(dependency));
            }
        }

        graph
    }

    /// Adds a task node
    pub fn add_task(&mut self, task: TaskId) {
        if !self.node_map.contains_key(&task) {
            let idx = self.graph.add_node(task);
            self.node_map.insert(task, idx);
        }
    }

    /// Adds an edge between known tasks; edges to unknown tasks are ignored
    fn add_edge(&mut self, from: TaskId, to: TaskId, kind: EdgeKind) {
        if let (Some(&a), Some(&b)) = (self.node_map.get(&from), self.node_map.get(&to)) {
            self.graph.add_edge(a, b, kind);
        }
    }

    /// Returns the edges pointing into a task with their source task
    pub fn incoming(&self, task: TaskId) -> Vec<(TaskId, EdgeKind)> {
        let Some(&idx) = self.node_map.get(&task) else {
            return vec![];
        };

        self.graph
            .edges_directed(idx, Direction::Incoming)
            .filter_map(|edge| {
                self.graph
                    .node_weight(edge.source())
                    .map(|source| (*source, *edge.weight()))
            })
            .collect()
    }

    /// Returns the edges leaving a task with their target task
    pub fn outgoing(&self, task: TaskId) -> Vec<(TaskId, EdgeKind)> {
        let Some(&idx) = self.node_map.get(&task) else {
            return vec![];
        };

        self.graph
            .edges_directed(idx, Direction::Outgoing)
            .filter_map(|edge| {
                self.graph
                    .node_weight(edge.target())
                    .map(|target| (*target, *edge.weight()))
            })
            .collect()
    }

    /// Returns the tasks a task points to
    pub fn successors(&self, task: TaskId) -> Vec<TaskId> {
        let Some(&idx) = self.node_map.get(&task) else {
            return vec![];
        };

        self.graph
            .neighbors_directed(idx, Direction::Outgoing)
            .filter_map(|n| self.graph.node_weight(n).copied())
            .collect()
    }

    /// Returns all tasks in topological order (constraining tasks first)
    pub fn topological_order(&self) -> Result<Vec<TaskId>, ScheduleError> {
        toposort(&self.graph, None)
            .map(|order| {
                order
                    .into_iter()
                    .filter_map(|idx| self.graph.node_weight(idx).copied())
                    .collect()
            })
            .map_err(|cycle| {
                let task = self.graph.node_weight(cycle.node_id()).copied().unwrap_or(TaskId::MIN);
                ScheduleError::Cycle(task)
            })
    }

    /// Groups tasks into layers: every task comes after all tasks it depends on
    ///
    /// Layer `n` holds the tasks whose longest incoming path has `n` edges.
    pub fn layers(&self) -> Result<Vec<Vec<TaskId>>, ScheduleError> {
        let order = self.topological_order()?;
        let mut depth: HashMap<TaskId, usize> = HashMap::new();
        let mut layers: Vec<Vec<TaskId>> = Vec::new();

        for task in order {
            let level = self
                .incoming(task)
                .iter()
                .filter_map(|(source, _)| depth.get(source))
                .map(|d| d + 1)
                .max()
                .unwrap_or(0);
            depth.insert(task, level);
            if layers.len() <= level {
                layers.resize_with(level + 1, Vec::new);
            }
            layers[level].push(task);
        }

        Ok(layers)
    }

    /// Returns true if the graph contains the task
    pub fn contains(&self, task: TaskId) -> bool {
        self.node_map.contains_key(&task)
    }

    /// Returns the number of tasks in the graph
    pub fn len(&self) -> usize {
        self.node_map.len()
    }

    /// Returns true if the graph is empty
    pub fn is_empty(&self) -> bool {
        self.node_map.is_empty()
    }

    /// Returns the number of edges of all kinds
    pub fn edge_count(&self) -> usize {
        self.graph.edge_count()
    }
}
