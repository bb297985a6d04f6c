//! Critical path analysis
//!
//! Walks the scheduling graph backwards from the project end. Each task's
//! latest finish is the earliest of:
//! - the project end
//! - for each dependant, and each task nested in a dependant, the latest
//!   dependee finish its latest start allows
//! - the latest finish of its container
//!
//! A task whose latest start equals its actual start has no slack and is
//! critical.

use chrono::NaiveDate;
use std::collections::HashMap;
use tracing::debug;

use super::graph::{EdgeKind, SchedulingGraph};
use super::ScheduleError;
use crate::dependency::{DependencyCollection, TaskDependency};
use crate::domain::{Calendar, TaskHierarchy, TaskId, TaskTree};

/// Latest dates a task can have without delaying the project
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LatestDates {
    pub latest_start: NaiveDate,
    pub latest_finish: NaiveDate,
}

/// Result of a critical path computation
#[derive(Debug, Clone, Default)]
pub struct CriticalPath {
    latest: HashMap<TaskId, LatestDates>,
    critical: Vec<TaskId>,
}

impl CriticalPath {
    /// Computes latest dates for every task of the tree
    pub fn compute(
        tree: &TaskTree,
        collection: &DependencyCollection,
        calendar: &dyn Calendar,
    ) -> Result<Self, ScheduleError> {
        let Some(project_end) = tree.project_end() else {
            return Ok(Self::default());
        };

        let graph = SchedulingGraph::build(tree, collection);
        let mut order = graph.topological_order()?;
        order.reverse();

        let mut result = Self::default();
        for task_id in order {
            let Some(task) = tree.get(task_id) else {
                continue;
            };

            let mut latest_finish = project_end;
            for (target, kind) in graph.outgoing(task_id) {
                // Inherited edges bind the dependee to each nested task directly
                let applied = match kind {
                    EdgeKind::Explicit(dependency) => dependency,
                    EdgeKind::Inherited(dependency) => {
                        TaskDependency::new(target, task_id, dependency.constraint(), dependency.hardness())
                            .with_difference(dependency.difference())
                    }
                    EdgeKind::SubSuper => continue,
                };
                let Some(dependant) = result.latest.get(&target) else {
                    continue;
                };
                if let Some(collision) = applied.backward_collision(dependant.latest_start, tree, calendar) {
                    latest_finish = latest_finish.min(collision.acceptable_start);
                }
            }
            if let Some(container) = tree.container(task_id).and_then(|c| result.latest.get(&c)) {
                latest_finish = latest_finish.min(container.latest_finish);
            }

            let length = task.activity().working_length(calendar);
            let latest_start = calendar.shift_date(latest_finish, -length);
            if latest_start == task.start {
                result.critical.push(task_id);
            }
            result.latest.insert(
                task_id,
                LatestDates {
                    latest_start,
                    latest_finish,
                },
            );
        }

        result.critical.sort();
        debug!(critical = result.critical.len(), "critical path computed");
        Ok(result)
    }

    /// Critical tasks in ID order
    pub fn critical_tasks(&self) -> &[TaskId] {
        &self.critical
    }

    pub fn is_critical(&self, task: TaskId) -> bool {
        self.critical.binary_search(&task).is_ok()
    }

    pub fn latest_dates(&self, task: TaskId) -> Option<LatestDates> {
        self.latest.get(&task).copied()
    }
}
