//! Supertask bound adjustment
//!
//! After subtasks move, every container up the tree is stretched or shrunk
//! to the span of its direct subtasks, level by level until nothing changes.

use std::collections::BTreeSet;
use tracing::debug;

use super::ScheduleError;
use crate::domain::{Calendar, TaskHierarchy, TaskId, TaskTree};

/// Bottom-up supertask span recomputation
#[derive(Debug, Clone, Copy, Default)]
pub struct AdjustTaskBounds;

impl AdjustTaskBounds {
    /// Recomputes the containers of the given tasks, then their containers,
    /// and so on. Returns the supertasks whose dates changed.
    pub fn run(
        &self,
        tree: &mut TaskTree,
        modified: impl IntoIterator<Item = TaskId>,
    ) -> Result<Vec<TaskId>, ScheduleError> {
        let mut changed = Vec::new();
        let mut level: BTreeSet<TaskId> = modified
            .into_iter()
            .filter_map(|task| tree.container(task))
            .collect();

        while !level.is_empty() {
            let mut next = BTreeSet::new();
            for supertask in level {
                if self.recalculate(tree, supertask)? {
                    changed.push(supertask);
                    if let Some(parent) = tree.container(supertask) {
                        next.insert(parent);
                    }
                }
            }
            level = next;
        }

        debug!(changed = changed.len(), "supertask bounds adjusted");
        Ok(changed)
    }

    /// Sets a supertask's dates to the span of its direct subtasks
    fn recalculate(&self, tree: &mut TaskTree, supertask: TaskId) -> Result<bool, ScheduleError> {
        let nested = tree.nested_tasks(supertask);
        let spans: Vec<_> = nested
            .iter()
            .filter_map(|id| tree.get(*id))
            .map(|t| (t.start, t.end))
            .collect();

        let (Some(min_start), Some(max_end)) = (
            spans.iter().map(|(s, _)| *s).min(),
            spans.iter().map(|(_, e)| *e).max(),
        ) else {
            return Ok(false);
        };

        let Some(current) = tree.get(supertask) else {
            return Ok(false);
        };
        if (current.start, current.end) == (min_start, max_end) {
            return Ok(false);
        }

        tree.set_dates(supertask, min_start, max_end)?;
        Ok(true)
    }

    /// Moves subtasks that stick out of their supertask back inside it,
    /// keeping their working length, then adjusts the containers of the
    /// moved tasks. Returns the moved subtasks.
    pub fn adjust_nested_tasks(
        &self,
        tree: &mut TaskTree,
        supertask: TaskId,
        calendar: &dyn Calendar,
    ) -> Result<Vec<TaskId>, ScheduleError> {
        let Some(bounds) = tree.get(supertask).map(|t| (t.start, t.end)) else {
            return Ok(vec![]);
        };
        let (super_start, super_end) = bounds;

        let mut nested = tree.nested_tasks(supertask);
        nested.sort_by_key(|id| tree.get(*id).map(|t| t.start));

        let mut moved = Vec::new();
        for id in nested {
            let Some(task) = tree.get(id).cloned() else {
                continue;
            };
            let mut start = task.start;
            if start < super_start {
                start = super_start;
            }
            if task.end > super_end {
                let overshoot = calendar.working_days_between(super_end, task.end);
                start = calendar.shift_date(start, -overshoot).max(super_start);
            }
            if start != task.start {
                tree.shift_task(id, start, calendar)?;
                moved.push(id);
            }
        }

        self.run(tree, moved.iter().copied())?;
        Ok(moved)
    }
}
