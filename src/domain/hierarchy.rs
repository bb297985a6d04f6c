//! Task containment hierarchy
//!
//! The dependency core never owns the task tree; it only asks questions
//! about it through [`TaskHierarchy`].

use std::cell::RefCell;

use super::id::TaskId;

/// Read-only view of the task containment hierarchy
///
/// Methods return owned values so the view can be served from behind a
/// `RefCell` shared with the code that edits the tree.
pub trait TaskHierarchy {
    /// Returns the direct container of a task, or `None` for top-level tasks
    fn container(&self, task: TaskId) -> Option<TaskId>;

    /// Returns the direct children of a task
    fn nested_tasks(&self, task: TaskId) -> Vec<TaskId>;

    /// Returns true if the task is known to the hierarchy
    ///
    /// Views that cannot tell accept every task.
    fn contains_task(&self, _task: TaskId) -> bool {
        true
    }

    /// Returns true if the task has children
    fn has_nested_tasks(&self, task: TaskId) -> bool {
        !self.nested_tasks(task).is_empty()
    }

    /// Returns true if `ancestor` contains `task`, directly or transitively
    fn is_ancestor(&self, ancestor: TaskId, task: TaskId) -> bool {
        let mut current = self.container(task);
        while let Some(parent) = current {
            if parent == ancestor {
                return true;
            }
            current = self.container(parent);
        }
        false
    }

    /// Returns true if neither task contains the other
    ///
    /// A task is related to itself.
    fn are_unrelated(&self, a: TaskId, b: TaskId) -> bool {
        a != b && !self.is_ancestor(a, b) && !self.is_ancestor(b, a)
    }

    /// Returns all descendants of a task, depth first
    fn deep_nested_tasks(&self, task: TaskId) -> Vec<TaskId> {
        let mut result = Vec::new();
        let mut stack = self.nested_tasks(task);
        stack.reverse();
        while let Some(next) = stack.pop() {
            result.push(next);
            let mut children = self.nested_tasks(next);
            children.reverse();
            stack.extend(children);
        }
        result
    }

    /// Returns the nesting depth; top-level tasks have depth 1
    fn depth(&self, task: TaskId) -> usize {
        let mut depth = 1;
        let mut current = self.container(task);
        while let Some(parent) = current {
            depth += 1;
            current = self.container(parent);
        }
        depth
    }
}

impl<T: TaskHierarchy> TaskHierarchy for RefCell<T> {
    fn container(&self, task: TaskId) -> Option<TaskId> {
        self.borrow().container(task)
    }

    fn nested_tasks(&self, task: TaskId) -> Vec<TaskId> {
        self.borrow().nested_tasks(task)
    }

    fn contains_task(&self, task: TaskId) -> bool {
        self.borrow().contains_task(task)
    }

    fn has_nested_tasks(&self, task: TaskId) -> bool {
        self.borrow().has_nested_tasks(task)
    }

    fn is_ancestor(&self, ancestor: TaskId, task: TaskId) -> bool {
        self.borrow().is_ancestor(ancestor, task)
    }
}

/// Hierarchy where every task is top-level
#[derive(Debug, Clone, Copy, Default)]
pub struct FlatHierarchy;

impl TaskHierarchy for FlatHierarchy {
    fn container(&self, _task: TaskId) -> Option<TaskId> {
        None
    }

    fn nested_tasks(&self, _task: TaskId) -> Vec<TaskId> {
        Vec::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    struct MapHierarchy(HashMap<TaskId, TaskId>);

    impl TaskHierarchy for MapHierarchy {
        fn container(&self, task: TaskId) -> Option<TaskId> {
            self.0.get(&task).copied()
        }

        fn nested_tasks(&self, task: TaskId) -> Vec<TaskId> {
            let mut children: Vec<_> = self
                .0
                .iter()
                .filter(|(_, parent)| **parent == task)
                .map(|(child, _)| *child)
                .collect();
            children.sort();
            children
        }
    }

    fn id(n: u32) -> TaskId {
        TaskId::new(n)
    }

    // 1
    // ├── 2
    // │   └── 4
    // └── 3
    fn sample() -> MapHierarchy {
        MapHierarchy(HashMap::from([(id(2), id(1)), (id(3), id(1)), (id(4), id(2))]))
    }

    #[test]
    fn ancestors_and_relations() {
        let h = sample();
        assert!(h.is_ancestor(id(1), id(4)));
        assert!(h.is_ancestor(id(2), id(4)));
        assert!(!h.is_ancestor(id(3), id(4)));
        assert!(!h.is_ancestor(id(4), id(1)));

        assert!(!h.are_unrelated(id(1), id(4)));
        assert!(!h.are_unrelated(id(4), id(1)));
        assert!(!h.are_unrelated(id(3), id(3)));
        assert!(h.are_unrelated(id(3), id(4)));
    }

    #[test]
    fn deep_nested_and_depth() {
        let h = sample();
        assert_eq!(h.deep_nested_tasks(id(1)), vec![id(2), id(4), id(3)]);
        assert!(h.has_nested_tasks(id(2)));
        assert!(!h.has_nested_tasks(id(4)));
        assert_eq!(h.depth(id(1)), 1);
        assert_eq!(h.depth(id(4)), 3);
    }

    #[test]
    fn refcell_view_sees_updates() {
        let cell = RefCell::new(sample());
        assert!(cell.are_unrelated(id(3), id(4)));
        cell.borrow_mut().0.insert(id(4), id(3));
        assert!(!cell.are_unrelated(id(3), id(4)));
    }

    #[test]
    fn flat_hierarchy_relates_nothing() {
        assert!(FlatHierarchy.are_unrelated(id(1), id(2)));
        assert!(!FlatHierarchy.are_unrelated(id(1), id(1)));
        assert!(FlatHierarchy.nested_tasks(id(1)).is_empty());
    }
}
