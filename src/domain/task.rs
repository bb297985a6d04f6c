//! Task domain model
//!
//! Tasks are the scheduled units of work. They occupy a half-open date range
//! `[start, end)` and live in a containment tree: a task with nested tasks
//! is a supertask whose span covers its children.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::cell::RefCell;
use std::collections::{BTreeMap, HashMap};
use thiserror::Error;

use super::calendar::Calendar;
use super::hierarchy::TaskHierarchy;
use super::id::TaskId;

#[derive(Debug, Error, PartialEq)]
pub enum TreeError {
    #[error("Task already exists: {0}")]
    DuplicateTask(TaskId),

    #[error("Task not found: {0}")]
    TaskNotFound(TaskId),

    #[error("Cannot move task {task} under {target}: target is the task itself or one of its subtasks")]
    InvalidMove { task: TaskId, target: TaskId },

    #[error("Invalid dates for task {task}: end {end} is before start {start}")]
    InvalidDates {
        task: TaskId,
        start: NaiveDate,
        end: NaiveDate,
    },
}

/// The span a task occupies on the timeline, `[start, end)`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Activity {
    pub start: NaiveDate,
    pub end: NaiveDate,
}

impl Activity {
    pub fn new(start: NaiveDate, end: NaiveDate) -> Self {
        Self { start, end }
    }

    /// Returns true for zero-length (milestone) activities
    pub fn is_empty(&self) -> bool {
        self.start >= self.end
    }

    /// Returns the length in working days
    pub fn working_length(&self, calendar: &dyn Calendar) -> i64 {
        calendar.working_days_between(self.start, self.end).max(0)
    }
}

/// Read access to task dates, as consumed by dependency constraints
pub trait TaskSchedule {
    /// Returns the effective activity of a task, or `None` if unknown
    fn activity(&self, task: TaskId) -> Option<Activity>;
}

impl<T: TaskSchedule> TaskSchedule for RefCell<T> {
    fn activity(&self, task: TaskId) -> Option<Activity> {
        self.borrow().activity(task)
    }
}

/// A scheduled task
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Task {
    /// Unique identifier
    pub id: TaskId,

    /// Human-readable name
    pub name: String,

    /// First day of work
    pub start: NaiveDate,

    /// Day after the last day of work
    pub end: NaiveDate,

    /// Milestones are zero-length markers
    #[serde(default)]
    pub milestone: bool,

    /// "Earliest begin" constraint: the scheduler never starts the task before this date
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub earliest_start: Option<NaiveDate>,
}

impl Task {
    /// Creates a new task occupying `[start, end)`
    pub fn new(id: TaskId, name: impl Into<String>, start: NaiveDate, end: NaiveDate) -> Self {
        Self {
            id,
            name: name.into(),
            start,
            end,
            milestone: false,
            earliest_start: None,
        }
    }

    /// Creates a milestone at the given date
    pub fn milestone(id: TaskId, name: impl Into<String>, date: NaiveDate) -> Self {
        Self {
            id,
            name: name.into(),
            start: date,
            end: date,
            milestone: true,
            earliest_start: None,
        }
    }

    /// Sets the earliest start constraint
    pub fn with_earliest_start(mut self, date: NaiveDate) -> Self {
        self.earliest_start = Some(date);
        self
    }

    /// Returns the activity used when evaluating dependencies
    ///
    /// A milestone's activity collapses to its start date.
    pub fn activity(&self) -> Activity {
        if self.milestone {
            Activity::new(self.start, self.start)
        } else {
            Activity::new(self.start, self.end)
        }
    }

    /// Moves the task to a new start, keeping its length in working days
    pub fn shift_to(&mut self, new_start: NaiveDate, calendar: &dyn Calendar) {
        let length = self.activity().working_length(calendar);
        self.start = new_start;
        self.end = if self.milestone {
            new_start
        } else {
            calendar.shift_date(new_start, length)
        };
    }
}

/// In-memory task store with a containment hierarchy
#[derive(Debug, Clone, Default)]
pub struct TaskTree {
    tasks: BTreeMap<TaskId, Task>,
    parents: HashMap<TaskId, TaskId>,
    children: HashMap<TaskId, Vec<TaskId>>,
}

impl TaskTree {
    /// Creates an empty tree
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a top-level task
    pub fn add_task(&mut self, task: Task) -> Result<(), TreeError> {
        if self.tasks.contains_key(&task.id) {
            return Err(TreeError::DuplicateTask(task.id));
        }
        if task.end < task.start {
            return Err(TreeError::InvalidDates {
                task: task.id,
                start: task.start,
                end: task.end,
            });
        }

        self.tasks.insert(task.id, task);
        Ok(())
    }

    /// Adds a task nested in `parent`
    pub fn add_subtask(&mut self, parent: TaskId, task: Task) -> Result<(), TreeError> {
        if !self.tasks.contains_key(&parent) {
            return Err(TreeError::TaskNotFound(parent));
        }

        let id = task.id;
        self.add_task(task)?;
        self.link(id, parent);
        Ok(())
    }

    /// Moves a task under a new container (`None` makes it top-level)
    pub fn move_task(&mut self, task: TaskId, new_parent: Option<TaskId>) -> Result<(), TreeError> {
        if !self.tasks.contains_key(&task) {
            return Err(TreeError::TaskNotFound(task));
        }

        if let Some(target) = new_parent {
            if !self.tasks.contains_key(&target) {
                return Err(TreeError::TaskNotFound(target));
            }
            if target == task || self.is_ancestor(task, target) {
                return Err(TreeError::InvalidMove { task, target });
            }
        }

        self.unlink(task);
        if let Some(target) = new_parent {
            self.link(task, target);
        }
        Ok(())
    }

    fn link(&mut self, child: TaskId, parent: TaskId) {
        self.parents.insert(child, parent);
        self.children.entry(parent).or_default().push(child);
    }

    fn unlink(&mut self, child: TaskId) {
        if let Some(parent) = self.parents.remove(&child) {
            if let Some(siblings) = self.children.get_mut(&parent) {
                siblings.retain(|id| *id != child);
                if siblings.is_empty() {
                    self.children.remove(&parent);
                }
            }
        }
    }

    /// Returns a task by ID
    pub fn get(&self, id: TaskId) -> Option<&Task> {
        self.tasks.get(&id)
    }

    /// Returns true if the tree contains the task
    pub fn contains(&self, id: TaskId) -> bool {
        self.tasks.contains_key(&id)
    }

    /// Sets both dates of a task
    pub fn set_dates(&mut self, id: TaskId, start: NaiveDate, end: NaiveDate) -> Result<(), TreeError> {
        if end < start {
            return Err(TreeError::InvalidDates {
                task: id,
                start,
                end,
            });
        }

        let task = self.tasks.get_mut(&id).ok_or(TreeError::TaskNotFound(id))?;
        task.start = start;
        task.end = end;
        Ok(())
    }

    /// Sets the start date; the end moves along if it would precede the start
    pub fn set_start(&mut self, id: TaskId, start: NaiveDate) -> Result<(), TreeError> {
        let task = self.tasks.get_mut(&id).ok_or(TreeError::TaskNotFound(id))?;
        task.start = start;
        if task.end < start {
            task.end = start;
        }
        Ok(())
    }

    /// Sets the end date
    pub fn set_end(&mut self, id: TaskId, end: NaiveDate) -> Result<(), TreeError> {
        let task = self.tasks.get_mut(&id).ok_or(TreeError::TaskNotFound(id))?;
        if end < task.start {
            return Err(TreeError::InvalidDates {
                task: id,
                start: task.start,
                end,
            });
        }
        task.end = end;
        Ok(())
    }

    /// Moves a task to a new start keeping its working length
    pub fn shift_task(&mut self, id: TaskId, new_start: NaiveDate, calendar: &dyn Calendar) -> Result<(), TreeError> {
        let task = self.tasks.get_mut(&id).ok_or(TreeError::TaskNotFound(id))?;
        task.shift_to(new_start, calendar);
        Ok(())
    }

    /// Iterates over all tasks in ID order
    pub fn tasks(&self) -> impl Iterator<Item = &Task> {
        self.tasks.values()
    }

    /// Iterates over all task IDs in order
    pub fn ids(&self) -> impl Iterator<Item = TaskId> + '_ {
        self.tasks.keys().copied()
    }

    /// Returns top-level tasks in ID order
    pub fn roots(&self) -> Vec<TaskId> {
        self.ids().filter(|id| !self.parents.contains_key(id)).collect()
    }

    /// Returns the number of tasks
    pub fn len(&self) -> usize {
        self.tasks.len()
    }

    /// Returns true if the tree has no tasks
    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }

    /// Returns the earliest start over all tasks
    pub fn project_start(&self) -> Option<NaiveDate> {
        self.tasks.values().map(|t| t.start).min()
    }

    /// Returns the latest end over all tasks
    pub fn project_end(&self) -> Option<NaiveDate> {
        self.tasks.values().map(|t| t.end).max()
    }
}

impl TaskHierarchy for TaskTree {
    fn container(&self, task: TaskId) -> Option<TaskId> {
        self.parents.get(&task).copied()
    }

    fn nested_tasks(&self, task: TaskId) -> Vec<TaskId> {
        self.children.get(&task).cloned().unwrap_or_default()
    }

    fn contains_task(&self, task: TaskId) -> bool {
        self.tasks.contains_key(&task)
    }

    fn has_nested_tasks(&self, task: TaskId) -> bool {
        self.children.get(&task).is_some_and(|c| !c.is_empty())
    }
}

impl TaskSchedule for TaskTree {
    fn activity(&self, task: TaskId) -> Option<Activity> {
        self.tasks.get(&task).map(Task::activity)
    }
}
