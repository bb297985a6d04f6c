//! gantt-deps - Task dependency graph and scheduling core
//!
//! Tasks live in a [`TaskTree`]. A [`DependencyCollection`] holds the
//! constraints between them and rejects edges that would loop, directly or
//! through the task hierarchy. The [`Scheduler`] moves dependant tasks so
//! every constraint holds on the working [`Calendar`].

pub mod algorithm;
pub mod config;
pub mod dependency;
pub mod domain;
pub mod project;

pub use algorithm::{AdjustTaskBounds, CriticalPath, ScheduleError, ScheduleReport, Scheduler};
pub use config::Config;
pub use dependency::{
    ConstraintType, DependencyCollection, DependencyError, DependencyMutator, Hardness, TaskDependency,
};
pub use domain::{Calendar, DependencyKey, Task, TaskHierarchy, TaskId, TaskTree, WeekendCalendar};
pub use project::{Project, ProjectError};
