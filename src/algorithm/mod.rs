//! Scheduling algorithms
//!
//! Consumers of the dependency graph that move task dates: the layered
//! scheduler, supertask bound adjustment and critical path analysis.

mod adjust_bounds;
mod critical_path;
mod graph;
mod scheduler;

use thiserror::Error;

use crate::domain::{TaskId, TreeError};

pub use adjust_bounds::AdjustTaskBounds;
pub use critical_path::{CriticalPath, LatestDates};
pub use graph::{EdgeKind, SchedulingGraph};
pub use scheduler::{ScheduleReport, Scheduler};

#[derive(Debug, Error, PartialEq)]
pub enum ScheduleError {
    #[error("Scheduling graph contains a cycle through task {0}")]
    Cycle(TaskId),

    #[error(transparent)]
    Tree(#[from] TreeError),
}
