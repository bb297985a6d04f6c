//! Domain models for gantt-deps
//!
//! Tasks, their containment hierarchy and the working calendar. Contains no
//! dependency logic and no I/O.

mod calendar;
mod hierarchy;
mod id;
mod task;

pub use calendar::{Calendar, DayType, MoveDirection, WeekendCalendar};
pub use hierarchy::{FlatHierarchy, TaskHierarchy};
pub use id::{DependencyKey, IdError, TaskId};
pub use task::{Activity, Task, TaskSchedule, TaskTree, TreeError};
