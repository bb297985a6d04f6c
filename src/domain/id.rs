//! Task and dependency identifiers
//!
//! ID Format:
//! - Task IDs: non-negative integers (e.g., `7`)
//! - Dependency keys: `{dependee}->{dependant}` (e.g., `3->7`)
//!
//! A dependency is identified by its ordered pair of tasks only, so at most
//! one edge exists per (dependant, dependee) pair.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

#[derive(Debug, Error, PartialEq)]
pub enum IdError {
    #[error("Invalid task ID: expected a non-negative integer, got '{0}'")]
    InvalidTaskId(String),

    #[error("Invalid dependency key: expected '{{dependee}}->{{dependant}}', got '{0}'")]
    InvalidDependencyKey(String),
}

/// Unique integer identifier of a task
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TaskId(u32);

impl TaskId {
    pub const MIN: TaskId = TaskId(u32::MIN);
    pub const MAX: TaskId = TaskId(u32::MAX);

    pub fn new(value: u32) -> Self {
        Self(value)
    }

    /// Returns the numeric value of the ID
    pub fn value(&self) -> u32 {
        self.0
    }
}

impl From<u32> for TaskId {
    fn from(value: u32) -> Self {
        Self(value)
    }
}

impl fmt::Display for TaskId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for TaskId {
    type Err = IdError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        s.parse::<u32>()
            .map(Self)
            .map_err(|_| IdError::InvalidTaskId(s.to_string()))
    }
}

/// Identity of a dependency edge: the ordered (dependant, dependee) pair
///
/// Displayed in the direction of the constraint, `dependee->dependant`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct DependencyKey {
    /// The constrained task (successor)
    pub dependant: TaskId,
    /// The constraining task (predecessor)
    pub dependee: TaskId,
}

impl DependencyKey {
    pub fn new(dependant: TaskId, dependee: TaskId) -> Self {
        Self {
            dependant,
            dependee,
        }
    }

    /// Returns the key of the edge in the opposite direction
    pub fn reversed(&self) -> Self {
        Self {
            dependant: self.dependee,
            dependee: self.dependant,
        }
    }

    /// Returns true if the given task is one of the endpoints
    pub fn touches(&self, task: TaskId) -> bool {
        self.dependant == task || self.dependee == task
    }
}

impl fmt::Display for DependencyKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}->{}", self.dependee, self.dependant)
    }
}

impl FromStr for DependencyKey {
    type Err = IdError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        let (dependee, dependant) = s
            .split_once("->")
            .ok_or_else(|| IdError::InvalidDependencyKey(s.to_string()))?;

        let dependee = dependee
            .parse()
            .map_err(|_| IdError::InvalidDependencyKey(s.to_string()))?;
        let dependant = dependant
            .parse()
            .map_err(|_| IdError::InvalidDependencyKey(s.to_string()))?;

        Ok(Self {
            dependant,
            dependee,
        })
    }
}
