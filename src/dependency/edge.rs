//! Task dependency edge
//!
//! An edge is a small `Copy` value. Its identity is the
//! (dependant, dependee) pair; constraint, hardness and lag are attributes
//! that can change without changing which edge it is.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::hash::{Hash, Hasher};
use std::str::FromStr;

use super::constraint::{Collision, ConstraintType};
use super::error::ParseError;
use crate::domain::{Activity, Calendar, DependencyKey, TaskId, TaskSchedule};

/// How strictly the scheduler enforces a dependency
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum Hardness {
    /// Lower bound only: the dependant may start later than required
    Rubber,
    /// Exact: the dependant starts at the constraint boundary
    #[default]
    Strong,
}

impl Hardness {
    /// Returns the persisted literal
    pub fn as_str(&self) -> &'static str {
        match self {
            Hardness::Rubber => "Rubber",
            Hardness::Strong => "Strong",
        }
    }
}

impl fmt::Display for Hardness {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for Hardness {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "Rubber" => Ok(Hardness::Rubber),
            "Strong" => Ok(Hardness::Strong),
            other => Err(ParseError::InvalidHardness(other.to_string())),
        }
    }
}

/// Resolved activities of both endpoints
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ActivityBinding {
    pub dependee: Activity,
    pub dependant: Activity,
    /// Date on the dependee the constraint is measured from
    pub dependee_date: NaiveDate,
    /// Date on the dependant the constraint applies to
    pub dependant_date: NaiveDate,
}

/// A directed dependency between two tasks
#[derive(Debug, Clone, Copy)]
pub struct TaskDependency {
    key: DependencyKey,
    constraint: ConstraintType,
    hardness: Hardness,
    difference: i64,
}

impl TaskDependency {
    /// Creates an edge with no lag
    pub fn new(dependant: TaskId, dependee: TaskId, constraint: ConstraintType, hardness: Hardness) -> Self {
        Self {
            key: DependencyKey::new(dependant, dependee),
            constraint,
            hardness,
            difference: 0,
        }
    }

    /// Sets the lag in working days
    pub fn with_difference(mut self, difference: i64) -> Self {
        self.difference = difference;
        self
    }

    pub fn key(&self) -> DependencyKey {
        self.key
    }

    /// The constrained task
    pub fn dependant(&self) -> TaskId {
        self.key.dependant
    }

    /// The constraining task
    pub fn dependee(&self) -> TaskId {
        self.key.dependee
    }

    pub fn constraint(&self) -> ConstraintType {
        self.constraint
    }

    pub fn hardness(&self) -> Hardness {
        self.hardness
    }

    /// Lag in working days
    pub fn difference(&self) -> i64 {
        self.difference
    }

    pub(crate) fn set_constraint(&mut self, constraint: ConstraintType) {
        self.constraint = constraint;
    }

    pub(crate) fn set_hardness(&mut self, hardness: Hardness) {
        self.hardness = hardness;
    }

    pub(crate) fn set_difference(&mut self, difference: i64) {
        self.difference = difference;
    }

    /// Resolves both endpoint activities, or `None` if either task is unknown
    pub fn activity_binding(&self, schedule: &dyn TaskSchedule) -> Option<ActivityBinding> {
        let dependee = schedule.activity(self.dependee())?;
        let dependant = schedule.activity(self.dependant())?;
        Some(ActivityBinding {
            dependee,
            dependant,
            dependee_date: self.constraint.dependee_date(&dependee),
            dependant_date: self.constraint.dependant_date(&dependant),
        })
    }

    /// Tests the dependant's current placement against this edge
    pub fn collision(&self, schedule: &dyn TaskSchedule, calendar: &dyn Calendar) -> Option<Collision> {
        let binding = self.activity_binding(schedule)?;
        Some(
            self.constraint
                .collision(&binding.dependee, &binding.dependant, self.difference, calendar),
        )
    }

    /// Tests a hypothetical dependant start against this edge
    pub fn backward_collision(
        &self,
        candidate_start: NaiveDate,
        schedule: &dyn TaskSchedule,
        calendar: &dyn Calendar,
    ) -> Option<Collision> {
        let binding = self.activity_binding(schedule)?;
        Some(self.constraint.backward_collision(
            &binding.dependee,
            &binding.dependant,
            self.difference,
            candidate_start,
            calendar,
        ))
    }
}

impl PartialEq for TaskDependency {
    fn eq(&self, other: &Self) -> bool {
        self.key == other.key
    }
}

impl Eq for TaskDependency {}

impl Hash for TaskDependency {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.key.hash(state);
    }
}

impl fmt::Display for TaskDependency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} {} lag={} {}",
            self.key, self.constraint, self.difference, self.hardness
        )
    }
}
