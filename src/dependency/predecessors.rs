//! Compact predecessor notation
//!
//! Each predecessor of a task is written as one token:
//!
//! - `7` : finish-start, no lag, strong
//! - `7-FF` : given type, no lag, strong
//! - `7-SS=P2D` : strong with a lag of 2 days
//! - `7-FS>P1D` : rubber with a lag of 1 day
//!
//! Tokens are joined with a caller-chosen separator, e.g. `1;2-FS=P1D;3-FF>P0D`.

use thiserror::Error;

use super::collection::DependencyCollection;
use super::constraint::ConstraintType;
use super::edge::{Hardness, TaskDependency};
use super::error::{DependencyError, ParseError};
use crate::domain::TaskId;

#[derive(Debug, Error, PartialEq)]
pub enum PredecessorError {
    #[error("'{0}' is not a task ID")]
    InvalidTaskId(String),

    #[error("Invalid dependency spec '{0}': expected a two-letter dependency type after the dash")]
    MissingType(String),

    #[error("Invalid dependency spec '{spec}': {source}")]
    InvalidType { spec: String, source: ParseError },

    #[error("Invalid dependency spec '{0}': expected '>' or '=' after the dependency type")]
    InvalidHardnessMarker(String),

    #[error("Invalid dependency spec '{0}': lag must look like P<days>D, e.g. P1D")]
    InvalidLag(String),

    #[error("Can't find task with ID {0}")]
    UnknownTask(TaskId),

    #[error("Can't create dependency of task {dependant} on {dependee}: {source}")]
    Rejected {
        dependant: TaskId,
        dependee: TaskId,
        source: DependencyError,
    },
}

/// One parsed predecessor token
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PredecessorSpec {
    pub dependee: TaskId,
    pub constraint: ConstraintType,
    pub hardness: Hardness,
    pub difference: i64,
}

impl PredecessorSpec {
    /// Builds the edge this token describes for the given dependant
    pub fn to_dependency(&self, dependant: TaskId) -> TaskDependency {
        TaskDependency::new(dependant, self.dependee, self.constraint, self.hardness)
            .with_difference(self.difference)
    }
}

/// Formats a single edge as seen from its dependant
pub fn format_dependency(dependency: &TaskDependency) -> String {
    let mut token = dependency.dependee().to_string();
    let plain = dependency.difference() == 0 && dependency.hardness() == Hardness::Strong;

    if plain && dependency.constraint() == ConstraintType::FinishStart {
        return token;
    }
    token.push('-');
    token.push_str(dependency.constraint().mnemonic());
    if plain {
        return token;
    }

    token.push(match dependency.hardness() {
        Hardness::Rubber => '>',
        Hardness::Strong => '=',
    });
    token.push_str(&format!("P{}D", dependency.difference()));
    token
}

/// Formats all predecessors of a task, ordered by predecessor ID
pub fn format_predecessors(collection: &DependencyCollection, task: TaskId, separator: &str) -> String {
    collection
        .dependencies_as_dependant(task)
        .iter()
        .map(format_dependency)
        .collect::<Vec<_>>()
        .join(separator)
}

/// Parses one predecessor token
pub fn parse_dependency(spec: &str) -> Result<PredecessorSpec, PredecessorError> {
    let spec = spec.trim();
    let (id_part, rest) = match spec.split_once('-') {
        Some((id, rest)) => (id, Some(rest)),
        None => (spec, None),
    };

    let dependee: TaskId = id_part
        .parse()
        .map_err(|_| PredecessorError::InvalidTaskId(id_part.to_string()))?;

    let mut parsed = PredecessorSpec {
        dependee,
        constraint: ConstraintType::FinishStart,
        hardness: Hardness::Strong,
        difference: 0,
    };

    let Some(rest) = rest else {
        return Ok(parsed);
    };

    let type_part = rest
        .get(..2)
        .ok_or_else(|| PredecessorError::MissingType(spec.to_string()))?;
    parsed.constraint =
        ConstraintType::from_mnemonic(type_part).map_err(|source| PredecessorError::InvalidType {
            spec: spec.to_string(),
            source,
        })?;

    let tail = &rest[2..];
    let mut chars = tail.chars();
    parsed.hardness = match chars.next() {
        None => return Ok(parsed),
        Some('=') => Hardness::Strong,
        Some('>') => Hardness::Rubber,
        Some(_) => return Err(PredecessorError::InvalidHardnessMarker(spec.to_string())),
    };

    parsed.difference = chars
        .as_str()
        .strip_prefix('P')
        .and_then(|s| s.strip_suffix('D'))
        .and_then(|s| s.parse::<i64>().ok())
        .ok_or_else(|| PredecessorError::InvalidLag(spec.to_string()))?;

    Ok(parsed)
}

/// Parses a separated list of predecessor tokens; empty tokens are skipped
pub fn parse_predecessors(input: &str, separator: &str) -> Result<Vec<PredecessorSpec>, PredecessorError> {
    input
        .split(separator)
        .filter(|token| !token.trim().is_empty())
        .map(parse_dependency)
        .collect()
}

/// Creates the edges described by `specs` with `dependant` as successor
///
/// Stops at the first unknown task or refused edge. Edges created before
/// that point stay in place.
pub fn apply_predecessors(
    collection: &mut DependencyCollection,
    dependant: TaskId,
    specs: &[PredecessorSpec],
) -> Result<Vec<TaskDependency>, PredecessorError> {
    let mut created = Vec::with_capacity(specs.len());

    for spec in specs {
        if !collection.hierarchy().contains_task(spec.dependee) {
            return Err(PredecessorError::UnknownTask(spec.dependee));
        }

        let dependency = collection
            .add_dependency(spec.to_dependency(dependant))
            .map_err(|source| PredecessorError::Rejected {
                dependant,
                dependee: spec.dependee,
                source,
            })?;
        created.push(dependency);
    }

    Ok(created)
}
