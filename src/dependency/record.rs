//! Persisted form of dependency edges
//!
//! A record carries the dependant and dependee IDs, the constraint type
//! as a numeric code (`"1"`..`"4"`) or a mnemonic (`"SS"`, `"FS"`, ...),
//! the hardness literal (`"Strong"`/`"Rubber"`) and the lag. Reading or
//! writing files is left to the caller.

use serde::{Deserialize, Serialize};
use tracing::debug;

use super::collection::DependencyCollection;
use super::constraint::ConstraintType;
use super::edge::{Hardness, TaskDependency};
use super::error::ParseError;
use super::mutator::CommitReport;
use crate::domain::TaskId;

/// Serializable edge
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DependencyRecord {
    pub dependant: TaskId,
    pub dependee: TaskId,

    /// Numeric code or mnemonic
    #[serde(rename = "type")]
    pub constraint: String,

    pub hardness: String,

    #[serde(default)]
    pub difference: i64,
}

impl DependencyRecord {
    /// Record using the numeric constraint code
    pub fn from_dependency(dependency: &TaskDependency) -> Self {
        Self {
            dependant: dependency.dependant(),
            dependee: dependency.dependee(),
            constraint: dependency.constraint().persistent_value(),
            hardness: dependency.hardness().to_string(),
            difference: dependency.difference(),
        }
    }

    /// Record using the two-letter constraint mnemonic
    pub fn readable(dependency: &TaskDependency) -> Self {
        Self {
            constraint: dependency.constraint().mnemonic().to_string(),
            ..Self::from_dependency(dependency)
        }
    }

    /// Decodes the record into an edge
    pub fn to_dependency(&self) -> Result<TaskDependency, ParseError> {
        let constraint: ConstraintType = self.constraint.parse()?;
        let hardness: Hardness = self.hardness.parse()?;
        Ok(TaskDependency::new(self.dependant, self.dependee, constraint, hardness)
            .with_difference(self.difference))
    }
}

/// Snapshots every edge of the collection, ordered by key
pub fn to_records(collection: &DependencyCollection) -> Vec<DependencyRecord> {
    collection
        .dependencies()
        .iter()
        .map(DependencyRecord::from_dependency)
        .collect()
}

/// Loads records into the collection as one batch
///
/// Any undecodable record fails the whole load before the collection is
/// touched. Edges the collection refuses are reported, not fatal.
pub fn restore(collection: &mut DependencyCollection, records: &[DependencyRecord]) -> Result<CommitReport, ParseError> {
    let dependencies = records
        .iter()
        .map(DependencyRecord::to_dependency)
        .collect::<Result<Vec<_>, _>>()?;

    let mut mutator = collection.create_mutator();
    let mut rejected = Vec::new();
    for dependency in dependencies {
        if let Err(e) = mutator.add_dependency(dependency) {
            rejected.push((dependency, e));
        }
    }

    let mut report = mutator.commit();
    report.failed.extend(rejected);
    debug!(records = records.len(), failed = report.failed.len(), "dependencies restored");
    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dependency::error::DependencyError;
    use crate::dependency::event::EventDispatcher;
    use crate::domain::{DependencyKey, FlatHierarchy};
    use std::rc::Rc;

    fn id(n: u32) -> TaskId {
        TaskId::new(n)
    }

    fn flat() -> DependencyCollection {
        DependencyCollection::new(Rc::new(FlatHierarchy), EventDispatcher::new())
    }

    fn record(dependant: u32, dependee: u32, constraint: &str, hardness: &str) -> DependencyRecord {
        DependencyRecord {
            dependant: id(dependant),
            dependee: id(dependee),
            constraint: constraint.to_string(),
            hardness: hardness.to_string(),
            difference: 0,
        }
    }

    #[test]
    fn encodes_numeric_and_readable() {
        let dep = TaskDependency::new(id(2), id(1), ConstraintType::FinishFinish, Hardness::Rubber)
            .with_difference(2);

        let numeric = DependencyRecord::from_dependency(&dep);
        assert_eq!(numeric.constraint, "3");
        assert_eq!(numeric.hardness, "Rubber");
        assert_eq!(numeric.difference, 2);

        assert_eq!(DependencyRecord::readable(&dep).constraint, "FF");
    }

    #[test]
    fn json_shape() {
        let json = r#"{"dependant":2,"dependee":1,"type":"2","hardness":"Strong"}"#;
        let parsed: DependencyRecord = serde_json::from_str(json).unwrap();
        let dep = parsed.to_dependency().unwrap();
        assert_eq!(dep.constraint(), ConstraintType::FinishStart);
        assert_eq!(dep.hardness(), Hardness::Strong);
        assert_eq!(dep.difference(), 0);
    }

    #[test]
    fn invalid_values_are_rejected() {
        assert!(matches!(
            record(2, 1, "7", "Strong").to_dependency(),
            Err(ParseError::InvalidConstraintCode(_))
        ));
        assert!(matches!(
            record(2, 1, "FS", "Soft").to_dependency(),
            Err(ParseError::InvalidHardness(_))
        ));
    }

    #[test]
    fn restore_and_snapshot() {
        let mut deps = flat();
        let records = vec![record(2, 1, "FS", "Strong"), record(3, 2, "1", "Rubber")];
        let report = restore(&mut deps, &records).unwrap();

        assert!(report.is_clean());
        assert_eq!(deps.len(), 2);
        let snapshot = to_records(&deps);
        assert_eq!(snapshot[0].constraint, "2");
        assert_eq!(snapshot[1].hardness, "Rubber");
    }

    #[test]
    fn restore_bad_record_touches_nothing() {
        let mut deps = flat();
        let records = vec![record(2, 1, "FS", "Strong"), record(3, 2, "ZZ", "Strong")];
        assert!(restore(&mut deps, &records).is_err());
        assert!(deps.is_empty());
    }

    #[test]
    fn restore_reports_refused_edges() {
        let mut deps = flat();
        let records = vec![
            record(2, 1, "FS", "Strong"),
            record(1, 2, "FS", "Strong"),
            record(4, 4, "FS", "Strong"),
        ];
        let report = restore(&mut deps, &records).unwrap();

        assert_eq!(deps.len(), 1);
        let errors: Vec<_> = report.failed.iter().map(|(_, e)| e.clone()).collect();
        assert!(errors.contains(&DependencyError::Loop(DependencyKey::new(id(1), id(2)))));
        assert!(errors.contains(&DependencyError::SelfDependency(id(4))));
    }
}
