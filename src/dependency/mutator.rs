//! Batched dependency edits
//!
//! A mutator queues ADD, DELETE and CLEAR operations stamped with sequence
//! numbers from the collection and replays them in stamp order on commit.
//! Commit is not atomic: a failing ADD is logged and skipped.

use tracing::{debug, warn};

use super::collection::DependencyCollection;
use super::constraint::ConstraintType;
use super::edge::{Hardness, TaskDependency};
use super::error::{DependencyError, Result};
use crate::domain::{DependencyKey, TaskId};

#[derive(Debug, Clone, Copy)]
enum Operation {
    Add(TaskDependency),
    Delete(DependencyKey),
    Clear,
}

#[derive(Debug, Clone, Copy)]
struct Pending {
    sequence: u64,
    operation: Operation,
}

/// Outcome of a commit
#[derive(Debug, Default, PartialEq)]
pub struct CommitReport {
    /// Operations that took effect
    pub applied: usize,
    /// Additions rejected at commit time
    pub failed: Vec<(TaskDependency, DependencyError)>,
}

impl CommitReport {
    pub fn is_clean(&self) -> bool {
        self.failed.is_empty()
    }
}

/// Batch-edit handle borrowed from a [`DependencyCollection`]
///
/// Nothing reaches the collection until [`DependencyMutator::commit`];
/// dropping the mutator discards the batch.
#[derive(Debug)]
pub struct DependencyMutator<'a> {
    collection: &'a mut DependencyCollection,
    queue: Vec<Pending>,
}

impl<'a> DependencyMutator<'a> {
    pub(crate) fn new(collection: &'a mut DependencyCollection) -> Self {
        Self {
            collection,
            queue: Vec::new(),
        }
    }

    /// Queues an edge with the collection's default constraint and hardness
    pub fn create_dependency(&mut self, dependant: TaskId, dependee: TaskId) -> Result<TaskDependency> {
        let constraint = self.collection.default_constraint();
        let hardness = self.collection.default_hardness();
        self.create_dependency_with(dependant, dependee, constraint, hardness)
    }

    /// Queues an edge with an explicit constraint and hardness
    ///
    /// Self and hierarchy checks run now; existence and loops are checked
    /// against the live collection on commit.
    pub fn create_dependency_with(
        &mut self,
        dependant: TaskId,
        dependee: TaskId,
        constraint: ConstraintType,
        hardness: Hardness,
    ) -> Result<TaskDependency> {
        self.add_dependency(TaskDependency::new(dependant, dependee, constraint, hardness))
    }

    /// Queues a prepared edge
    pub fn add_dependency(&mut self, dependency: TaskDependency) -> Result<TaskDependency> {
        let key = dependency.key();
        self.collection.validate_pair(key)?;
        if self.pending_add(key).is_some() {
            return Err(DependencyError::AlreadyExists(key));
        }

        let sequence = self.collection.next_sequence();
        self.queue.push(Pending {
            sequence,
            operation: Operation::Add(dependency),
        });
        Ok(dependency)
    }

    /// Queues a removal, or cancels a pending addition of the same edge
    pub fn delete_dependency(&mut self, key: DependencyKey) {
        if let Some(position) = self.pending_add(key) {
            self.queue.remove(position);
            return;
        }

        let sequence = self.collection.next_sequence();
        self.queue.push(Pending {
            sequence,
            operation: Operation::Delete(key),
        });
    }

    /// Discards the queued operations and stages a full clear
    pub fn clear(&mut self) {
        self.queue.clear();
        let sequence = self.collection.next_sequence();
        self.queue.push(Pending {
            sequence,
            operation: Operation::Clear,
        });
    }

    /// Number of queued operations
    pub fn len(&self) -> usize {
        self.queue.len()
    }

    pub fn is_empty(&self) -> bool {
        self.queue.is_empty()
    }

    fn pending_add(&self, key: DependencyKey) -> Option<usize> {
        self.queue
            .iter()
            .rposition(|p| matches!(p.operation, Operation::Add(d) if d.key() == key))
    }

    /// Replays the batch against the collection in sequence order
    pub fn commit(mut self) -> CommitReport {
        self.queue.sort_by_key(|p| p.sequence);
        let mut report = CommitReport::default();

        for pending in self.queue {
            match pending.operation {
                Operation::Add(dependency) => match self.collection.add_dependency(dependency) {
                    Ok(_) => report.applied += 1,
                    Err(e) => {
                        warn!(%dependency, error = %e, "skipping dependency in batch commit");
                        report.failed.push((dependency, e));
                    }
                },
                Operation::Delete(key) => {
                    self.collection.delete_dependency(key);
                    report.applied += 1;
                }
                Operation::Clear => {
                    self.collection.clear();
                    report.applied += 1;
                }
            }
        }

        debug!(applied = report.applied, failed = report.failed.len(), "mutator committed");
        report
    }
}
