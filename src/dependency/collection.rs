//! Dependency collection
//!
//! Owns every edge of a project. Edges are stored by key and indexed twice
//! in a sorted map, once per endpoint role, so that "edges touching X",
//! "edges where X is the dependant" and "edges where X is the dependee" are
//! range queries.
//!
//! # Invariants
//! - The edge map and the index always hold the same edges.
//! - No edge is a self dependency or joins hierarchically related tasks.
//! - The effective graph (see [`LoopDetector`]) stays acyclic.

use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::ops::RangeInclusive;
use std::rc::Rc;
use tracing::debug;

use super::constraint::ConstraintType;
use super::edge::{Hardness, TaskDependency};
use super::error::{DependencyError, Result};
use super::event::{DependencyEvent, DependencyListener, EventDispatcher};
use super::loop_detector::LoopDetector;
use super::mutator::DependencyMutator;
use crate::domain::{DependencyKey, TaskHierarchy, TaskId};

/// Role a task plays in an edge
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
enum Role {
    Dependant,
    Dependee,
}

/// Index key: the task, its role in the edge, and the task at the other end
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
struct SearchKey {
    task: TaskId,
    role: Role,
    other: TaskId,
}

impl SearchKey {
    fn pair(key: DependencyKey) -> [SearchKey; 2] {
        [
            SearchKey {
                task: key.dependant,
                role: Role::Dependant,
                other: key.dependee,
            },
            SearchKey {
                task: key.dependee,
                role: Role::Dependee,
                other: key.dependant,
            },
        ]
    }

    fn role_range(task: TaskId, role: Role) -> RangeInclusive<SearchKey> {
        SearchKey {
            task,
            role,
            other: TaskId::MIN,
        }..=SearchKey {
            task,
            role,
            other: TaskId::MAX,
        }
    }

    fn task_range(task: TaskId) -> RangeInclusive<SearchKey> {
        SearchKey {
            task,
            role: Role::Dependant,
            other: TaskId::MIN,
        }..=SearchKey {
            task,
            role: Role::Dependee,
            other: TaskId::MAX,
        }
    }
}

/// The set of all dependencies of a project
pub struct DependencyCollection {
    dependencies: HashMap<DependencyKey, TaskDependency>,
    index: BTreeMap<SearchKey, DependencyKey>,
    hierarchy: Rc<dyn TaskHierarchy>,
    dispatcher: EventDispatcher,
    default_constraint: ConstraintType,
    default_hardness: Hardness,
    sequence: u64,
}

impl DependencyCollection {
    /// Creates an empty collection over the given hierarchy
    pub fn new(hierarchy: Rc<dyn TaskHierarchy>, dispatcher: EventDispatcher) -> Self {
        Self {
            dependencies: HashMap::new(),
            index: BTreeMap::new(),
            hierarchy,
            dispatcher,
            default_constraint: ConstraintType::FinishStart,
            default_hardness: Hardness::Strong,
            sequence: 0,
        }
    }

    /// Sets the constraint and hardness used by [`Self::create_dependency`]
    pub fn with_defaults(mut self, constraint: ConstraintType, hardness: Hardness) -> Self {
        self.default_constraint = constraint;
        self.default_hardness = hardness;
        self
    }

    pub fn default_constraint(&self) -> ConstraintType {
        self.default_constraint
    }

    pub fn default_hardness(&self) -> Hardness {
        self.default_hardness
    }

    /// The hierarchy edges are validated against
    pub fn hierarchy(&self) -> &dyn TaskHierarchy {
        self.hierarchy.as_ref()
    }

    /// Registers a listener for added/removed/changed events
    pub fn add_listener(&mut self, listener: Rc<dyn DependencyListener>) {
        self.dispatcher.add_listener(listener);
    }

    // ========================================================================
    // Queries
    // ========================================================================

    /// Returns all edges ordered by key
    pub fn dependencies(&self) -> Vec<TaskDependency> {
        let mut all: Vec<_> = self.dependencies.values().copied().collect();
        all.sort_by_key(|d| d.key());
        all
    }

    /// Returns every edge touching the task, in either role
    pub fn dependencies_of(&self, task: TaskId) -> Vec<TaskDependency> {
        self.lookup(SearchKey::task_range(task))
    }

    /// Returns edges where the task is the dependant, ordered by dependee
    pub fn dependencies_as_dependant(&self, task: TaskId) -> Vec<TaskDependency> {
        self.lookup(SearchKey::role_range(task, Role::Dependant))
    }

    /// Returns edges where the task is the dependee, ordered by dependant
    pub fn dependencies_as_dependee(&self, task: TaskId) -> Vec<TaskDependency> {
        self.lookup(SearchKey::role_range(task, Role::Dependee))
    }

    fn lookup(&self, range: RangeInclusive<SearchKey>) -> Vec<TaskDependency> {
        self.index
            .range(range)
            .filter_map(|(_, key)| self.dependencies.get(key).copied())
            .collect()
    }

    /// Tasks that depend directly on the given task
    pub(crate) fn dependant_tasks(&self, task: TaskId) -> impl Iterator<Item = TaskId> + '_ {
        self.index
            .range(SearchKey::role_range(task, Role::Dependee))
            .map(|(search, _)| search.other)
    }

    pub fn get(&self, key: DependencyKey) -> Option<TaskDependency> {
        self.dependencies.get(&key).copied()
    }

    pub fn contains(&self, key: DependencyKey) -> bool {
        self.dependencies.contains_key(&key)
    }

    pub fn len(&self) -> usize {
        self.dependencies.len()
    }

    pub fn is_empty(&self) -> bool {
        self.dependencies.is_empty()
    }

    // ========================================================================
    // Creation
    // ========================================================================

    /// Creates an edge with the collection's default constraint and hardness
    pub fn create_dependency(&mut self, dependant: TaskId, dependee: TaskId) -> Result<TaskDependency> {
        self.create_dependency_with(dependant, dependee, self.default_constraint, self.default_hardness)
    }

    /// Creates an edge with an explicit constraint and hardness
    pub fn create_dependency_with(
        &mut self,
        dependant: TaskId,
        dependee: TaskId,
        constraint: ConstraintType,
        hardness: Hardness,
    ) -> Result<TaskDependency> {
        self.add_dependency(TaskDependency::new(dependant, dependee, constraint, hardness))
    }

    /// Validates and inserts a prepared edge, firing `dependency_added`
    pub fn add_dependency(&mut self, dependency: TaskDependency) -> Result<TaskDependency> {
        self.validate(dependency.key())?;

        let key = dependency.key();
        self.dependencies.insert(key, dependency);
        for search in SearchKey::pair(key) {
            self.index.insert(search, key);
        }

        debug!(%dependency, "dependency added");
        self.dispatcher.fire(&DependencyEvent::Added(dependency));
        Ok(dependency)
    }

    /// Returns true if an edge between the tasks could be created right now
    pub fn can_create_dependency(&self, dependant: TaskId, dependee: TaskId) -> bool {
        self.validate(DependencyKey::new(dependant, dependee)).is_ok()
    }

    /// Runs the admission checks in order, reporting the first violation
    ///
    /// Order: already exists, unknown task, self dependency, hierarchy
    /// violation, loop. A related pair always closes a loop through the
    /// containment edges and is reported as a hierarchy violation.
    pub fn validate(&self, key: DependencyKey) -> Result<()> {
        if self.contains(key) {
            return Err(DependencyError::AlreadyExists(key));
        }
        for task in [key.dependant, key.dependee] {
            if !self.hierarchy.contains_task(task) {
                return Err(DependencyError::UnknownTask(task));
            }
        }
        self.validate_pair(key)?;
        if self.is_looping(key) {
            return Err(DependencyError::Loop(key));
        }
        Ok(())
    }

    /// Self-dependency and hierarchy checks, which need no graph walk
    pub(crate) fn validate_pair(&self, key: DependencyKey) -> Result<()> {
        if key.dependant == key.dependee {
            return Err(DependencyError::SelfDependency(key.dependant));
        }
        if !self.hierarchy.are_unrelated(key.dependant, key.dependee) {
            return Err(DependencyError::HierarchyViolation(key));
        }
        Ok(())
    }

    /// Returns true if adding the edge would create a cycle
    pub fn is_looping(&self, key: DependencyKey) -> bool {
        LoopDetector::new(self).is_looping(key)
    }

    // ========================================================================
    // Mutation
    // ========================================================================

    /// Removes an edge, firing `dependency_removed`
    ///
    /// Removing an edge that is not present does nothing.
    pub fn delete_dependency(&mut self, key: DependencyKey) -> Option<TaskDependency> {
        let removed = self.dependencies.remove(&key)?;
        for search in SearchKey::pair(key) {
            self.index.remove(&search);
        }

        debug!(dependency = %removed, "dependency removed");
        self.dispatcher.fire(&DependencyEvent::Removed(removed));
        Some(removed)
    }

    /// Removes every edge touching the task
    pub fn delete_dependencies_of(&mut self, task: TaskId) -> Vec<TaskDependency> {
        self.dependencies_of(task)
            .into_iter()
            .filter_map(|dep| self.delete_dependency(dep.key()))
            .collect()
    }

    /// Removes all edges without firing per-edge events
    pub fn clear(&mut self) {
        debug!(count = self.dependencies.len(), "dependencies cleared");
        self.dependencies.clear();
        self.index.clear();
    }

    /// Replaces the constraint of an edge, firing `dependency_changed`
    pub fn set_constraint(&mut self, key: DependencyKey, constraint: ConstraintType) -> Result<TaskDependency> {
        let updated = self.update(key, |dep| dep.set_constraint(constraint))?;
        self.dispatcher.fire(&DependencyEvent::Changed(updated));
        Ok(updated)
    }

    /// Replaces the lag of an edge, firing `dependency_changed`
    pub fn set_difference(&mut self, key: DependencyKey, difference: i64) -> Result<TaskDependency> {
        let updated = self.update(key, |dep| dep.set_difference(difference))?;
        self.dispatcher.fire(&DependencyEvent::Changed(updated));
        Ok(updated)
    }

    /// Replaces the hardness of an edge; fires no event
    pub fn set_hardness(&mut self, key: DependencyKey, hardness: Hardness) -> Result<TaskDependency> {
        self.update(key, |dep| dep.set_hardness(hardness))
    }

    fn update(&mut self, key: DependencyKey, apply: impl FnOnce(&mut TaskDependency)) -> Result<TaskDependency> {
        let dep = self
            .dependencies
            .get_mut(&key)
            .ok_or(DependencyError::NotFound(key))?;
        apply(dep);
        Ok(*dep)
    }

    /// Starts a batch of edits applied on commit
    pub fn create_mutator(&mut self) -> DependencyMutator<'_> {
        DependencyMutator::new(self)
    }

    /// Returns the next batch sequence stamp
    pub(crate) fn next_sequence(&mut self) -> u64 {
        self.sequence += 1;
        self.sequence
    }
}

impl fmt::Debug for DependencyCollection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DependencyCollection")
            .field("dependencies", &self.dependencies())
            .field("default_constraint", &self.default_constraint)
            .field("default_hardness", &self.default_hardness)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dependency::event::EventLog;
    use crate::domain::{FlatHierarchy, Task, TaskTree};
    use chrono::NaiveDate;
    use std::cell::RefCell;

    fn id(n: u32) -> TaskId {
        TaskId::new(n)
    }

    fn key(dependant: u32, dependee: u32) -> DependencyKey {
        DependencyKey::new(id(dependant), id(dependee))
    }

    fn flat() -> (DependencyCollection, Rc<EventLog>) {
        let log = Rc::new(EventLog::new());
        let mut dispatcher = EventDispatcher::new();
        dispatcher.add_listener(log.clone());
        (DependencyCollection::new(Rc::new(FlatHierarchy), dispatcher), log)
    }

    // 1
    // ├── 2
    // │   └── 3
    // └── 4
    // 5
    // 6
    fn nested() -> (DependencyCollection, Rc<RefCell<TaskTree>>) {
        let day = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap();
        let task = |n: u32| Task::new(id(n), format!("Task {}", n), day, day);

        let mut tree = TaskTree::new();
        tree.add_task(task(1)).unwrap();
        tree.add_subtask(id(1), task(2)).unwrap();
        tree.add_subtask(id(2), task(3)).unwrap();
        tree.add_subtask(id(1), task(4)).unwrap();
        tree.add_task(task(5)).unwrap();
        tree.add_task(task(6)).unwrap();

        let tree = Rc::new(RefCell::new(tree));
        let collection = DependencyCollection::new(tree.clone(), EventDispatcher::new());
        (collection, tree)
    }

    #[test]
    fn create_uses_defaults() {
        let (mut deps, log) = flat();
        let dep = deps.create_dependency(id(2), id(1)).unwrap();

        assert_eq!(dep.constraint(), ConstraintType::FinishStart);
        assert_eq!(dep.hardness(), Hardness::Strong);
        assert_eq!(dep.difference(), 0);
        assert_eq!(log.events(), vec![DependencyEvent::Added(dep)]);
    }

    #[test]
    fn configured_defaults_apply() {
        let (deps, _) = flat();
        let mut deps = deps.with_defaults(ConstraintType::StartStart, Hardness::Rubber);
        let dep = deps.create_dependency(id(2), id(1)).unwrap();
        assert_eq!(dep.constraint(), ConstraintType::StartStart);
        assert_eq!(dep.hardness(), Hardness::Rubber);
    }

    #[test]
    fn duplicate_rejected_reverse_is_separate() {
        let (mut deps, _) = flat();
        deps.create_dependency(id(2), id(1)).unwrap();

        assert_eq!(
            deps.create_dependency_with(id(2), id(1), ConstraintType::StartStart, Hardness::Rubber),
            Err(DependencyError::AlreadyExists(key(2, 1)))
        );
        // the reverse edge is validated on its own and closes a loop
        assert_eq!(deps.create_dependency(id(1), id(2)), Err(DependencyError::Loop(key(1, 2))));
    }

    #[test]
    fn self_dependency_rejected() {
        let (mut deps, log) = flat();
        assert_eq!(
            deps.create_dependency(id(1), id(1)),
            Err(DependencyError::SelfDependency(id(1)))
        );
        assert!(!deps.can_create_dependency(id(1), id(1)));
        assert!(log.is_empty());
    }

    #[test]
    fn hierarchy_violation_rejected() {
        let (mut deps, _) = nested();
        assert_eq!(
            deps.create_dependency(id(3), id(1)),
            Err(DependencyError::HierarchyViolation(key(3, 1)))
        );
        assert_eq!(
            deps.create_dependency(id(1), id(3)),
            Err(DependencyError::HierarchyViolation(key(1, 3)))
        );
        assert!(deps.can_create_dependency(id(3), id(4)));
    }

    #[test]
    fn related_pair_reports_hierarchy_before_loop() {
        let (mut deps, _) = nested();
        // Every related pair also closes a loop through containment
        deps.create_dependency(id(5), id(3)).unwrap();
        assert!(deps.is_looping(key(3, 1)));
        assert!(deps.is_looping(key(1, 3)));

        assert_eq!(
            deps.create_dependency(id(3), id(1)),
            Err(DependencyError::HierarchyViolation(key(3, 1)))
        );
        assert_eq!(
            deps.validate(key(1, 3)),
            Err(DependencyError::HierarchyViolation(key(1, 3)))
        );
        assert_eq!(deps.len(), 1);
    }

    #[test]
    fn unknown_task_rejected() {
        let (mut deps, _) = nested();
        assert_eq!(
            deps.create_dependency(id(99), id(1)),
            Err(DependencyError::UnknownTask(id(99)))
        );
    }

    #[test]
    fn index_queries() {
        let (mut deps, _) = flat();
        deps.create_dependency(id(2), id(1)).unwrap();
        deps.create_dependency(id(3), id(2)).unwrap();
        deps.create_dependency(id(4), id(2)).unwrap();

        let keys = |v: Vec<TaskDependency>| v.into_iter().map(|d| d.key()).collect::<Vec<_>>();

        assert_eq!(keys(deps.dependencies_as_dependant(id(2))), vec![key(2, 1)]);
        assert_eq!(keys(deps.dependencies_as_dependee(id(2))), vec![key(3, 2), key(4, 2)]);
        assert_eq!(
            keys(deps.dependencies_of(id(2))),
            vec![key(2, 1), key(3, 2), key(4, 2)]
        );
        assert_eq!(deps.dependant_tasks(id(2)).collect::<Vec<_>>(), vec![id(3), id(4)]);
        assert!(deps.dependencies_of(id(9)).is_empty());
    }

    #[test]
    fn delete_removes_both_index_entries() {
        let (mut deps, log) = flat();
        let dep = deps.create_dependency(id(2), id(1)).unwrap();

        assert_eq!(deps.delete_dependency(dep.key()), Some(dep));
        assert!(deps.dependencies_as_dependant(id(2)).is_empty());
        assert!(deps.dependencies_as_dependee(id(1)).is_empty());
        assert!(deps.is_empty());
        assert_eq!(log.events().last(), Some(&DependencyEvent::Removed(dep)));

        // idempotent
        assert_eq!(deps.delete_dependency(dep.key()), None);
        assert_eq!(log.len(), 2);
    }

    #[test]
    fn delete_dependencies_of_task() {
        let (mut deps, _) = flat();
        deps.create_dependency(id(2), id(1)).unwrap();
        deps.create_dependency(id(3), id(2)).unwrap();
        deps.create_dependency(id(4), id(3)).unwrap();

        assert_eq!(deps.delete_dependencies_of(id(2)).len(), 2);
        assert_eq!(deps.len(), 1);
        assert!(deps.contains(key(4, 3)));
    }

    #[test]
    fn clear_fires_no_events() {
        let (mut deps, log) = flat();
        deps.create_dependency(id(2), id(1)).unwrap();
        deps.create_dependency(id(3), id(2)).unwrap();
        log.clear();

        deps.clear();
        assert!(deps.is_empty());
        assert!(deps.dependencies_of(id(2)).is_empty());
        assert!(log.is_empty());
    }

    #[test]
    fn setters_and_events() {
        let (mut deps, log) = flat();
        deps.create_dependency(id(2), id(1)).unwrap();
        log.clear();

        let changed = deps.set_constraint(key(2, 1), ConstraintType::FinishFinish).unwrap();
        assert_eq!(changed.constraint(), ConstraintType::FinishFinish);
        let changed = deps.set_difference(key(2, 1), 3).unwrap();
        assert_eq!(changed.difference(), 3);
        assert_eq!(log.len(), 2);

        let changed = deps.set_hardness(key(2, 1), Hardness::Rubber).unwrap();
        assert_eq!(changed.hardness(), Hardness::Rubber);
        assert_eq!(log.len(), 2, "hardness changes are silent");

        assert_eq!(deps.get(key(2, 1)).map(|d| d.difference()), Some(3));
        assert_eq!(
            deps.set_difference(key(1, 2), 1),
            Err(DependencyError::NotFound(key(1, 2)))
        );
    }

    #[test]
    fn loop_through_chain() {
        let (mut deps, _) = flat();
        deps.create_dependency(id(2), id(1)).unwrap();
        deps.create_dependency(id(3), id(2)).unwrap();

        assert!(deps.is_looping(key(1, 3)));
        assert!(!deps.can_create_dependency(id(1), id(3)));
        assert!(!deps.is_looping(key(4, 3)));
    }

    #[test]
    fn loop_through_supertask() {
        let (mut deps, _) = nested();
        // 5 waits for the whole of 1
        deps.create_dependency(id(5), id(1)).unwrap();
        // 3 is inside 1 and inherits the wait, so 3 cannot wait for 5
        assert_eq!(deps.create_dependency(id(3), id(5)), Err(DependencyError::Loop(key(3, 5))));
    }

    #[test]
    fn loop_through_subtask() {
        let (mut deps, _) = nested();
        // 5 waits for subtask 3, and therefore for its container 1
        deps.create_dependency(id(5), id(3)).unwrap();
        assert_eq!(deps.create_dependency(id(1), id(5)), Err(DependencyError::Loop(key(1, 5))));
        // 4 shares the container but 5 does not wait for it
        assert!(!deps.is_looping(key(4, 5)));
        assert!(deps.can_create_dependency(id(6), id(5)));
    }

    #[test]
    fn siblings_inside_a_supertask_are_not_loops() {
        let (mut deps, _) = nested();
        deps.create_dependency(id(4), id(3)).unwrap();
        deps.create_dependency(id(6), id(1)).unwrap();
        deps.create_dependency(id(6), id(5)).unwrap();
        assert!(deps.can_create_dependency(id(2), id(5)));
        assert!(!deps.can_create_dependency(id(2), id(6)));
    }
}
