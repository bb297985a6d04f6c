//! Project
//!
//! Wires the task tree, working calendar, dependency collection and
//! scheduler together. Any dependency event marks the schedule stale;
//! [`Project::reschedule`] brings task dates back in line.
//!
//! Rescheduling is deferred, not run inside the event: listeners fire while
//! the collection is mutably borrowed, so the scheduler cannot read it
//! there. Callers run `reschedule` on the same thread once their edit is
//! done. `DependencyCollection::clear` fires no events; use
//! [`Project::clear_dependencies`] so the schedule is marked stale.

use std::cell::{Cell, Ref, RefCell};
use std::path::Path;
use std::rc::Rc;

use anyhow::Result;
use chrono::NaiveDate;
use thiserror::Error;
use tracing::{debug, info};

use crate::algorithm::{AdjustTaskBounds, CriticalPath, ScheduleError, ScheduleReport, Scheduler, SchedulingGraph};
use crate::config::{Config, ConfigError};
use crate::dependency::predecessors::{self, PredecessorError};
use crate::dependency::record::{self, DependencyRecord};
use crate::dependency::{
    CommitReport, DependencyCollection, DependencyError, DependencyListener, EventDispatcher, ParseError,
    TaskDependency,
};
use crate::domain::{Task, TaskHierarchy, TaskId, TaskTree, TreeError, WeekendCalendar};

#[derive(Debug, Error)]
pub enum ProjectError {
    #[error(transparent)]
    Tree(#[from] TreeError),

    #[error(transparent)]
    Dependency(#[from] DependencyError),

    #[error(transparent)]
    Predecessor(#[from] PredecessorError),

    #[error(transparent)]
    Schedule(#[from] ScheduleError),

    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Parse(#[from] ParseError),

    #[error("Moving task {task} would create a dependency loop")]
    MoveCreatesLoop { task: TaskId },
}

/// Marks the schedule stale on every dependency change
struct ScheduleInvalidator {
    dirty: Rc<Cell<bool>>,
}

impl DependencyListener for ScheduleInvalidator {
    fn dependency_added(&self, _dependency: &TaskDependency) {
        self.dirty.set(true);
    }

    fn dependency_removed(&self, _dependency: &TaskDependency) {
        self.dirty.set(true);
    }

    fn dependency_changed(&self, _dependency: &TaskDependency) {
        self.dirty.set(true);
    }
}

/// A scheduling project
pub struct Project {
    config: Config,
    tree: Rc<RefCell<TaskTree>>,
    calendar: WeekendCalendar,
    dependencies: DependencyCollection,
    scheduler: Scheduler,
    dirty: Rc<Cell<bool>>,
}

impl Project {
    /// Creates an empty project
    pub fn new(config: Config) -> std::result::Result<Self, ProjectError> {
        let calendar = config.calendar()?;
        let tree = Rc::new(RefCell::new(TaskTree::new()));
        let dirty = Rc::new(Cell::new(false));

        let mut dispatcher = EventDispatcher::new();
        dispatcher.add_listener(Rc::new(ScheduleInvalidator { dirty: dirty.clone() }));

        let dependencies = DependencyCollection::new(tree.clone(), dispatcher).with_defaults(
            config.dependencies.default_constraint,
            config.dependencies.default_hardness,
        );
        let scheduler = Scheduler::new(config.scheduler.enabled);

        Ok(Self {
            config,
            tree,
            calendar,
            dependencies,
            scheduler,
            dirty,
        })
    }

    /// Creates an empty project configured from a TOML file
    pub fn open(config_path: &Path) -> Result<Self> {
        let config = Config::load(config_path)?;
        info!(path = %config_path.display(), "opening project");
        Ok(Self::new(config)?)
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn calendar(&self) -> &WeekendCalendar {
        &self.calendar
    }

    /// Read access to the task tree
    pub fn tree(&self) -> Ref<'_, TaskTree> {
        self.tree.borrow()
    }

    pub fn dependencies(&self) -> &DependencyCollection {
        &self.dependencies
    }

    /// Edits made here fire events and mark the schedule stale
    pub fn dependencies_mut(&mut self) -> &mut DependencyCollection {
        &mut self.dependencies
    }

    pub fn add_listener(&mut self, listener: Rc<dyn DependencyListener>) {
        self.dependencies.add_listener(listener);
    }

    pub fn scheduler_mut(&mut self) -> &mut Scheduler {
        &mut self.scheduler
    }

    /// Returns true if task dates may be out of line with dependencies
    pub fn is_schedule_dirty(&self) -> bool {
        self.dirty.get()
    }

    // ========================================================================
    // Tasks
    // ========================================================================

    pub fn add_task(&mut self, task: Task) -> std::result::Result<(), ProjectError> {
        self.tree.borrow_mut().add_task(task)?;
        self.dirty.set(true);
        Ok(())
    }

    pub fn add_subtask(&mut self, parent: TaskId, task: Task) -> std::result::Result<(), ProjectError> {
        self.tree.borrow_mut().add_subtask(parent, task)?;
        self.dirty.set(true);
        Ok(())
    }

    pub fn set_task_dates(&mut self, task: TaskId, start: NaiveDate, end: NaiveDate) -> std::result::Result<(), ProjectError> {
        self.tree.borrow_mut().set_dates(task, start, end)?;
        self.dirty.set(true);
        Ok(())
    }

    /// Moves a task under a new container
    ///
    /// The move is undone if it would put a dependency between related
    /// tasks or close a loop through the hierarchy.
    pub fn move_task(&mut self, task: TaskId, new_parent: Option<TaskId>) -> std::result::Result<(), ProjectError> {
        let mut tree = self.tree.borrow_mut();
        let old_parent = tree.container(task);
        tree.move_task(task, new_parent)?;

        if SchedulingGraph::build(&tree, &self.dependencies).topological_order().is_err() {
            tree.move_task(task, old_parent)?;
            return Err(ProjectError::MoveCreatesLoop { task });
        }

        self.dirty.set(true);
        Ok(())
    }

    /// Removes every dependency and marks the schedule stale
    pub fn clear_dependencies(&mut self) {
        self.dependencies.clear();
        self.dirty.set(true);
    }

    /// Removes a task's dependencies; the task itself stays in the tree
    pub fn detach_task(&mut self, task: TaskId) -> Vec<TaskDependency> {
        self.dependencies.delete_dependencies_of(task)
    }

    // ========================================================================
    // Scheduling
    // ========================================================================

    /// Recomputes task dates if the schedule is stale and the scheduler enabled
    pub fn reschedule(&mut self) -> std::result::Result<ScheduleReport, ProjectError> {
        if !self.scheduler.is_enabled() || !self.dirty.get() {
            return Ok(ScheduleReport::default());
        }

        let report = self
            .scheduler
            .run(&mut self.tree.borrow_mut(), &self.dependencies, &self.calendar)?;
        self.dirty.set(false);
        debug!(modified = report.modified.len(), "project rescheduled");
        Ok(report)
    }

    /// Recomputes the containers of the given tasks
    pub fn adjust_bounds(&mut self, modified: &[TaskId]) -> std::result::Result<Vec<TaskId>, ProjectError> {
        let changed = AdjustTaskBounds.run(&mut self.tree.borrow_mut(), modified.iter().copied())?;
        if !changed.is_empty() {
            self.dirty.set(true);
        }
        Ok(changed)
    }

    /// Computes the critical path of the current schedule
    pub fn critical_path(&self) -> std::result::Result<CriticalPath, ProjectError> {
        Ok(CriticalPath::compute(&self.tree.borrow(), &self.dependencies, &self.calendar)?)
    }

    // ========================================================================
    // Predecessors and records
    // ========================================================================

    /// Formats the predecessors of a task, e.g. `1;2-FS=P1D`
    pub fn format_predecessors(&self, task: TaskId, separator: &str) -> String {
        predecessors::format_predecessors(&self.dependencies, task, separator)
    }

    /// Replaces the predecessors of a task with the ones in `text`
    ///
    /// The text is fully parsed before any edge is touched.
    pub fn set_predecessors(
        &mut self,
        task: TaskId,
        text: &str,
        separator: &str,
    ) -> std::result::Result<Vec<TaskDependency>, ProjectError> {
        let specs = predecessors::parse_predecessors(text, separator)?;
        for existing in self.dependencies.dependencies_as_dependant(task) {
            self.dependencies.delete_dependency(existing.key());
        }
        Ok(predecessors::apply_predecessors(&mut self.dependencies, task, &specs)?)
    }

    /// Snapshots every dependency in its persisted form
    pub fn dependency_records(&self) -> Vec<DependencyRecord> {
        record::to_records(&self.dependencies)
    }

    /// Loads persisted dependencies as one batch
    pub fn load_dependency_records(
        &mut self,
        records: &[DependencyRecord],
    ) -> std::result::Result<CommitReport, ProjectError> {
        Ok(record::restore(&mut self.dependencies, records)?)
    }
}
