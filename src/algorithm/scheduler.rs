//! Layered scheduler
//!
//! Walks the scheduling graph layer by layer and places each task inside
//! the intersection of the date ranges its incoming edges allow:
//!
//! - strong edges (STRONG, or RUBBER in collision) pin the start
//! - weak edges (RUBBER not in collision, inherited) only push it later
//! - subtasks bound a supertask to the span they cover
//! - an earliest-start date bounds the start from below
//!
//! Leaf tasks keep their working length when moved; supertasks get both
//! dates set from the span of their subtasks.

use chrono::NaiveDate;
use tracing::{debug, warn};

use super::graph::{EdgeKind, SchedulingGraph};
use super::ScheduleError;
use crate::dependency::{DependencyCollection, Hardness, TaskDependency, Variation};
use crate::domain::{Calendar, MoveDirection, TaskHierarchy, TaskId, TaskTree};

/// Closed date interval, unbounded on a side when `None`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct DateRange {
    lower: Option<NaiveDate>,
    upper: Option<NaiveDate>,
}

impl DateRange {
    const ALL: DateRange = DateRange {
        lower: None,
        upper: None,
    };

    fn at_least(date: NaiveDate) -> Self {
        Self {
            lower: Some(date),
            upper: None,
        }
    }

    fn at_most(date: NaiveDate) -> Self {
        Self {
            lower: None,
            upper: Some(date),
        }
    }

    fn closed(lower: NaiveDate, upper: NaiveDate) -> Self {
        Self {
            lower: Some(lower),
            upper: Some(upper),
        }
    }

    fn is_all(&self) -> bool {
        *self == Self::ALL
    }

    /// Returns `None` if the ranges do not overlap
    fn intersect(self, other: DateRange) -> Option<DateRange> {
        let lower = self.lower.max(other.lower);
        let upper = match (self.upper, other.upper) {
            (Some(a), Some(b)) => Some(a.min(b)),
            (a, b) => a.or(b),
        };
        match (lower, upper) {
            (Some(l), Some(u)) if l > u => None,
            _ => Some(DateRange { lower, upper }),
        }
    }
}

/// Outcome of a scheduler pass
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct ScheduleReport {
    /// Tasks whose dates changed, in scheduling order
    pub modified: Vec<TaskId>,
    /// Tasks left alone because their constraints contradict each other
    pub skipped: Vec<TaskId>,
}

enum Outcome {
    Unchanged,
    Modified,
    Skipped,
}

/// Recomputes task dates from dependencies
#[derive(Debug, Clone)]
pub struct Scheduler {
    enabled: bool,
}

impl Default for Scheduler {
    fn default() -> Self {
        Self { enabled: true }
    }
}

impl Scheduler {
    pub fn new(enabled: bool) -> Self {
        Self { enabled }
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    pub fn set_enabled(&mut self, enabled: bool) {
        self.enabled = enabled;
    }

    /// Runs one pass over every task; a disabled scheduler changes nothing
    pub fn run(
        &self,
        tree: &mut TaskTree,
        collection: &DependencyCollection,
        calendar: &dyn Calendar,
    ) -> Result<ScheduleReport, ScheduleError> {
        let mut report = ScheduleReport::default();
        if !self.enabled {
            return Ok(report);
        }

        let graph = SchedulingGraph::build(tree, collection);
        let layers = graph.layers()?;
        debug!(tasks = graph.len(), layers = layers.len(), "scheduling");

        for task in layers.into_iter().flatten() {
            match schedule_task(task, &graph, tree, calendar)? {
                Outcome::Modified => report.modified.push(task),
                Outcome::Skipped => report.skipped.push(task),
                Outcome::Unchanged => {}
            }
        }

        debug!(modified = report.modified.len(), skipped = report.skipped.len(), "schedule done");
        Ok(report)
    }
}

/// Start range an edge allows for its dependant, and whether it is weak
fn edge_range(
    dependency: &TaskDependency,
    tree: &TaskTree,
    calendar: &dyn Calendar,
) -> Option<(DateRange, bool)> {
    let collision = dependency.collision(tree, calendar)?;
    let weak = !collision.is_active() && dependency.hardness() == Hardness::Rubber;

    let mut acceptable = collision.acceptable_start;
    let range = match collision.variation {
        Variation::StartLater => {
            acceptable = calendar.find_closest_working_day(acceptable, MoveDirection::Forward);
            DateRange::at_least(acceptable)
        }
        Variation::StartEarlier => {
            acceptable = calendar.find_closest_working_day(acceptable, MoveDirection::Backward);
            DateRange::at_most(acceptable)
        }
        Variation::NoVariation => DateRange::closed(acceptable, acceptable),
    };

    Some((range, weak))
}

fn schedule_task(
    task: TaskId,
    graph: &SchedulingGraph,
    tree: &mut TaskTree,
    calendar: &dyn Calendar,
) -> Result<Outcome, ScheduleError> {
    let Some(current) = tree.get(task).cloned() else {
        return Ok(Outcome::Unchanged);
    };

    let mut strong = Some(DateRange::ALL);
    let mut weak = Some(DateRange::ALL);
    let mut subtask_dates = Vec::new();

    for (source, kind) in graph.incoming(task) {
        match kind {
            EdgeKind::SubSuper => {
                if let Some(child) = tree.get(source) {
                    subtask_dates.push(child.start);
                    subtask_dates.push(child.end);
                }
            }
            EdgeKind::Explicit(dependency) => {
                if let Some((range, is_weak)) = edge_range(&dependency, tree, calendar) {
                    let target = if is_weak { &mut weak } else { &mut strong };
                    *target = target.and_then(|r| r.intersect(range));
                }
            }
            EdgeKind::Inherited(dependency) => {
                let applied = TaskDependency::new(task, dependency.dependee(), dependency.constraint(), dependency.hardness())
                    .with_difference(dependency.difference());
                if let Some((range, _)) = edge_range(&applied, tree, calendar) {
                    weak = weak.and_then(|r| r.intersect(range));
                }
            }
        }
    }

    let (Some(strong), Some(weak)) = (strong, weak) else {
        warn!(%task, "dependencies leave no valid start, skipping task");
        return Ok(Outcome::Skipped);
    };

    let span = match (subtask_dates.iter().min(), subtask_dates.iter().max()) {
        (Some(&lower), Some(&upper)) => DateRange::closed(lower, upper),
        _ => DateRange::closed(current.start, current.end),
    };
    let has_subtasks = !subtask_dates.is_empty();
    let subtree_start = span.lower.map_or(current.start, |s| s.min(current.start));

    let mut start = if !strong.is_all() {
        strong.intersect(weak)
    } else if !weak.is_all() {
        weak.intersect(DateRange::at_least(subtree_start))
    } else {
        Some(DateRange::ALL)
    };
    if let Some(earliest) = current.earliest_start {
        start = start.and_then(|r| r.intersect(DateRange::at_least(earliest)));
    }
    let mut end = Some(DateRange::ALL);
    if has_subtasks {
        start = start.and_then(|r| r.intersect(span));
        end = Some(span);
    }

    let (Some(start), Some(end)) = (start, end) else {
        warn!(%task, "start range is empty, skipping task");
        return Ok(Outcome::Skipped);
    };
    debug!(%task, ?start, ?end, "computed ranges");

    if tree.has_nested_tasks(task) {
        let new_start = start.lower.unwrap_or(current.start);
        let new_end = end.upper.unwrap_or(current.end).max(new_start);
        if (new_start, new_end) == (current.start, current.end) {
            return Ok(Outcome::Unchanged);
        }
        tree.set_dates(task, new_start, new_end)?;
    } else {
        match start.lower {
            Some(new_start) if new_start != current.start => {
                tree.shift_task(task, new_start, calendar)?;
            }
            _ => return Ok(Outcome::Unchanged),
        }
    }

    debug!(%task, "task moved");
    Ok(Outcome::Modified)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dependency::{ConstraintType, EventDispatcher};
    use crate::domain::{DependencyKey, Task, WeekendCalendar};
    use std::cell::RefCell;
    use std::rc::Rc;

    fn day(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 1, d).unwrap()
    }

    fn id(n: u32) -> TaskId {
        TaskId::new(n)
    }

    fn make_task(n: u32, start: u32, end: u32) -> Task {
        Task::new(id(n), format!("Task {}", n), day(start), day(end))
    }

    struct Fixture {
        tree: Rc<RefCell<TaskTree>>,
        deps: DependencyCollection,
    }

    impl Fixture {
        fn new(tasks: Vec<Task>) -> Self {
            let mut tree = TaskTree::new();
            for task in tasks {
                tree.add_task(task).unwrap();
            }
            let tree = Rc::new(RefCell::new(tree));
            let deps = DependencyCollection::new(tree.clone(), EventDispatcher::new());
            Self { tree, deps }
        }

        fn link(&mut self, dependant: u32, dependee: u32, constraint: ConstraintType, hardness: Hardness) {
            self.deps
                .create_dependency_with(id(dependant), id(dependee), constraint, hardness)
                .unwrap();
        }

        fn run(&self, calendar: &dyn Calendar) -> ScheduleReport {
            Scheduler::default()
                .run(&mut self.tree.borrow_mut(), &self.deps, calendar)
                .unwrap()
        }

        fn dates(&self, n: u32) -> (NaiveDate, NaiveDate) {
            let tree = self.tree.borrow();
            let task = tree.get(id(n)).unwrap();
            (task.start, task.end)
        }
    }

    #[test]
    fn date_range_intersection() {
        let a = DateRange::at_least(day(5));
        let b = DateRange::at_most(day(7));
        assert_eq!(a.intersect(b), Some(DateRange::closed(day(5), day(7))));
        assert_eq!(DateRange::at_least(day(8)).intersect(b), None);
        assert!(DateRange::ALL.intersect(DateRange::ALL).unwrap().is_all());
    }

    #[test]
    fn finish_start_chain_moves_forward() {
        let cal = WeekendCalendar::all_working();
        let mut f = Fixture::new(vec![make_task(1, 1, 3), make_task(2, 2, 4), make_task(3, 1, 2)]);
        f.link(2, 1, ConstraintType::FinishStart, Hardness::Strong);
        f.link(3, 2, ConstraintType::FinishStart, Hardness::Strong);

        let report = f.run(&cal);
        assert_eq!(f.dates(2), (day(3), day(5)));
        assert_eq!(f.dates(3), (day(5), day(6)));
        assert_eq!(report.modified, vec![id(2), id(3)]);
    }

    #[test]
    fn strong_dependency_pulls_dependant_back() {
        let cal = WeekendCalendar::all_working();
        let mut f = Fixture::new(vec![make_task(1, 1, 3), make_task(2, 10, 12)]);
        f.link(2, 1, ConstraintType::FinishStart, Hardness::Strong);

        f.run(&cal);
        assert_eq!(f.dates(2), (day(3), day(5)));
    }

    #[test]
    fn rubber_dependency_keeps_slack() {
        let cal = WeekendCalendar::all_working();
        let mut f = Fixture::new(vec![make_task(1, 1, 3), make_task(2, 10, 12), make_task(3, 1, 2)]);
        f.link(2, 1, ConstraintType::FinishStart, Hardness::Rubber);
        f.link(3, 1, ConstraintType::FinishStart, Hardness::Rubber);

        f.run(&cal);
        assert_eq!(f.dates(2), (day(10), day(12)));
        // in collision, so still pushed
        assert_eq!(f.dates(3), (day(3), day(4)));
    }

    #[test]
    fn finish_finish_aligns_ends() {
        let cal = WeekendCalendar::all_working();
        let mut f = Fixture::new(vec![make_task(1, 1, 5), make_task(2, 1, 2)]);
        f.link(2, 1, ConstraintType::FinishFinish, Hardness::Strong);

        f.run(&cal);
        assert_eq!(f.dates(2), (day(4), day(5)));
    }

    #[test]
    fn start_start_with_lag() {
        let cal = WeekendCalendar::all_working();
        let mut f = Fixture::new(vec![make_task(1, 3, 5), make_task(2, 1, 3)]);
        f.link(2, 1, ConstraintType::StartStart, Hardness::Strong);
        f.deps.set_difference(DependencyKey::new(id(2), id(1)), 2).unwrap();

        f.run(&cal);
        assert_eq!(f.dates(2), (day(5), day(7)));
    }

    #[test]
    fn acceptable_start_skips_weekend() {
        let cal = WeekendCalendar::new();
        // Mon..Fri, dependant one day long
        let mut f = Fixture::new(vec![make_task(1, 1, 6), make_task(2, 2, 3)]);
        f.link(2, 1, ConstraintType::FinishStart, Hardness::Strong);

        f.run(&cal);
        assert_eq!(f.dates(2), (day(8), day(9)));
    }

    #[test]
    fn supertask_covers_subtasks() {
        let cal = WeekendCalendar::all_working();
        let f = Fixture::new(vec![make_task(10, 3, 4)]);
        {
            let mut tree = f.tree.borrow_mut();
            tree.add_subtask(id(10), make_task(11, 1, 3)).unwrap();
            tree.add_subtask(id(10), make_task(12, 5, 6)).unwrap();
        }

        f.run(&cal);
        assert_eq!(f.dates(10), (day(1), day(6)));
    }

    #[test]
    fn supertask_dependency_pushes_subtasks() {
        let cal = WeekendCalendar::all_working();
        let mut f = Fixture::new(vec![make_task(5, 1, 4), make_task(10, 1, 3)]);
        {
            let mut tree = f.tree.borrow_mut();
            tree.add_subtask(id(10), make_task(11, 1, 2)).unwrap();
            tree.add_subtask(id(10), make_task(12, 2, 3)).unwrap();
        }
        f.link(10, 5, ConstraintType::FinishStart, Hardness::Strong);

        f.run(&cal);
        assert_eq!(f.dates(11), (day(4), day(5)));
        assert_eq!(f.dates(12), (day(4), day(5)));
        assert_eq!(f.dates(10), (day(4), day(5)));
    }

    #[test]
    fn earliest_start_bounds_from_below() {
        let cal = WeekendCalendar::all_working();
        let mut f = Fixture::new(vec![
            make_task(1, 1, 3),
            make_task(2, 3, 4).with_earliest_start(day(6)),
        ]);
        f.link(2, 1, ConstraintType::FinishStart, Hardness::Strong);

        f.run(&cal);
        assert_eq!(f.dates(2), (day(6), day(7)));
    }

    #[test]
    fn disabled_scheduler_does_nothing() {
        let cal = WeekendCalendar::all_working();
        let mut f = Fixture::new(vec![make_task(1, 1, 3), make_task(2, 10, 12)]);
        f.link(2, 1, ConstraintType::FinishStart, Hardness::Strong);

        let report = Scheduler::new(false)
            .run(&mut f.tree.borrow_mut(), &f.deps, &cal)
            .unwrap();
        assert_eq!(report, ScheduleReport::default());
        assert_eq!(f.dates(2), (day(10), day(12)));
    }

    #[test]
    fn second_pass_is_stable() {
        let cal = WeekendCalendar::new();
        let mut f = Fixture::new(vec![make_task(1, 1, 6), make_task(2, 2, 3), make_task(3, 2, 4)]);
        f.link(2, 1, ConstraintType::FinishStart, Hardness::Strong);
        f.link(3, 2, ConstraintType::StartStart, Hardness::Rubber);

        f.run(&cal);
        assert!(f.run(&cal).modified.is_empty());
    }
}
