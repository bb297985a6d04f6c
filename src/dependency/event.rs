//! Dependency change notifications
//!
//! Events fire synchronously at the point of mutation. `clear` on the
//! collection fires nothing; listeners treat it as a full reset.

use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;

use super::edge::TaskDependency;

/// Receives dependency changes
pub trait DependencyListener {
    fn dependency_added(&self, _dependency: &TaskDependency) {}

    fn dependency_removed(&self, _dependency: &TaskDependency) {}

    fn dependency_changed(&self, _dependency: &TaskDependency) {}
}

/// A single dependency change
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DependencyEvent {
    Added(TaskDependency),
    Removed(TaskDependency),
    Changed(TaskDependency),
}

impl DependencyEvent {
    /// The edge the event is about
    pub fn dependency(&self) -> &TaskDependency {
        match self {
            DependencyEvent::Added(d) | DependencyEvent::Removed(d) | DependencyEvent::Changed(d) => d,
        }
    }
}

/// Fans events out to registered listeners, in registration order
#[derive(Clone, Default)]
pub struct EventDispatcher {
    listeners: Vec<Rc<dyn DependencyListener>>,
}

impl EventDispatcher {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a listener
    pub fn add_listener(&mut self, listener: Rc<dyn DependencyListener>) {
        self.listeners.push(listener);
    }

    pub fn listener_count(&self) -> usize {
        self.listeners.len()
    }

    /// Delivers an event to every listener
    pub fn fire(&self, event: &DependencyEvent) {
        for listener in &self.listeners {
            match event {
                DependencyEvent::Added(d) => listener.dependency_added(d),
                DependencyEvent::Removed(d) => listener.dependency_removed(d),
                DependencyEvent::Changed(d) => listener.dependency_changed(d),
            }
        }
    }
}

impl fmt::Debug for EventDispatcher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EventDispatcher")
            .field("listeners", &self.listeners.len())
            .finish()
    }
}

/// Listener that records every event it receives
#[derive(Debug, Default)]
pub struct EventLog {
    events: RefCell<Vec<DependencyEvent>>,
}

impl EventLog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns a copy of the recorded events
    pub fn events(&self) -> Vec<DependencyEvent> {
        self.events.borrow().clone()
    }

    pub fn len(&self) -> usize {
        self.events.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.borrow().is_empty()
    }

    /// Forgets recorded events
    pub fn clear(&self) {
        self.events.borrow_mut().clear();
    }
}

impl DependencyListener for EventLog {
    fn dependency_added(&self, dependency: &TaskDependency) {
        self.events.borrow_mut().push(DependencyEvent::Added(*dependency));
    }

    fn dependency_removed(&self, dependency: &TaskDependency) {
        self.events.borrow_mut().push(DependencyEvent::Removed(*dependency));
    }

    fn dependency_changed(&self, dependency: &TaskDependency) {
        self.events.borrow_mut().push(DependencyEvent::Changed(*dependency));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dependency::{ConstraintType, Hardness};
    use crate::domain::TaskId;
    use std::cell::Cell;

    struct Counter(Cell<usize>);

    impl DependencyListener for Counter {
        fn dependency_added(&self, _dependency: &TaskDependency) {
            self.0.set(self.0.get() + 1);
        }
    }

    fn dep() -> TaskDependency {
        TaskDependency::new(TaskId::new(2), TaskId::new(1), ConstraintType::FinishStart, Hardness::Strong)
    }

    #[test]
    fn dispatcher_reaches_all_listeners() {
        let log = Rc::new(EventLog::new());
        let counter = Rc::new(Counter(Cell::new(0)));
        let mut dispatcher = EventDispatcher::new();
        dispatcher.add_listener(log.clone());
        dispatcher.add_listener(counter.clone());

        dispatcher.fire(&DependencyEvent::Added(dep()));
        dispatcher.fire(&DependencyEvent::Removed(dep()));

        assert_eq!(log.events(), vec![DependencyEvent::Added(dep()), DependencyEvent::Removed(dep())]);
        assert_eq!(counter.0.get(), 1);
        assert_eq!(dispatcher.listener_count(), 2);
    }

    #[test]
    fn event_log_clear() {
        let log = EventLog::new();
        log.dependency_changed(&dep());
        assert_eq!(log.len(), 1);
        assert_eq!(log.events()[0].dependency().key(), dep().key());
        log.clear();
        assert!(log.is_empty());
    }
}
