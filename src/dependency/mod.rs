//! Task dependency core
//!
//! Edges between tasks, the collection that owns and validates them, batch
//! editing, change events, and the textual and persisted edge formats.

mod collection;
mod constraint;
mod edge;
mod error;
mod event;
mod loop_detector;
mod mutator;
pub mod predecessors;
pub mod record;

pub use collection::DependencyCollection;
pub use constraint::{Collision, ConstraintType, Variation};
pub use edge::{ActivityBinding, Hardness, TaskDependency};
pub use error::{DependencyError, ParseError, Result};
pub use event::{DependencyEvent, DependencyListener, EventDispatcher, EventLog};
pub use loop_detector::LoopDetector;
pub use mutator::{CommitReport, DependencyMutator};
pub use predecessors::{PredecessorError, PredecessorSpec};
pub use record::DependencyRecord;
