//! Error types for the dependency core

use thiserror::Error;

use crate::domain::{DependencyKey, TaskId};

/// Structural violations raised when editing the dependency graph
#[derive(Debug, Error, Clone, PartialEq)]
pub enum DependencyError {
    #[error("Dependency already exists: {0}")]
    AlreadyExists(DependencyKey),

    #[error("Task cannot depend on itself: {0}")]
    SelfDependency(TaskId),

    #[error("Tasks are hierarchically related, one contains the other: {0}")]
    HierarchyViolation(DependencyKey),

    #[error("Dependency would create a loop: {0}")]
    Loop(DependencyKey),

    #[error("Dependency not found: {0}")]
    NotFound(DependencyKey),

    #[error("Unknown task: {0}")]
    UnknownTask(TaskId),
}

/// Invalid persisted values
#[derive(Debug, Error, Clone, PartialEq)]
pub enum ParseError {
    #[error("Invalid constraint code '{0}': expected 1..4")]
    InvalidConstraintCode(String),

    #[error("Invalid constraint mnemonic '{0}': expected SS, FS, FF or SF")]
    InvalidConstraintMnemonic(String),

    #[error("Invalid hardness '{0}': expected Strong or Rubber")]
    InvalidHardness(String),
}

pub type Result<T> = std::result::Result<T, DependencyError>;
