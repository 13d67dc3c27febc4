use crate::types::Terminal;
use std::path::PathBuf;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, TraceError>;

#[derive(Debug, Error)]
pub enum TraceError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// A persisted file exists but cannot be parsed. This is a hard
    /// failure: starting from an empty state when a state file is present
    /// would silently discard accumulated score.
    #[error("Malformed persisted file {path}: {message}")]
    PersistenceFormat { path: PathBuf, message: String },

    /// `union` was called on a terminal never `add`ed. Auto-adding here
    /// would mask a diff-detector bug, so this is a precondition violation.
    #[error("Unknown terminal: {0}")]
    UnknownTerminal(Terminal),

    #[error("Invalid edge: {reason}")]
    InvalidEdge { reason: String },

    /// The reference graph store timed out or errored. Distinct from a
    /// negative match result, which is an ordinary return value.
    #[error("Graph store unavailable: {reason}")]
    StoreUnavailable { reason: String },

    #[error("Validation error: {0}")]
    Validation(String),
}
