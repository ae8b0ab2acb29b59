//! Core error types

use thiserror::Error;

use crate::core::output::OutputId;

/// Errors raised by output state, bindings and the registry.
///
/// None of these are fatal: callers log them and leave state untouched.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum OutputError {
    #[error("{field} cannot be changed after the output has been initialized")]
    ImmutableAfterInit { field: &'static str },

    #[error("an output cannot be initialized with an empty mode list")]
    EmptyModeList,

    #[error("mode index {index} is out of range for {len} modes")]
    InvalidModeIndex { index: usize, len: usize },

    #[error("invalid scale factor {0}, must be at least 1")]
    InvalidScale(i32),

    #[error("output already initialized")]
    AlreadyInitialized,

    #[error("output not initialized yet")]
    NotInitialized,

    #[error("output global has been removed")]
    GlobalRemoved,

    #[error("protocol version {requested} is below the minimum supported version {minimum}")]
    UnsupportedVersion { requested: u32, minimum: u32 },

    #[error("unknown output: {0}")]
    UnknownOutput(OutputId),
}

/// Result type for core operations
pub type Result<T> = std::result::Result<T, OutputError>;
