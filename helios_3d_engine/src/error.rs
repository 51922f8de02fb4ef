//! Error types for the Helios3D engine
//!
//! This module defines the error types used throughout the engine,
//! including scene queries, resource loading and backing storage.

use std::fmt;

/// Result type for Helios3D engine operations
pub type Result<T> = std::result::Result<T, Error>;

/// Helios3D engine errors
#[derive(Debug, Clone, PartialEq)]
pub enum Error {
    /// Error reported by a storage backend or image source
    BackendError(String),

    /// Backing storage could not be allocated
    OutOfMemory,

    /// Invalid resource (unknown name or handle, duplicate name, bad state)
    InvalidResource(String),

    /// Initialization failed (engine, subsystems)
    InitializationFailed(String),

    /// A caller-supplied argument violates a precondition
    InvalidArgument(String),

    /// An operation was given an empty input sequence
    EmptyInput(String),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::BackendError(msg) => write!(f, "Backend error: {}", msg),
            Error::OutOfMemory => write!(f, "Out of memory"),
            Error::InvalidResource(msg) => write!(f, "Invalid resource: {}", msg),
            Error::InitializationFailed(msg) => write!(f, "Initialization failed: {}", msg),
            Error::InvalidArgument(msg) => write!(f, "Invalid argument: {}", msg),
            Error::EmptyInput(msg) => write!(f, "Empty input: {}", msg),
        }
    }
}

impl std::error::Error for Error {}

#[cfg(test)]
#[path = "error_tests.rs"]
mod tests;
