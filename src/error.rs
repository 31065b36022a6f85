//! Error type.
//!
//! This is the shared error type for the whole crate. Every fallible
//! operation returns one of these variants; there are no panics on
//! user-reachable paths (the only assertions are for programmer
//! invariants that cannot occur from user input, e.g. enum-exhaustive
//! switches).

use std::fmt;

/// Error codes returned by engine operations.
///
/// Callers match on the variant, not on a message string; human-readable
/// detail goes through the `log` facade (see the crate root docs) rather
/// than being packed into the error.
#[derive(Copy, Clone, Eq, PartialEq, Hash, thiserror::Error)]
pub enum EngineError {
    #[error("generic error")]
    Generic,
    #[error("out of memory")]
    Memory,
    #[error("not found")]
    NotFound,
    #[error("invalid argument")]
    InvalidArg,
    #[error("invalid data")]
    InvalidData,
    #[error("invalid usage")]
    InvalidUsage,
    #[error("I/O error")]
    Io,
    #[error("unsupported")]
    Unsupported,
    #[error("external error")]
    External,
    #[error("graphics feature unsupported by backend")]
    GraphicsUnsupported,
    #[error("a resource limit was exceeded")]
    Limits,
    #[error("internal invariant violated")]
    Bug,
    #[error("operation timed out")]
    Timeout,
}

impl fmt::Debug for EngineError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        fmt::Display::fmt(self, f)
    }
}

impl From<std::io::Error> for EngineError {
    fn from(_: std::io::Error) -> Self {
        EngineError::Io
    }
}

pub type Result<T> = ::std::result::Result<T, EngineError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn io_error_maps_to_io_variant() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "missing");
        let engine_err: EngineError = io_err.into();
        assert_eq!(engine_err, EngineError::Io);
    }
}
