//! Error type shared by the whole engine.

use std::fmt;

/// Error type returned by constructors, operators and refiners.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Error {
    /// Malformed input data: negative counts, nonconforming dimensions,
    /// out-of-range indices in user-provided structures.
    InvalidInput(String),

    /// A required algorithm argument was not provided.
    MissingArgument(&'static str),

    /// An algorithm, option or flavor name is not supported.
    UnsupportedOption(String),

    /// An internal invariant does not hold for the requested operation,
    /// e.g. coarsening produced an empty topology.
    InvariantViolation(String),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::InvalidInput(msg) => write!(f, "invalid input: {msg}"),
            Error::MissingArgument(name) => write!(f, "missing argument '{name}'"),
            Error::UnsupportedOption(msg) => write!(f, "unsupported option: {msg}"),
            Error::InvariantViolation(msg) => write!(f, "invariant violation: {msg}"),
        }
    }
}

impl std::error::Error for Error {}

/// Convenience alias used throughout the crate.
pub type Result<T> = std::result::Result<T, Error>;
