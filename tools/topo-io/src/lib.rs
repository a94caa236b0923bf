//! Readers and writers for the file formats the partitioning tools
//! interoperate with:
//!
//! - Scotch `.grf` graphs ([`grf`]),
//! - MatrixMarket `.mtx` sparse matrices read as graphs
//!   ([`matrix_market`]),
//! - Medit `.mesh` meshes ([`medit`]),
//! - Scotch `.map`, MeTiS and PaToH partition files ([`partition`]).
//!
//! The crate exposes plain data structures; converting them into a
//! partitioner's models is the caller's concern.

pub mod grf;
pub mod matrix_market;
pub mod medit;
pub mod partition;

use std::fmt;
use std::io;

/// Error type returned by every parser and writer of this crate.
#[derive(Debug)]
pub enum Error {
    Io(io::Error),
    /// Malformed content, with a short description of what went wrong.
    Parse(String),
    /// A format variant the parsers do not understand.
    UnsupportedFormat(String),
}

impl Error {
    fn parse(message: impl Into<String>) -> Error {
        Error::Parse(message.into())
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::Io(err) => write!(f, "io error: {err}"),
            Error::Parse(msg) => write!(f, "parse error: {msg}"),
            Error::UnsupportedFormat(msg) => write!(f, "unsupported format: {msg}"),
        }
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Error::Io(err) => Some(err),
            _ => None,
        }
    }
}

impl From<io::Error> for Error {
    fn from(err: io::Error) -> Error {
        Error::Io(err)
    }
}

pub type Result<T> = std::result::Result<T, Error>;
