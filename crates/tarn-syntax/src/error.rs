//! Error handling for the Tarn toolchain.
//!
//! Every stage reports failures through the same [`Error`] type. Lex and
//! parse errors carry the zero-based character offset where scanning could
//! not continue; semantic and runtime errors carry a message only. No stage
//! recovers: the first error aborts the pipeline.
//!
//! # Examples
//!
//! ```rust
//! use tarn_syntax::error::{Error, Result, error};
//!
//! let located = Error::at("unterminated string literal", 13);
//! assert_eq!(located.to_string(), "unterminated string literal at index 13");
//!
//! fn check(n: i32) -> Result<i32> {
//!     if n < 0 {
//!         error("expected a non-negative number")
//!     } else {
//!         Ok(n)
//!     }
//! }
//! assert!(check(-1).is_err());
//! ```

use std::fmt;

/// An error produced by any stage of the Tarn pipeline.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Error {
    /// Human-readable description.
    pub msg: String,
    /// Zero-based character offset in the source, for lex and parse errors.
    pub offset: Option<usize>,
}

impl Error {
    /// An error with no source position (semantic and runtime failures).
    pub fn new(msg: impl Into<String>) -> Self {
        Self {
            msg: msg.into(),
            offset: None,
        }
    }

    /// An error anchored at a character offset (lex and parse failures).
    pub fn at(msg: impl Into<String>, offset: usize) -> Self {
        Self {
            msg: msg.into(),
            offset: Some(offset),
        }
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.offset {
            Some(offset) => write!(f, "{} at index {}", self.msg, offset),
            None => write!(f, "{}", self.msg),
        }
    }
}

impl std::error::Error for Error {}

impl From<String> for Error {
    fn from(msg: String) -> Self {
        Error::new(msg)
    }
}

impl From<&str> for Error {
    fn from(msg: &str) -> Self {
        Error::new(msg)
    }
}

/// A specialized `Result` for Tarn operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Shorthand for `Err(Error::new(msg))`.
pub fn error<T>(msg: impl Into<String>) -> Result<T> {
    Err(Error::new(msg))
}

/// Shorthand for `Err(Error::at(msg, offset))`.
pub fn error_at<T>(offset: usize, msg: impl Into<String>) -> Result<T> {
    Err(Error::at(msg, offset))
}
