//! # Error Handling
//!
//! This module defines the centralized error type for `docserve`. It uses the
//! `thiserror` library to derive a single `Error` enum covering every failure
//! the overlay filesystem, compiled cache, content router and reference
//! resolver can produce.
//!
//! ## Key Components
//!
//! - **`Error`**: The main enum. Lazy values (see [`crate::future`]) capture
//!   an outcome once and replay it to every observer, so `Error` is `Clone`.
//!   Foreign errors that are not `Clone` (`std::io::Error`,
//!   `serde_json::Error`) are held behind an `Arc`.
//!
//! - **`ErrorKind`**: A `Copy` classification of an `Error`. Combinators such
//!   as [`crate::future::race`] take a list of kinds (`except_pass`) that they
//!   tolerate instead of propagating.
//!
//! - **`Result<T>`**: A type alias for `std::result::Result<T, Error>`.
//!
//! ## Recoverable kinds
//!
//! `NotFound` and `Validation` are the two recoverable kinds: they drive the
//! "try the next candidate" and "skip this entry" behavior of candidate
//! racing and refresh. `Configuration` errors are logged by the router and
//! make the affected provider resolve to nothing. Everything else surfaces to
//! the nearest caller.

use std::sync::Arc;
use thiserror::Error;

/// Main error type for docserve operations
#[derive(Error, Debug, Clone)]
pub enum Error {
    /// A path or name does not exist after overlay or candidate search.
    #[error("Not found: {path}")]
    NotFound { path: String },

    /// Content was read but is structurally invalid (for example an empty
    /// schema document).
    #[error("Validation error in {path}: {message}")]
    Validation { path: String, message: String },

    /// A provider entry in the configuration document is malformed.
    #[error("Configuration error for provider \"{provider}\": {message}{}", hint.as_ref().map(|h| format!("\n  hint: {}", h)).unwrap_or_default())]
    Configuration {
        provider: String,
        message: String,
        /// Optional hint for how to fix the entry
        hint: Option<String>,
    },

    /// An error indicating that a mutex or other lock has been poisoned.
    #[error("Lock poisoned: {context}")]
    LockPoisoned { context: String },

    /// An I/O error from a disk-backed storage backend.
    #[error("I/O error: {0}")]
    Io(Arc<std::io::Error>),

    /// A JSON parsing error.
    #[error("JSON parsing error: {0}")]
    Json(Arc<serde_json::Error>),

    /// A regular expression failed to compile.
    #[error("Regex error: {0}")]
    Regex(#[from] regex::Error),
}

/// Classification of an [`Error`], used by combinator `except_pass` lists.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    NotFound,
    Validation,
    Configuration,
    LockPoisoned,
    Io,
    Json,
    Regex,
}

impl Error {
    /// Build a `NotFound` error for `path`.
    pub fn not_found(path: impl Into<String>) -> Self {
        Error::NotFound { path: path.into() }
    }

    /// Build a `Validation` error for `path`.
    pub fn validation(path: impl Into<String>, message: impl Into<String>) -> Self {
        Error::Validation {
            path: path.into(),
            message: message.into(),
        }
    }

    /// Build a `Configuration` error without a hint.
    pub fn configuration(provider: impl Into<String>, message: impl Into<String>) -> Self {
        Error::Configuration {
            provider: provider.into(),
            message: message.into(),
            hint: None,
        }
    }

    /// The kind of this error.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Error::NotFound { .. } => ErrorKind::NotFound,
            Error::Validation { .. } => ErrorKind::Validation,
            Error::Configuration { .. } => ErrorKind::Configuration,
            Error::LockPoisoned { .. } => ErrorKind::LockPoisoned,
            Error::Io(_) => ErrorKind::Io,
            Error::Json(_) => ErrorKind::Json,
            Error::Regex(_) => ErrorKind::Regex,
        }
    }

    /// Whether this error's kind appears in `kinds`.
    pub fn is_any_of(&self, kinds: &[ErrorKind]) -> bool {
        kinds.contains(&self.kind())
    }

    /// Shorthand for `kind() == ErrorKind::NotFound`.
    pub fn is_not_found(&self) -> bool {
        self.kind() == ErrorKind::NotFound
    }
}

impl From<std::io::Error> for Error {
    fn from(err: std::io::Error) -> Self {
        Error::Io(Arc::new(err))
    }
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Error::Json(Arc::new(err))
    }
}

/// A convenient type alias for `Result<T, Error>`.
pub type Result<T> = std::result::Result<T, Error>;
