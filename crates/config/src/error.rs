//! Configuration Error Types
//!
//! This module provides structured errors using `exn` for automatic location
//! tracking and error tree construction.

use derive_more::{Display, Error};

/// A configuration error with automatic location tracking.
pub type Error = exn::Exn<ErrorKind>;
/// Result type alias for configuration loading.
pub type Result<T> = std::result::Result<T, Error>;

/// Actionable error categories.
#[derive(Debug, Display, Error, Clone, PartialEq, Eq)]
pub enum ErrorKind {
    /// The providers could not be merged or deserialized.
    #[display("could not extract configuration")]
    Extract,
    /// A value was present but unusable.
    #[display("invalid value for '{field}': {value}")]
    Invalid { field: &'static str, value: String },
    /// The save directory could not be created or resolved.
    #[display("could not prepare save directory: {_0}")]
    SaveDir(#[error(not(source))] String),
}

