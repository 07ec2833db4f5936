//! Feed Error Types
//!
//! This module provides structured errors using `exn` for automatic location
//! tracking and error tree construction.

use derive_more::{Display, Error};

/// A feed error with automatic location tracking.
pub type Error = exn::Exn<ErrorKind>;
/// Result type alias for feed operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Actionable error categories.
#[derive(Debug, Display, Error, Clone, PartialEq, Eq)]
pub enum ErrorKind {
    /// The HTTP client could not be constructed.
    #[display("could not build HTTP client")]
    Client,
    /// The request never produced a response (DNS, TLS, timeout, ...).
    #[display("request to {_0} failed")]
    Request(#[error(not(source))] String),
    /// The server answered with a non-success status.
    #[display("unexpected HTTP status {status} from {url}")]
    Status { status: u16, url: String },
    /// The body is not a readable RSS document.
    #[display("malformed feed: {_0}")]
    Malformed(#[error(not(source))] String),
    /// The channel has no items at all, which the upstream only does when
    /// something is wrong with the account or the request.
    #[display("feed channel items are missing: {_0}")]
    MissingItems(#[error(not(source))] String),
    /// A field was found but could not be parsed.
    #[display("failed to parse field '{field}', found value: {value}")]
    ParseError { field: &'static str, value: String },
}

impl ErrorKind {
    /// Returns `true` if retrying might succeed.
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Request(_) => true,
            Self::Status { status, .. } => *status >= 500 || *status == 429,
            _ => false,
        }
    }
}
