//! Error types shared by the library.
//!
//! Internally we use `anyhow` for context-rich errors. At the public boundary errors are wrapped
//! in [`Error`], which carries an [`ErrorType`] so that callers (like the HTTP server) can decide
//! how to report a failure without inspecting message text.

use serde::{Deserialize, Serialize};
use std::fmt::{Debug, Display, Formatter};

pub type Result<T> = std::result::Result<T, Error>;

/// The internal result type.
pub(crate) type Res<T> = std::result::Result<T, anyhow::Error>;

/// Broad classification of a failure.
#[derive(Debug, Default, Clone, Copy, Eq, PartialEq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorType {
    /// The request could not be read or parsed.
    Request,
    /// The request was well-formed but one of its values is not acceptable.
    Validation,
    /// The backing store files do not exist yet. Run `meterbill init`.
    Uninitialized,
    /// Reading or writing the backing store failed.
    Storage,
    /// The configuration file is missing or invalid.
    Config,
    /// Anything else, e.g. failing to bind the listener.
    #[default]
    Service,
}

serde_plain::derive_display_from_serialize!(ErrorType);
serde_plain::derive_fromstr_from_deserialize!(ErrorType);

/// The public error type: an `anyhow::Error` with an [`ErrorType`] attached.
pub struct Error {
    error_type: ErrorType,
    inner: anyhow::Error,
}

impl Error {
    pub fn new(error_type: ErrorType, inner: impl Into<anyhow::Error>) -> Self {
        Self {
            error_type,
            inner: inner.into(),
        }
    }

    pub fn error_type(&self) -> ErrorType {
        self.error_type
    }
}

impl Display for Error {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        // Print the whole context chain, outermost first.
        write!(f, "{:#}", self.inner)
    }
}

impl Debug for Error {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} error: {:?}", self.error_type, self.inner)
    }
}

/// An unclassified `anyhow::Error` becomes a `Service` error. Use [`IntoResult::pub_result`] to
/// classify it instead.
impl From<anyhow::Error> for Error {
    fn from(value: anyhow::Error) -> Self {
        Error::new(ErrorType::default(), value)
    }
}

/// Classifies the error of a `Result` as it crosses into the public API.
pub(crate) trait IntoResult<T> {
    fn pub_result(self, error_type: ErrorType) -> Result<T>;
}

impl<T, E> IntoResult<T> for std::result::Result<T, E>
where
    E: Into<anyhow::Error>,
{
    fn pub_result(self, error_type: ErrorType) -> Result<T> {
        self.map_err(|e| Error::new(error_type, e))
    }
}
