//! Error types for pagination.

use crate::cursor::CursorError;
use crate::types::FilterError;

/// Type alias for boxed dynamic errors that can be sent across threads.
///
/// Record sources report their failures through this type so that the
/// paginator can pass them through without knowing the backing store.
pub type BoxedError = Box<dyn std::error::Error + Send + Sync>;

/// Error type for all pagination operations.
///
/// A failed call never yields a partial page: either the full result is
/// returned or one of these errors.
#[derive(Debug, thiserror::Error)]
#[must_use = "pagination errors should be handled appropriately"]
pub enum PaginatorError {
    /// Configuration error.
    #[error("Configuration error: {0}")]
    Config(String),

    /// Exactly one of the current page and the cursor was supplied.
    ///
    /// A page number is only meaningful relative to a resolved cursor, and
    /// vice versa.
    #[error("current page and cursor must be given together")]
    ArgumentMismatch,

    /// The request failed validation (zero sizes, empty order field).
    #[error("Invalid pagination request: {0}")]
    InvalidRequest(#[from] validator::ValidationErrors),

    /// The request asks for more than the configuration allows.
    #[error("{field} of {value} exceeds the configured maximum of {max}")]
    LimitExceeded {
        /// Name of the offending request field.
        field: &'static str,
        /// Requested value.
        value: u32,
        /// Configured maximum.
        max: u32,
    },

    /// The filter could not be parsed.
    ///
    /// Filters are parsed before a request is built, so pagination itself
    /// never returns this; it lets callers propagate [`Filter::parse`]
    /// failures with `?`.
    ///
    /// [`Filter::parse`]: crate::types::Filter::parse
    #[error("Invalid filter: {0}")]
    InvalidFilter(#[from] FilterError),

    /// The cursor is malformed or was tampered with.
    #[error("Invalid cursor: {0}")]
    InvalidCursor(#[from] CursorError),

    /// Records were counted but none could be fetched to anchor the page.
    ///
    /// Indicates the data changed between the count and the fetch.
    #[error("no record found to anchor the page although {total_count} records matched")]
    EmptyAnchor {
        /// Count returned by the preceding count query.
        total_count: u64,
    },

    /// The record source failed.
    #[error("Record source error: {0}")]
    RecordSource(#[source] BoxedError),
}

impl PaginatorError {
    /// Wraps a record source failure.
    pub fn record_source(error: impl Into<BoxedError>) -> Self {
        Self::RecordSource(error.into())
    }

    /// Returns whether the error was caused by the caller's input.
    ///
    /// Caller errors will fail again with the same input; the remaining
    /// errors depend on the state of the record source.
    pub fn is_caller_error(&self) -> bool {
        matches!(
            self,
            Self::ArgumentMismatch
                | Self::InvalidRequest(_)
                | Self::LimitExceeded { .. }
                | Self::InvalidFilter(_)
                | Self::InvalidCursor(_)
        )
    }
}

/// Specialized [`Result`] type for pagination operations.
pub type PaginatorResult<T, E = PaginatorError> = Result<T, E>;
