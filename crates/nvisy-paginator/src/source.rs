//! The data access capability required by the paginator.

use std::sync::Arc;

use crate::cursor::RecordId;
use crate::error::BoxedError;
use crate::types::{Filter, OrderBy};

/// A record exposing its identifier.
pub trait Record: Send + Sync {
    /// Returns the identifier cursors are derived from.
    fn id(&self) -> RecordId;
}

/// Parameters of an ordered fetch.
///
/// With an `anchor`, results start at the anchor record itself (inclusive)
/// in the requested order; without one they start at the first matching
/// record. `skip` is applied after anchoring.
#[derive(Debug, Clone, Copy)]
pub struct FindQuery<'a> {
    /// Predicate records must satisfy.
    pub filter: &'a Filter,
    /// Field and direction to order by.
    pub order_by: &'a OrderBy,
    /// Record the results start at.
    pub anchor: Option<&'a RecordId>,
    /// Number of records to skip.
    pub skip: u64,
    /// Maximum number of records to return.
    pub take: u32,
}

impl<'a> FindQuery<'a> {
    /// Creates a query for the first `take` records.
    pub fn new(filter: &'a Filter, order_by: &'a OrderBy, take: u32) -> Self {
        Self {
            filter,
            order_by,
            anchor: None,
            skip: 0,
            take,
        }
    }

    /// Starts the results at the given record.
    #[inline]
    pub fn with_anchor(mut self, anchor: &'a RecordId) -> Self {
        self.anchor = Some(anchor);
        self
    }

    /// Skips the given number of records.
    #[inline]
    pub fn with_skip(mut self, skip: u64) -> Self {
        self.skip = skip;
        self
    }
}

/// Counting and ordered fetching over a filtered record set.
///
/// Implementations translate [`Filter`] and [`OrderBy`] into queries against
/// their store. Errors are passed through to the caller untouched and are
/// never retried by the paginator.
#[async_trait::async_trait]
pub trait RecordSource: Send + Sync {
    /// The record type returned by fetches.
    type Record: Record;

    /// Counts the records matching the filter.
    async fn count(&self, filter: &Filter) -> Result<u64, BoxedError>;

    /// Fetches records matching the query, in the query's order.
    async fn find_ordered(&self, query: FindQuery<'_>) -> Result<Vec<Self::Record>, BoxedError>;
}

#[async_trait::async_trait]
impl<S> RecordSource for &S
where
    S: RecordSource + ?Sized,
{
    type Record = S::Record;

    async fn count(&self, filter: &Filter) -> Result<u64, BoxedError> {
        (**self).count(filter).await
    }

    async fn find_ordered(&self, query: FindQuery<'_>) -> Result<Vec<Self::Record>, BoxedError> {
        (**self).find_ordered(query).await
    }
}

#[async_trait::async_trait]
impl<S> RecordSource for Arc<S>
where
    S: RecordSource + ?Sized,
{
    type Record = S::Record;

    async fn count(&self, filter: &Filter) -> Result<u64, BoxedError> {
        (**self).count(filter).await
    }

    async fn find_ordered(&self, query: FindQuery<'_>) -> Result<Vec<Self::Record>, BoxedError> {
        (**self).find_ordered(query).await
    }
}
