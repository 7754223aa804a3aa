//! In-memory record source for testing.
//!
//! [`MemorySource`] evaluates filters and orderings over a vector of
//! records serialized to JSON, and counts the queries it receives so tests
//! can assert which reads a pagination call issued.
//!
//! # Feature Flag
//!
//! This module is only available when the `test-utils` feature is enabled:
//!
//! ```toml
//! [dev-dependencies]
//! nvisy-paginator = { version = "...", features = ["test-utils"] }
//! ```
//!
//! # Example
//!
//! ```rust,ignore
//! use nvisy_paginator::mock::{MemorySource, MockRecord};
//!
//! let source = MemorySource::new(MockRecord::sequence(47));
//! let stats = source.stats();
//! ```

use std::cmp::Ordering;
use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering as AtomicOrdering};
use std::task::Poll;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::TRACING_TARGET_SOURCE;
use crate::cursor::RecordId;
use crate::error::BoxedError;
use crate::source::{FindQuery, Record, RecordSource};
use crate::types::{Filter, compare_json, lookup_field};

/// A simple record used throughout tests.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MockRecord {
    /// Identifier.
    pub id: RecordId,
    /// Display name.
    pub name: String,
    /// Sortable score.
    pub score: i64,
    /// Status used for filtering.
    pub status: String,
}

impl MockRecord {
    /// Creates a record.
    pub fn new(id: impl Into<RecordId>, name: impl Into<String>, score: i64) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            score,
            status: "active".to_owned(),
        }
    }

    /// Sets the status.
    pub fn with_status(mut self, status: impl Into<String>) -> Self {
        self.status = status.into();
        self
    }

    /// Creates `len` records with ids and scores `1..=len`.
    pub fn sequence(len: i64) -> Vec<Self> {
        (1..=len)
            .map(|n| Self::new(n, format!("record-{n}"), n))
            .collect()
    }
}

impl Record for MockRecord {
    fn id(&self) -> RecordId {
        self.id.clone()
    }
}

/// Number of queries a [`MemorySource`] has served.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct QueryStats {
    /// Calls to [`RecordSource::count`].
    pub count_calls: usize,
    /// Calls to [`RecordSource::find_ordered`].
    pub find_calls: usize,
}

/// Record source backed by a vector.
#[derive(Debug)]
pub struct MemorySource<T> {
    records: Vec<T>,
    count_calls: AtomicUsize,
    find_calls: AtomicUsize,
    in_flight: AtomicUsize,
    peak_in_flight: AtomicUsize,
    count_surplus: AtomicU64,
    failing: AtomicBool,
}

impl<T> MemorySource<T>
where
    T: Record + Serialize + Clone,
{
    /// Creates a source over the given records.
    pub fn new(records: Vec<T>) -> Self {
        Self {
            records,
            count_calls: AtomicUsize::new(0),
            find_calls: AtomicUsize::new(0),
            in_flight: AtomicUsize::new(0),
            peak_in_flight: AtomicUsize::new(0),
            count_surplus: AtomicU64::new(0),
            failing: AtomicBool::new(false),
        }
    }

    /// Makes `count` report `surplus` more records than can be fetched,
    /// emulating rows deleted between the count and later reads.
    pub fn with_count_surplus(self, surplus: u64) -> Self {
        self.count_surplus.store(surplus, AtomicOrdering::SeqCst);
        self
    }

    /// Makes every subsequent query fail.
    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, AtomicOrdering::SeqCst);
    }

    /// Returns the number of queries served so far.
    pub fn stats(&self) -> QueryStats {
        QueryStats {
            count_calls: self.count_calls.load(AtomicOrdering::SeqCst),
            find_calls: self.find_calls.load(AtomicOrdering::SeqCst),
        }
    }

    /// Returns the largest number of `find_ordered` calls that were
    /// running at the same time.
    pub fn peak_in_flight(&self) -> usize {
        self.peak_in_flight.load(AtomicOrdering::SeqCst)
    }

    /// Returns the records.
    pub fn records(&self) -> &[T] {
        &self.records
    }

    fn check_failing(&self) -> Result<(), BoxedError> {
        if self.failing.load(AtomicOrdering::SeqCst) {
            return Err("memory source is unavailable".into());
        }
        Ok(())
    }

    fn matching(&self, filter: &Filter) -> Result<Vec<(Value, &T)>, BoxedError> {
        let mut rows = Vec::with_capacity(self.records.len());
        for record in &self.records {
            let value = serde_json::to_value(record)?;
            if filter.matches(&value) {
                rows.push((value, record));
            }
        }
        Ok(rows)
    }
}

#[async_trait::async_trait]
impl<T> RecordSource for MemorySource<T>
where
    T: Record + Serialize + Clone,
{
    type Record = T;

    async fn count(&self, filter: &Filter) -> Result<u64, BoxedError> {
        self.count_calls.fetch_add(1, AtomicOrdering::SeqCst);
        self.check_failing()?;

        let count = self.matching(filter)?.len() as u64;
        Ok(count + self.count_surplus.load(AtomicOrdering::SeqCst))
    }

    async fn find_ordered(&self, query: FindQuery<'_>) -> Result<Vec<T>, BoxedError> {
        self.find_calls.fetch_add(1, AtomicOrdering::SeqCst);
        self.check_failing()?;

        // Suspend once so concurrent callers overlap.
        let _guard = InFlight::enter(&self.in_flight, &self.peak_in_flight);
        yield_now().await;

        let mut rows = self.matching(query.filter)?;
        let field = query.order_by.field.as_str();
        rows.sort_by(|(a, _), (b, _)| {
            let a = lookup_field(a, field).unwrap_or(&Value::Null);
            let b = lookup_field(b, field).unwrap_or(&Value::Null);
            query.order_by.order.apply(sort_key_cmp(a, b))
        });

        let start = match query.anchor {
            // Compared by string form, the way a store coerces a decoded
            // numeric id against a text column.
            Some(anchor) => {
                let anchor = anchor.to_string();
                match rows
                    .iter()
                    .position(|(_, record)| record.id().to_string() == anchor)
                {
                    Some(position) => position,
                    None => {
                        tracing::debug!(target: TRACING_TARGET_SOURCE, %anchor, "anchor not found");
                        return Ok(Vec::new());
                    }
                }
            }
            None => 0,
        };

        let skip = usize::try_from(query.skip).unwrap_or(usize::MAX);
        Ok(rows
            .into_iter()
            .skip(start)
            .skip(skip)
            .take(query.take as usize)
            .map(|(_, record)| record.clone())
            .collect())
    }
}

/// Tracks a running `find_ordered` call.
struct InFlight<'a>(&'a AtomicUsize);

impl<'a> InFlight<'a> {
    fn enter(current: &'a AtomicUsize, peak: &AtomicUsize) -> Self {
        let now = current.fetch_add(1, AtomicOrdering::SeqCst) + 1;
        peak.fetch_max(now, AtomicOrdering::SeqCst);
        Self(current)
    }
}

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        self.0.fetch_sub(1, AtomicOrdering::SeqCst);
    }
}

/// Returns `Pending` once, waking itself immediately.
async fn yield_now() {
    let mut yielded = false;
    futures::future::poll_fn(move |cx| {
        if yielded {
            return Poll::Ready(());
        }
        yielded = true;
        cx.waker().wake_by_ref();
        Poll::Pending
    })
    .await;
}

/// Total order over JSON values for sorting: nulls first, then booleans,
/// numbers, strings, arrays and objects.
fn sort_key_cmp(a: &Value, b: &Value) -> Ordering {
    compare_json(a, b).unwrap_or_else(|| rank(a).cmp(&rank(b)))
}

fn rank(value: &Value) -> u8 {
    match value {
        Value::Null => 0,
        Value::Bool(_) => 1,
        Value::Number(_) => 2,
        Value::String(_) => 3,
        Value::Array(_) => 4,
        Value::Object(_) => 5,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{FilterOp, OrderBy};

    fn ids(records: &[MockRecord]) -> Vec<RecordId> {
        records.iter().map(Record::id).collect()
    }

    fn int_ids(ids: &[i64]) -> Vec<RecordId> {
        ids.iter().copied().map(RecordId::from).collect()
    }

    #[tokio::test]
    async fn count_and_find() {
        let source = MemorySource::new(MockRecord::sequence(10));
        let filter = Filter::new().with("score", FilterOp::Gt, 5);
        let order_by = OrderBy::desc("score");

        assert_eq!(source.count(&filter).await.unwrap(), 5);

        let records = source
            .find_ordered(FindQuery::new(&filter, &order_by, 3))
            .await
            .unwrap();
        assert_eq!(ids(&records), int_ids(&[10, 9, 8]));
        assert_eq!(source.stats(), QueryStats { count_calls: 1, find_calls: 1 });
    }

    #[tokio::test]
    async fn anchor_is_inclusive_and_skip_applies_after() {
        let source = MemorySource::new(MockRecord::sequence(10));
        let filter = Filter::new();
        let order_by = OrderBy::asc("score");
        let anchor = RecordId::from(4_i64);

        let records = source
            .find_ordered(FindQuery::new(&filter, &order_by, 2).with_anchor(&anchor))
            .await
            .unwrap();
        assert_eq!(ids(&records), int_ids(&[4, 5]));

        let records = source
            .find_ordered(
                FindQuery::new(&filter, &order_by, 2)
                    .with_anchor(&anchor)
                    .with_skip(3),
            )
            .await
            .unwrap();
        assert_eq!(ids(&records), int_ids(&[7, 8]));
    }

    #[tokio::test]
    async fn unknown_anchor_yields_nothing() {
        let source = MemorySource::new(MockRecord::sequence(3));
        let filter = Filter::new();
        let order_by = OrderBy::asc("score");
        let anchor = RecordId::from("missing");

        let records = source
            .find_ordered(FindQuery::new(&filter, &order_by, 2).with_anchor(&anchor))
            .await
            .unwrap();
        assert!(records.is_empty());
    }

    #[tokio::test]
    async fn numeric_anchor_matches_text_id() {
        let source = MemorySource::new(vec![
            MockRecord::new("41", "a", 1),
            MockRecord::new("42", "b", 2),
        ]);
        let filter = Filter::new();
        let order_by = OrderBy::asc("score");
        let anchor = RecordId::from(42_i64);

        let records = source
            .find_ordered(FindQuery::new(&filter, &order_by, 5).with_anchor(&anchor))
            .await
            .unwrap();
        assert_eq!(ids(&records), vec![RecordId::from("42")]);
    }

    #[tokio::test]
    async fn failing_source() {
        let source = MemorySource::new(MockRecord::sequence(3));
        source.set_failing(true);
        assert!(source.count(&Filter::new()).await.is_err());
    }

    #[tokio::test]
    async fn count_surplus() {
        let source = MemorySource::new(MockRecord::sequence(3)).with_count_surplus(2);
        assert_eq!(source.count(&Filter::new()).await.unwrap(), 5);
    }
}
