//! Pagination orchestration.
//!
//! A call issues, against the record source:
//!
//! 1. a count of the matching records,
//! 2. without a cursor, a lookup of the first record to anchor the page,
//! 3. the page fetch starting at the anchor,
//! 4. one single-record lookup per distinct page boundary in the window.
//!
//! Steps 3 and 4 run concurrently. The reads are not isolated from each
//! other, so a result may combine slightly different snapshots of the data:
//! a count that no longer matches the rows, a marker whose page vanished.
//! Such markers are dropped and logged rather than failing the call.

use std::collections::BTreeMap;

use futures::{StreamExt, TryStreamExt, stream};
use validator::Validate;

use crate::config::PaginatorConfig;
use crate::cursor::{CursorCodec, RecordId};
use crate::error::{PaginatorError, PaginatorResult};
use crate::source::{FindQuery, Record, RecordSource};
use crate::types::{PageCursors, PageEdge, PageMarker, PageRequest, Pagination};
use crate::window::PageWindow;
use crate::{TRACING_TARGET_PAGINATOR, TRACING_TARGET_SOURCE};

/// Record ids at page boundaries, keyed by offset.
type BoundaryIds = BTreeMap<u64, RecordId>;

/// Computes pages and page cursors over a [`RecordSource`].
#[derive(Debug, Clone)]
pub struct Paginator<S> {
    source: S,
    codec: CursorCodec,
    config: PaginatorConfig,
}

impl<S: RecordSource> Paginator<S> {
    /// Creates a paginator with the default configuration.
    pub fn new(source: S) -> Self {
        Self::with_config(source, PaginatorConfig::default())
    }

    /// Creates a paginator with the given configuration.
    ///
    /// The configuration is not validated; use [`PaginatorConfig::build`]
    /// for that.
    pub fn with_config(source: S, config: PaginatorConfig) -> Self {
        Self {
            source,
            codec: config.codec(),
            config,
        }
    }

    /// Returns the record source.
    #[inline]
    pub fn source(&self) -> &S {
        &self.source
    }

    /// Returns the cursor codec.
    #[inline]
    pub fn codec(&self) -> &CursorCodec {
        &self.codec
    }

    /// Returns the configuration.
    #[inline]
    pub fn config(&self) -> &PaginatorConfig {
        &self.config
    }

    /// Fetches a page and the navigation markers around it.
    ///
    /// # Errors
    ///
    /// - [`PaginatorError::ArgumentMismatch`] when exactly one of the current
    ///   page and the cursor is set.
    /// - [`PaginatorError::InvalidRequest`] or [`PaginatorError::LimitExceeded`]
    ///   for out-of-range sizes.
    /// - [`PaginatorError::InvalidCursor`] when the cursor cannot be decoded.
    /// - [`PaginatorError::EmptyAnchor`] when records were counted but the
    ///   first one could not be fetched.
    /// - [`PaginatorError::RecordSource`] when any query fails.
    #[tracing::instrument(
        skip_all,
        target = TRACING_TARGET_PAGINATOR,
        fields(
            page_size = request.page_size,
            current_page = ?request.current_page,
            order_by = %request.order_by.field,
        )
    )]
    pub async fn paginate(&self, request: &PageRequest) -> PaginatorResult<Pagination<S::Record>> {
        self.validate(request)?;

        let total_count = self
            .source
            .count(&request.filter)
            .await
            .map_err(PaginatorError::RecordSource)?;

        tracing::debug!(target: TRACING_TARGET_PAGINATOR, total_count, "Counted matching records");

        if total_count == 0 {
            return Ok(Pagination::empty());
        }

        let mut boundaries = BoundaryIds::new();
        let (anchor, requested_page) = match (&request.cursor, request.current_page) {
            (Some(cursor), Some(page)) => (self.codec.decode(cursor)?, u64::from(page)),
            _ => {
                let first = self
                    .lookup(request, 0)
                    .await?
                    .ok_or(PaginatorError::EmptyAnchor { total_count })?;
                boundaries.insert(0, first.clone());
                (first, 1)
            }
        };

        tracing::debug!(target: TRACING_TARGET_PAGINATOR, %anchor, requested_page, "Resolved page anchor");

        let window = PageWindow::new(
            requested_page,
            request.page_size,
            request.button_count,
            total_count,
        );

        if window.current_page() != requested_page {
            tracing::warn!(
                target: TRACING_TARGET_PAGINATOR,
                requested_page,
                total_pages = window.total_pages(),
                "Requested page is past the last page, clamping"
            );
        }

        let (edges, boundaries) = futures::try_join!(
            self.fetch_edges(request, &anchor),
            self.lookup_boundaries(request, &window, boundaries),
        )?;

        Ok(Pagination {
            edges: Some(edges),
            cursors: self.build_cursors(&window, &boundaries),
            total_count,
            total_pages: window.total_pages(),
            current_page: Some(window.current_page()),
        })
    }

    fn validate(&self, request: &PageRequest) -> PaginatorResult<()> {
        if request.is_mismatched() {
            return Err(PaginatorError::ArgumentMismatch);
        }

        request.validate()?;

        if request.page_size > self.config.max_page_size {
            return Err(PaginatorError::LimitExceeded {
                field: "page_size",
                value: request.page_size,
                max: self.config.max_page_size,
            });
        }

        if request.button_count > self.config.max_button_count {
            return Err(PaginatorError::LimitExceeded {
                field: "button_count",
                value: request.button_count,
                max: self.config.max_button_count,
            });
        }

        Ok(())
    }

    /// Fetches the page starting at the anchor.
    async fn fetch_edges(
        &self,
        request: &PageRequest,
        anchor: &RecordId,
    ) -> PaginatorResult<Vec<PageEdge<S::Record>>> {
        let query = FindQuery::new(&request.filter, &request.order_by, request.page_size)
            .with_anchor(anchor);

        let records = self
            .source
            .find_ordered(query)
            .await
            .map_err(PaginatorError::RecordSource)?;

        tracing::debug!(target: TRACING_TARGET_SOURCE, fetched = records.len(), "Fetched page records");

        Ok(records
            .into_iter()
            .map(|record| PageEdge::new(self.codec.encode(&record.id()), record))
            .collect())
    }

    /// Looks up the id of the record at the given offset.
    async fn lookup(&self, request: &PageRequest, offset: u64) -> PaginatorResult<Option<RecordId>> {
        let query = FindQuery::new(&request.filter, &request.order_by, 1).with_skip(offset);

        let records = self
            .source
            .find_ordered(query)
            .await
            .map_err(PaginatorError::RecordSource)?;

        Ok(records.first().map(Record::id))
    }

    /// Looks up the ids at every page boundary of the window that is not
    /// already known.
    async fn lookup_boundaries(
        &self,
        request: &PageRequest,
        window: &PageWindow,
        mut known: BoundaryIds,
    ) -> PaginatorResult<BoundaryIds> {
        let pending: Vec<u64> = window
            .boundary_offsets()
            .into_iter()
            .filter(|offset| !known.contains_key(offset))
            .collect();

        tracing::trace!(target: TRACING_TARGET_SOURCE, lookups = pending.len(), "Looking up page boundaries");

        let found: Vec<(u64, Option<RecordId>)> = stream::iter(pending)
            .map(|offset| async move {
                self.lookup(request, offset)
                    .await
                    .map(|id| (offset, id))
            })
            .buffer_unordered(self.config.lookup_concurrency.max(1))
            .try_collect()
            .await?;

        for (offset, id) in found {
            match id {
                Some(id) => {
                    known.insert(offset, id);
                }
                None => tracing::warn!(
                    target: TRACING_TARGET_PAGINATOR,
                    offset,
                    "No record at page boundary, dropping marker"
                ),
            }
        }

        Ok(known)
    }

    fn build_cursors(&self, window: &PageWindow, boundaries: &BoundaryIds) -> PageCursors {
        let marker = |page: u64| {
            boundaries
                .get(&window.offset_of(page))
                .map(|id| PageMarker {
                    page,
                    cursor: self.codec.encode(id),
                    is_current: page == window.current_page(),
                })
        };

        PageCursors {
            first: window.first().and_then(marker),
            previous: window.previous().and_then(marker),
            around: Some(window.around().filter_map(marker).collect()),
            next: window.next().and_then(marker),
            last: window.last().and_then(marker),
        }
    }
}

/// Paginates over a record source with the default configuration.
///
/// Shorthand for `Paginator::new(source).paginate(request)`.
pub async fn paginate<S>(
    request: &PageRequest,
    source: &S,
) -> PaginatorResult<Pagination<S::Record>>
where
    S: RecordSource + ?Sized,
{
    Paginator::new(source).paginate(request).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Cursor;
    use crate::mock::{MemorySource, MockRecord, QueryStats};
    use crate::types::{Filter, FilterOp, OrderBy};

    fn request() -> PageRequest {
        PageRequest::new(10, 5, OrderBy::asc("score"))
    }

    fn cursor_for(id: i64) -> Cursor {
        CursorCodec::default().encode(&RecordId::from(id))
    }

    #[tokio::test]
    async fn first_page_without_cursor() {
        let source = MemorySource::new(MockRecord::sequence(47));
        let pagination = paginate(&request(), &source).await.unwrap();

        assert_eq!(pagination.total_count, 47);
        assert_eq!(pagination.total_pages, 5);
        assert_eq!(pagination.current_page, Some(1));

        let ids: Vec<_> = pagination.nodes().map(|record| record.score).collect();
        assert_eq!(ids, (1..=10).collect::<Vec<_>>());

        let cursors = &pagination.cursors;
        assert!(cursors.previous.is_none());
        assert_eq!(cursors.first.as_ref().unwrap().page, 1);
        assert_eq!(cursors.first.as_ref().unwrap().cursor, cursor_for(1));
        assert!(cursors.first.as_ref().unwrap().is_current);
        assert_eq!(cursors.next.as_ref().unwrap().page, 2);
        assert_eq!(cursors.next.as_ref().unwrap().cursor, cursor_for(11));
        assert_eq!(cursors.last.as_ref().unwrap().page, 5);
        assert_eq!(cursors.around_pages(), vec![1, 2, 3, 4, 5]);
    }

    #[tokio::test]
    async fn third_page_with_cursor() {
        let source = MemorySource::new(MockRecord::sequence(47));
        let request = request().with_page(3, cursor_for(21));
        let pagination = paginate(&request, &source).await.unwrap();

        assert_eq!(pagination.current_page, Some(3));
        let ids: Vec<_> = pagination.nodes().map(|record| record.score).collect();
        assert_eq!(ids, (21..=30).collect::<Vec<_>>());

        let cursors = &pagination.cursors;
        assert_eq!(cursors.previous.as_ref().unwrap().page, 2);
        assert_eq!(cursors.previous.as_ref().unwrap().cursor, cursor_for(11));
        assert_eq!(cursors.next.as_ref().unwrap().page, 4);
        assert_eq!(cursors.next.as_ref().unwrap().cursor, cursor_for(31));
        assert_eq!(cursors.last.as_ref().unwrap().page, 5);
        assert_eq!(cursors.last.as_ref().unwrap().cursor, cursor_for(41));
        assert_eq!(cursors.around_pages(), vec![1, 2, 3, 4, 5]);

        let current: Vec<_> = cursors
            .around
            .iter()
            .flatten()
            .filter(|marker| marker.is_current)
            .map(|marker| marker.page)
            .collect();
        assert_eq!(current, vec![3]);
    }

    #[tokio::test]
    async fn edges_carry_record_cursors() {
        let source = MemorySource::new(MockRecord::sequence(12));
        let pagination = paginate(&request(), &source).await.unwrap();

        for edge in pagination.edges.iter().flatten() {
            assert_eq!(edge.cursor, cursor_for(edge.node.score));
        }
    }

    #[tokio::test]
    async fn navigating_with_markers_walks_every_page() {
        let source = MemorySource::new(MockRecord::sequence(47));
        let mut request = request();
        let mut seen = Vec::new();

        loop {
            let pagination = paginate(&request, &source).await.unwrap();
            seen.extend(pagination.nodes().map(|record| record.score));
            match &pagination.cursors.next {
                Some(next) => request = request.navigate(next),
                None => break,
            }
        }

        assert_eq!(seen, (1..=47).collect::<Vec<_>>());
    }

    #[tokio::test]
    async fn descending_order() {
        let source = MemorySource::new(MockRecord::sequence(25));
        let request = PageRequest::new(10, 3, OrderBy::desc("score"));
        let pagination = paginate(&request, &source).await.unwrap();

        let ids: Vec<_> = pagination.nodes().map(|record| record.score).collect();
        assert_eq!(ids, (16..=25).rev().collect::<Vec<_>>());
        assert_eq!(pagination.cursors.last.as_ref().unwrap().cursor, cursor_for(5));
    }

    #[tokio::test]
    async fn filter_is_passed_through() {
        let mut records = MockRecord::sequence(30);
        for record in records.iter_mut().filter(|record| record.score % 2 == 0) {
            record.status = "archived".to_owned();
        }
        let source = MemorySource::new(records);
        let request = request().with_filter(Filter::new().equals("status", "active"));

        let pagination = paginate(&request, &source).await.unwrap();
        assert_eq!(pagination.total_count, 15);
        assert_eq!(pagination.total_pages, 2);
        assert!(pagination.nodes().all(|record| record.status == "active"));
    }

    #[tokio::test]
    async fn no_matches_returns_nulls_after_count_only() {
        let source = MemorySource::new(MockRecord::sequence(10));
        let request = request().with_filter(Filter::new().with("score", FilterOp::Gt, 100));

        let pagination = paginate(&request, &source).await.unwrap();
        assert!(pagination.edges.is_none());
        assert!(pagination.cursors.is_empty());
        assert_eq!(source.stats(), QueryStats { count_calls: 1, find_calls: 0 });
    }

    #[tokio::test]
    async fn mismatched_arguments_are_rejected() {
        let source = MemorySource::new(MockRecord::sequence(10));

        let mut only_page = request();
        only_page.current_page = Some(2);
        let error = paginate(&only_page, &source).await.unwrap_err();
        assert!(matches!(error, PaginatorError::ArgumentMismatch));

        let mut only_cursor = request();
        only_cursor.cursor = Some(cursor_for(3));
        let error = paginate(&only_cursor, &source).await.unwrap_err();
        assert!(matches!(error, PaginatorError::ArgumentMismatch));

        assert_eq!(source.stats(), QueryStats::default());
    }

    #[tokio::test]
    async fn invalid_cursor_is_rejected() {
        let source = MemorySource::new(MockRecord::sequence(10));
        let request = request().with_page(2, "not a cursor");

        let error = paginate(&request, &source).await.unwrap_err();
        assert!(matches!(error, PaginatorError::InvalidCursor(_)));
    }

    #[tokio::test]
    async fn empty_anchor_is_surfaced() {
        let source = MemorySource::new(Vec::<MockRecord>::new()).with_count_surplus(3);

        let error = paginate(&request(), &source).await.unwrap_err();
        assert!(matches!(error, PaginatorError::EmptyAnchor { total_count: 3 }));
    }

    #[tokio::test]
    async fn record_source_failure_is_passed_through() {
        let source = MemorySource::new(MockRecord::sequence(10));
        source.set_failing(true);

        let error = paginate(&request(), &source).await.unwrap_err();
        assert!(matches!(error, PaginatorError::RecordSource(_)));
        assert_eq!(error.to_string(), "Record source error: memory source is unavailable");
    }

    #[tokio::test]
    async fn limits_are_enforced() {
        let source = MemorySource::new(MockRecord::sequence(10));
        let paginator = Paginator::with_config(
            &source,
            PaginatorConfig::default().with_max_page_size(5),
        );

        let error = paginator.paginate(&request()).await.unwrap_err();
        assert!(matches!(
            error,
            PaginatorError::LimitExceeded { field: "page_size", value: 10, max: 5 }
        ));

        let error = paginator
            .paginate(&PageRequest::new(0, 5, OrderBy::asc("score")))
            .await
            .unwrap_err();
        assert!(matches!(error, PaginatorError::InvalidRequest(_)));
    }

    #[tokio::test]
    async fn first_lookup_is_reused() {
        let source = MemorySource::new(MockRecord::sequence(47));
        paginate(&request(), &source).await.unwrap();

        // Anchor lookup, page fetch and the four remaining page boundaries.
        assert_eq!(source.stats(), QueryStats { count_calls: 1, find_calls: 6 });
    }

    #[tokio::test]
    async fn lookup_concurrency_bounds_boundary_lookups() {
        let request = request().with_page(3, cursor_for(21));

        let wide = MemorySource::new(MockRecord::sequence(47));
        let expected = Paginator::new(&wide).paginate(&request).await.unwrap();
        // Page fetch plus at least two overlapping lookups.
        assert!(wide.peak_in_flight() > 2);
        assert!(wide.peak_in_flight() <= 5);

        let narrow = MemorySource::new(MockRecord::sequence(47));
        let paginator = PaginatorConfig::default()
            .with_lookup_concurrency(1)
            .build(&narrow)
            .unwrap();
        let pagination = paginator.paginate(&request).await.unwrap();

        assert_eq!(pagination, expected);
        assert_eq!(narrow.stats(), wide.stats());
        assert_eq!(narrow.stats(), QueryStats { count_calls: 1, find_calls: 6 });
        // Page fetch plus one lookup at a time.
        assert!(narrow.peak_in_flight() <= 2);
    }

    #[tokio::test]
    async fn stale_page_is_clamped() {
        let source = MemorySource::new(MockRecord::sequence(47));
        let request = request().with_page(9, cursor_for(41));

        let pagination = paginate(&request, &source).await.unwrap();
        assert_eq!(pagination.current_page, Some(5));
        assert!(pagination.cursors.next.is_none());
        assert_eq!(pagination.cursors.previous.as_ref().unwrap().page, 4);
    }

    #[tokio::test]
    async fn vanished_boundaries_are_dropped() {
        // Count claims 57 records, only 47 exist: page 6 has no first record.
        let source = MemorySource::new(MockRecord::sequence(47)).with_count_surplus(10);
        let request = request().with_page(5, cursor_for(41));

        let pagination = paginate(&request, &source).await.unwrap();
        assert_eq!(pagination.total_pages, 6);
        assert!(pagination.cursors.last.is_none());
        assert!(pagination.cursors.next.is_none());
        assert_eq!(pagination.cursors.around_pages(), vec![2, 3, 4, 5]);
    }

    #[tokio::test]
    async fn around_length_holds_for_every_page() {
        let source = MemorySource::new(MockRecord::sequence(95));

        for button_count in [1_u32, 3, 4, 7, 12] {
            for page in 1..=10_u32 {
                let cursor = cursor_for(i64::from((page - 1) * 10 + 1));
                let request = PageRequest::new(10, button_count, OrderBy::asc("score"))
                    .with_page(page, cursor);
                let pagination = paginate(&request, &source).await.unwrap();
                let around = pagination.cursors.around_pages();

                assert_eq!(around.len() as u32, button_count.min(10));
                assert!(around.contains(&u64::from(page)));
                assert_eq!(pagination.cursors.first.as_ref().unwrap().page, 1);
                assert_eq!(pagination.cursors.last.as_ref().unwrap().page, 10);
            }
        }
    }

    #[tokio::test]
    async fn text_ids_and_custom_salt() {
        let records: Vec<_> = (1..=15)
            .map(|n| MockRecord::new(format!("user-{n:02}"), format!("user {n}"), n))
            .collect();
        let source = MemorySource::new(records);
        let paginator = PaginatorConfig::default()
            .with_cursor_salt("pepper")
            .build(&source)
            .unwrap();

        let pagination = paginator.paginate(&request()).await.unwrap();
        let next = pagination.cursors.next.clone().unwrap();
        assert_eq!(
            paginator.codec().decode(&next.cursor).unwrap(),
            RecordId::from("user-11")
        );

        let pagination = paginator.paginate(&request().navigate(&next)).await.unwrap();
        let scores: Vec<_> = pagination.nodes().map(|record| record.score).collect();
        assert_eq!(scores, (11..=15).collect::<Vec<_>>());
    }
}
