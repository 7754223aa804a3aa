//! Pagination results.

#[cfg(feature = "schema")]
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::cursor::Cursor;

/// A record together with the cursor pointing at it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "schema", derive(JsonSchema))]
pub struct PageEdge<T> {
    /// Cursor of the record.
    pub cursor: Cursor,
    /// The record itself.
    pub node: T,
}

impl<T> PageEdge<T> {
    /// Creates a new edge.
    #[inline]
    pub fn new(cursor: Cursor, node: T) -> Self {
        Self { cursor, node }
    }
}

/// A navigable page number and the cursor of its first record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "schema", derive(JsonSchema))]
#[serde(rename_all = "camelCase")]
pub struct PageMarker {
    /// 1-based page number.
    pub page: u64,
    /// Cursor of the first record of the page.
    pub cursor: Cursor,
    /// Whether this is the page being returned.
    pub is_current: bool,
}

/// Page markers surfaced for navigation.
///
/// Every field is `None` when no record matched.
#[derive(Debug, Default, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "schema", derive(JsonSchema))]
pub struct PageCursors {
    /// The first page.
    pub first: Option<PageMarker>,
    /// The page before the current one.
    pub previous: Option<PageMarker>,
    /// Consecutive pages around the current one.
    pub around: Option<Vec<PageMarker>>,
    /// The page after the current one.
    pub next: Option<PageMarker>,
    /// The last page.
    pub last: Option<PageMarker>,
}

impl PageCursors {
    /// Returns whether no marker is set.
    pub fn is_empty(&self) -> bool {
        self.first.is_none()
            && self.previous.is_none()
            && self.around.is_none()
            && self.next.is_none()
            && self.last.is_none()
    }

    /// Returns the page numbers of the `around` window.
    pub fn around_pages(&self) -> Vec<u64> {
        self.around
            .iter()
            .flatten()
            .map(|marker| marker.page)
            .collect()
    }
}

/// Result of a pagination call.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "schema", derive(JsonSchema))]
#[serde(rename_all = "camelCase")]
pub struct Pagination<T> {
    /// Records of the page, `None` when no record matched.
    pub edges: Option<Vec<PageEdge<T>>>,
    /// Navigation markers.
    pub cursors: PageCursors,
    /// Number of records matching the filter.
    pub total_count: u64,
    /// Number of pages.
    pub total_pages: u64,
    /// Page the edges belong to, `None` when no record matched.
    pub current_page: Option<u64>,
}

impl<T> Pagination<T> {
    /// Creates the result for a filter matching no record.
    pub fn empty() -> Self {
        Self {
            edges: None,
            cursors: PageCursors::default(),
            total_count: 0,
            total_pages: 0,
            current_page: None,
        }
    }

    /// Returns whether no record matched.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.edges.is_none()
    }

    /// Returns the records of the page.
    pub fn nodes(&self) -> impl Iterator<Item = &T> {
        self.edges.iter().flatten().map(|edge| &edge.node)
    }

    /// Maps the records to a different type, keeping their cursors.
    pub fn map<U, F>(self, mut f: F) -> Pagination<U>
    where
        F: FnMut(T) -> U,
    {
        Pagination {
            edges: self.edges.map(|edges| {
                edges
                    .into_iter()
                    .map(|edge| PageEdge::new(edge.cursor, f(edge.node)))
                    .collect()
            }),
            cursors: self.cursors,
            total_count: self.total_count,
            total_pages: self.total_pages,
            current_page: self.current_page,
        }
    }
}
