//! Pagination request parameters.

#[cfg(feature = "schema")]
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use validator::Validate;

use super::{Filter, OrderBy, PageMarker};
use crate::cursor::Cursor;

/// Parameters of a single pagination call.
///
/// `current_page` and `cursor` must be supplied together or not at all:
/// omitting both requests the first page, supplying both resumes at the
/// page the cursor was issued for.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate)]
#[cfg_attr(feature = "schema", derive(JsonSchema))]
#[serde(rename_all = "camelCase")]
pub struct PageRequest {
    /// 1-based number of the page the cursor belongs to.
    #[validate(range(min = 1))]
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub current_page: Option<u32>,

    /// Cursor of the first record of the requested page.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cursor: Option<Cursor>,

    /// Maximum number of records per page.
    #[validate(range(min = 1, max = 1000))]
    pub page_size: u32,

    /// Number of page buttons surfaced around the current page.
    #[validate(range(min = 1, max = 100))]
    pub button_count: u32,

    /// Field and direction the records are ordered by.
    #[validate(nested)]
    pub order_by: OrderBy,

    /// Predicate records must satisfy.
    #[serde(default)]
    pub filter: Filter,
}

impl PageRequest {
    /// Default number of records per page.
    pub const DEFAULT_PAGE_SIZE: u32 = 10;
    /// Default number of page buttons.
    pub const DEFAULT_BUTTON_COUNT: u32 = 5;

    /// Creates a request for the first page.
    pub fn new(page_size: u32, button_count: u32, order_by: OrderBy) -> Self {
        Self {
            current_page: None,
            cursor: None,
            page_size,
            button_count,
            order_by,
            filter: Filter::default(),
        }
    }

    /// Sets the filter.
    #[inline]
    pub fn with_filter(mut self, filter: Filter) -> Self {
        self.filter = filter;
        self
    }

    /// Resumes at the given page and cursor.
    #[inline]
    pub fn with_page(mut self, current_page: u32, cursor: impl Into<Cursor>) -> Self {
        self.current_page = Some(current_page);
        self.cursor = Some(cursor.into());
        self
    }

    /// Returns a request for the page a marker points at.
    ///
    /// Markers carry 64-bit page numbers; pages beyond `u32::MAX` saturate.
    pub fn navigate(&self, marker: &PageMarker) -> Self {
        let page = u32::try_from(marker.page).unwrap_or(u32::MAX);
        self.clone().with_page(page, marker.cursor.clone())
    }

    /// Returns whether the request asks for the first page without a cursor.
    #[inline]
    pub fn is_initial(&self) -> bool {
        self.current_page.is_none() && self.cursor.is_none()
    }

    /// Returns whether exactly one of the current page and the cursor is set.
    #[inline]
    pub fn is_mismatched(&self) -> bool {
        self.current_page.is_some() != self.cursor.is_some()
    }
}

impl Default for PageRequest {
    fn default() -> Self {
        Self::new(
            Self::DEFAULT_PAGE_SIZE,
            Self::DEFAULT_BUTTON_COUNT,
            OrderBy::default(),
        )
    }
}
