#![forbid(unsafe_code)]
#![cfg_attr(docsrs, feature(doc_cfg))]
#![doc = include_str!("../README.md")]

// Tracing target constants for consistent logging.

/// Tracing target for pagination orchestration.
///
/// Use this target for logging counts, anchor resolution, and page window construction.
pub const TRACING_TARGET_PAGINATOR: &str = "nvisy_paginator::paginator";

/// Tracing target for cursor encoding and decoding.
pub const TRACING_TARGET_CURSOR: &str = "nvisy_paginator::cursor";

/// Tracing target for record source queries.
///
/// Use this target for logging queries issued against a [`RecordSource`].
pub const TRACING_TARGET_SOURCE: &str = "nvisy_paginator::source";

mod config;
mod cursor;
mod error;
mod paginator;
mod source;
pub mod types;
mod window;

#[cfg(any(test, feature = "test-utils"))]
#[cfg_attr(docsrs, doc(cfg(feature = "test-utils")))]
pub mod mock;

pub use crate::config::PaginatorConfig;
pub use crate::cursor::{Cursor, CursorCodec, CursorError, DEFAULT_SALT, RecordId};
pub use crate::error::{BoxedError, PaginatorError, PaginatorResult};
pub use crate::paginator::{Paginator, paginate};
pub use crate::source::{FindQuery, Record, RecordSource};
pub use crate::window::PageWindow;

pub mod prelude {
    //! Re-exports the most commonly used types and traits.
    //!
    //! ```rust,ignore
    //! use nvisy_paginator::prelude::*;
    //! ```

    pub use crate::types::{
        Filter, OrderBy, PageCursors, PageEdge, PageMarker, PageRequest, Pagination, SortOrder,
    };
    pub use crate::{
        Cursor, CursorCodec, Paginator, PaginatorConfig, PaginatorError, PaginatorResult, Record,
        RecordId, RecordSource, paginate,
    };
}
