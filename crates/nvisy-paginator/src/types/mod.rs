//! Request, response, filtering and sorting types.

mod filtering;
mod request;
mod response;
mod sorting;

pub use filtering::{Condition, Filter, FilterError, FilterOp, compare_json, lookup_field};
pub use request::PageRequest;
pub use response::{PageCursors, PageEdge, PageMarker, Pagination};
pub use sorting::{OrderBy, SortOrder};
