//! Pagination module
//!
//! Ad Manager listings and report rows both page with an opaque
//! `nextPageToken`. The strategies here turn a response body into the
//! query parameters of the following request.

mod strategies;
mod types;

pub use strategies::PageTokenPaginator;
pub use types::{NextPage, PaginationState, Paginator};
