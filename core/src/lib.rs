//! Data-access and view-state core for the vocabulary front end.
//!
//! # Overview
//! Builds `HttpRequest` values and parses `HttpResponse` values without
//! touching the network (host-does-IO pattern); a `Transport` executes the
//! round-trip. On top of that sit typed async fetchers, the sort/paginate
//! state of list views, and a keyed query cache that coalesces requests and
//! serves stale data while revalidating.
//!
//! # Design
//! - `VocabClient` is stateless: it holds only `base_url`.
//! - Every endpoint is split into `build_*` and `parse_*`, so the I/O boundary
//!   is explicit and response shapes are checked in one place.
//! - `QueryCache` owns all response data; views hold a `QueryObserver` and
//!   never mutate cache entries.
//! - DTOs are defined independently from the mock-server crate; integration
//!   tests catch schema drift.

pub mod api;
pub mod client;
pub mod config;
pub mod error;
pub mod http;
pub mod list_state;
pub mod queries;
pub mod query_cache;
pub mod routes;
pub mod transport;
pub mod types;
pub mod views;

pub use api::VocabApi;
pub use client::VocabClient;
pub use config::Config;
pub use error::{ApiError, FetchError, Resource};
pub use http::{HttpMethod, HttpRequest, HttpResponse};
pub use list_state::ListQueryState;
pub use queries::Queries;
pub use query_cache::{QueryCache, QueryKey, QueryObserver, QueryState, QueryStatus};
pub use routes::Route;
pub use transport::{ReqwestTransport, Transport};
pub use types::{
    Group, GroupDetails, GroupSortKey, GroupWordSortKey, ListParams, Page, RecentSession,
    SortKey, SortOrder, StudySession, StudySessionSortKey, StudyStats, Word, WordGroup,
    WordReview, WordSortKey,
};
