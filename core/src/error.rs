//! Error types for the vocabulary API client.
//!
//! # Design
//! `NotFound` gets a dedicated variant because detail views render a
//! "not found" state instead of a generic error. All other non-2xx responses
//! land in `Http` with the raw status code and body. `FetchError` tags an
//! `ApiError` with the resource that failed; its message is the underlying
//! error's message so views can prefix it with their own context.

use std::fmt;

use thiserror::Error;

/// Errors produced while building requests, moving them over the wire, or
/// parsing responses.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ApiError {
    /// The request never produced an HTTP response.
    #[error("{0}")]
    Network(String),

    /// The server returned 404.
    #[error("resource not found")]
    NotFound,

    /// The server returned a non-2xx status other than 404.
    #[error("HTTP {status}: {body}")]
    Http { status: u16, body: String },

    /// The response body did not match the declared shape.
    #[error("unexpected response shape: {0}")]
    Schema(String),

    /// The request payload could not be serialized.
    #[error("serialization failed: {0}")]
    Serialization(String),
}

/// The resources the front end reads and writes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Resource {
    Groups,
    GroupDetails,
    GroupWords,
    GroupStudySessions,
    StudySessions,
    Words,
    WordDetails,
    StudyStats,
    RecentStudySession,
    CreateStudySession,
    StudySessionReview,
}

impl Resource {
    /// Stable name used as the first component of a query key.
    pub fn as_str(&self) -> &'static str {
        match self {
            Resource::Groups => "groups",
            Resource::GroupDetails => "group",
            Resource::GroupWords => "group-words",
            Resource::GroupStudySessions => "group-study-sessions",
            Resource::StudySessions => "study-sessions",
            Resource::Words => "words",
            Resource::WordDetails => "word",
            Resource::StudyStats => "study-stats",
            Resource::RecentStudySession => "recent-study-session",
            Resource::CreateStudySession => "create-study-session",
            Resource::StudySessionReview => "study-session-review",
        }
    }
}

impl fmt::Display for Resource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A failed resource fetch.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{source}")]
pub struct FetchError {
    pub resource: Resource,
    pub source: ApiError,
}

impl FetchError {
    pub fn new(resource: Resource, source: ApiError) -> Self {
        Self { resource, source }
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self.source, ApiError::NotFound)
    }
}
