//! Revision Lookup
//!
//! The two remote operations discovery depends on: resolving which revision
//! of an article was current at an instant, and fetching the rendered markup
//! of a revision. Absence of a revision is a normal outcome (`NotFound`),
//! never an error.

mod memory;
mod wiki;

pub use memory::StaticLookup;
pub use wiki::WikiClient;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Markup shown for intervals where the article did not exist yet
pub const MISSING_PAGE_MARKUP: &str = "[PAGE DOES NOT EXIST]";

/// Opaque revision identifier assigned by the wiki
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RevisionId(pub u64);

impl fmt::Display for RevisionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Result of resolving the revision current at an instant
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "id", rename_all = "snake_case")]
pub enum RevisionRef {
    Found(RevisionId),
    /// The article had no revision at or before the instant
    NotFound,
}

impl RevisionRef {
    /// Whether an interval resolving to `other` continues a run of `self`.
    ///
    /// `NotFound` is incomparable: it never continues a run and no run
    /// continues into it.
    pub fn same_revision(&self, other: &RevisionRef) -> bool {
        match (self, other) {
            (RevisionRef::Found(a), RevisionRef::Found(b)) => a == b,
            _ => false,
        }
    }

    pub fn id(&self) -> Option<RevisionId> {
        match self {
            RevisionRef::Found(id) => Some(*id),
            RevisionRef::NotFound => None,
        }
    }

    pub fn is_found(&self) -> bool {
        matches!(self, RevisionRef::Found(_))
    }
}

impl fmt::Display for RevisionRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RevisionRef::Found(id) => write!(f, "r{}", id),
            RevisionRef::NotFound => write!(f, "not-found"),
        }
    }
}

/// Failure talking to the lookup service
#[derive(Debug, thiserror::Error)]
pub enum LookupError {
    /// Non-success HTTP status, carrying the status description
    #[error("Request error: {0}")]
    Status(String),

    #[error("Transport error: {0}")]
    Transport(String),

    /// Response body did not have the expected shape
    #[error("Malformed response: {0}")]
    Protocol(String),

    /// The service answered with an error envelope
    #[error("API error {code}: {info}")]
    Api { code: String, info: String },
}

pub type LookupResult<T> = Result<T, LookupError>;

/// Source of article revisions.
///
/// Calls are awaited one at a time by the discovery engines; implementations
/// do not need to support concurrent use.
#[async_trait]
pub trait RevisionLookup: Send + Sync {
    /// Most recent revision of `title` at or before `at`
    async fn resolve_revision(&self, title: &str, at: DateTime<Utc>) -> LookupResult<RevisionRef>;

    /// Rendered markup of an existing revision
    async fn fetch_markup(&self, id: RevisionId) -> LookupResult<String>;

    /// Rendered markup for a resolved reference.
    ///
    /// `NotFound` yields [`MISSING_PAGE_MARKUP`] without touching the service.
    async fn fetch_content(&self, rev: &RevisionRef) -> LookupResult<String> {
        match rev.id() {
            Some(id) => self.fetch_markup(id).await,
            None => Ok(MISSING_PAGE_MARKUP.to_string()),
        }
    }
}
