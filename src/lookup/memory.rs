//! In-memory revision source
//!
//! A fixed revision history that answers lookups deterministically. Used to
//! exercise discovery without a network and to count the requests each
//! strategy issues.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};

use super::{LookupError, LookupResult, RevisionId, RevisionLookup, RevisionRef};

#[derive(Debug, Clone)]
struct HistoryEntry {
    from: DateTime<Utc>,
    revision: Option<RevisionId>,
}

/// Deterministic revision history for a single article
#[derive(Debug, Default)]
pub struct StaticLookup {
    /// Sorted by `from`
    history: Vec<HistoryEntry>,
    markup: HashMap<RevisionId, String>,
    fail_after: Option<usize>,
    revision_lookups: AtomicUsize,
    content_fetches: AtomicUsize,
}

impl StaticLookup {
    pub fn new() -> Self {
        Self::default()
    }

    /// Revision `id` becomes current at `from`
    pub fn with_revision(mut self, from: DateTime<Utc>, id: u64, markup: impl Into<String>) -> Self {
        let id = RevisionId(id);
        self.markup.insert(id, markup.into());
        self.insert(HistoryEntry { from, revision: Some(id) });
        self
    }

    /// The article stops existing at `from` until the next revision
    pub fn with_deletion(mut self, from: DateTime<Utc>) -> Self {
        self.insert(HistoryEntry { from, revision: None });
        self
    }

    /// Fail every revision lookup after the first `count`
    pub fn failing_after(mut self, count: usize) -> Self {
        self.fail_after = Some(count);
        self
    }

    fn insert(&mut self, entry: HistoryEntry) {
        let pos = self.history.partition_point(|e| e.from <= entry.from);
        self.history.insert(pos, entry);
    }

    pub fn revision_lookups(&self) -> usize {
        self.revision_lookups.load(Ordering::SeqCst)
    }

    pub fn content_fetches(&self) -> usize {
        self.content_fetches.load(Ordering::SeqCst)
    }

    /// Revision current at `at`, without counting a lookup
    pub fn revision_at(&self, at: DateTime<Utc>) -> RevisionRef {
        let pos = self.history.partition_point(|e| e.from <= at);
        match pos.checked_sub(1).and_then(|i| self.history[i].revision) {
            Some(id) => RevisionRef::Found(id),
            None => RevisionRef::NotFound,
        }
    }
}

#[async_trait]
impl RevisionLookup for StaticLookup {
    async fn resolve_revision(&self, _title: &str, at: DateTime<Utc>) -> LookupResult<RevisionRef> {
        let issued = self.revision_lookups.fetch_add(1, Ordering::SeqCst);
        if self.fail_after.is_some_and(|limit| issued >= limit) {
            return Err(LookupError::Status("503 Service Unavailable".into()));
        }
        Ok(self.revision_at(at))
    }

    async fn fetch_markup(&self, id: RevisionId) -> LookupResult<String> {
        self.content_fetches.fetch_add(1, Ordering::SeqCst);
        self.markup
            .get(&id)
            .cloned()
            .ok_or_else(|| LookupError::Api {
                code: "nosuchrevid".into(),
                info: format!("There is no revision with ID {}.", id),
            })
    }
}
