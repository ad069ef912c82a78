//! Revision Range Discovery
//!
//! Given an article title and a `[start, end]` window cut into fixed
//! intervals, determine which revision was current at every interval boundary
//! and group consecutive boundaries into runs. Two strategies share one
//! result shape:
//! - `Linear`: one lookup per boundary, strictly in order
//! - `Tree`: binary subdivision that skips over long stable runs
//!
//! Lookups are always awaited one after another. The wiki tolerates a slow
//! serial client far better than a burst, so nothing here fans out.

pub mod linear;
pub mod tree;
pub mod trigger;

pub use linear::discover_linear;
pub use tree::{discover_tree, ProbeTree};
pub use trigger::{resolve_trigger, CallbackMode, CallbackSpec, TriggerPoint};

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use tracing::{debug, info};

use crate::lookup::{LookupError, RevisionLookup, RevisionRef};

#[derive(Debug, thiserror::Error)]
pub enum DiscoveryError {
    #[error(transparent)]
    Lookup(#[from] LookupError),

    #[error("Invalid range: {0}")]
    InvalidRange(String),

    /// The window is shorter than a single interval
    #[error("Range from {start} to {end} holds no complete interval")]
    EmptyRange {
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    },
}

/// What to discover: an article and a sampled time window
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DiscoveryRequest {
    title: String,
    start: DateTime<Utc>,
    end: DateTime<Utc>,
    interval_ms: i64,
    rev_total: usize,
}

impl DiscoveryRequest {
    pub fn new(
        title: impl Into<String>,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
        interval: Duration,
    ) -> Result<Self, DiscoveryError> {
        let interval_ms = interval.num_milliseconds();
        if interval_ms <= 0 {
            return Err(DiscoveryError::InvalidRange(format!(
                "interval must be positive, got {}ms",
                interval_ms
            )));
        }
        if end < start {
            return Err(DiscoveryError::InvalidRange(format!(
                "end {} is before start {}",
                end, start
            )));
        }

        let window_ms = (end - start).num_milliseconds();
        let rev_total = usize::try_from(window_ms / interval_ms)
            .map_err(|_| DiscoveryError::InvalidRange("window too large".into()))?;
        if rev_total == 0 {
            return Err(DiscoveryError::EmptyRange { start, end });
        }

        Ok(Self {
            title: title.into(),
            start,
            end,
            interval_ms,
            rev_total,
        })
    }

    /// Same as [`DiscoveryRequest::new`] with the interval given in seconds
    pub fn with_interval_secs(
        title: impl Into<String>,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
        interval_secs: u64,
    ) -> Result<Self, DiscoveryError> {
        let secs = i64::try_from(interval_secs)
            .map_err(|_| DiscoveryError::InvalidRange("interval too large".into()))?;
        let interval = Duration::try_seconds(secs)
            .ok_or_else(|| DiscoveryError::InvalidRange("interval too large".into()))?;
        Self::new(title, start, end, interval)
    }

    pub fn title(&self) -> &str {
        &self.title
    }

    pub fn start(&self) -> DateTime<Utc> {
        self.start
    }

    pub fn end(&self) -> DateTime<Utc> {
        self.end
    }

    pub fn interval(&self) -> Duration {
        Duration::milliseconds(self.interval_ms)
    }

    /// Number of intervals: `floor((end - start) / interval)`
    pub fn rev_total(&self) -> usize {
        self.rev_total
    }

    /// Boundary instant of interval `index`
    pub fn instant_at(&self, index: usize) -> DateTime<Utc> {
        self.start + Duration::milliseconds(self.interval_ms * index as i64)
    }
}

/// Maximal span of consecutive intervals resolving to the same revision
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RevisionRun {
    revision: RevisionRef,
    content: String,
    occurrences: Vec<DateTime<Utc>>,
}

impl RevisionRun {
    pub(crate) fn open(revision: RevisionRef, content: String, first: DateTime<Utc>) -> Self {
        Self {
            revision,
            content,
            occurrences: vec![first],
        }
    }

    pub(crate) fn covering(revision: RevisionRef, content: String, occurrences: Vec<DateTime<Utc>>) -> Self {
        debug_assert!(!occurrences.is_empty());
        Self {
            revision,
            content,
            occurrences,
        }
    }

    pub(crate) fn extend(&mut self, at: DateTime<Utc>) {
        self.occurrences.push(at);
    }

    pub fn revision(&self) -> &RevisionRef {
        &self.revision
    }

    /// Rendered markup of the revision
    pub fn content(&self) -> &str {
        &self.content
    }

    pub fn occurrences(&self) -> &[DateTime<Utc>] {
        &self.occurrences
    }

    /// Number of consecutive intervals this run covers
    pub fn span(&self) -> usize {
        self.occurrences.len()
    }
}

/// Request counters for one discovery call
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DiscoveryStats {
    pub revision_lookups: usize,
    /// Markup requests that reached the service
    pub content_fetches: usize,
}

/// Ordered runs covering every interval of a request exactly once
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DiscoveryResult {
    title: String,
    interval_ms: i64,
    rev_total: usize,
    runs: Vec<RevisionRun>,
    stats: DiscoveryStats,
}

impl DiscoveryResult {
    pub(crate) fn new(request: &DiscoveryRequest, runs: Vec<RevisionRun>, stats: DiscoveryStats) -> Self {
        debug_assert_eq!(runs.iter().map(RevisionRun::span).sum::<usize>(), request.rev_total());
        Self {
            title: request.title.clone(),
            interval_ms: request.interval_ms,
            rev_total: request.rev_total,
            runs,
            stats,
        }
    }

    pub fn title(&self) -> &str {
        &self.title
    }

    pub fn interval(&self) -> Duration {
        Duration::milliseconds(self.interval_ms)
    }

    pub fn rev_total(&self) -> usize {
        self.rev_total
    }

    pub fn runs(&self) -> &[RevisionRun] {
        &self.runs
    }

    pub fn stats(&self) -> DiscoveryStats {
        self.stats
    }

    /// Sum of run spans; equals `rev_total` for every engine result
    pub fn covered(&self) -> usize {
        self.runs.iter().map(RevisionRun::span).sum()
    }
}

/// Tree descent that produced a run boundary
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TreePath {
    pub bits: usize,
    pub depth: u32,
}

/// Snapshot handed to [`DiscoveryObserver::on_step`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DiscoveryProgress {
    /// Intervals resolved so far
    pub processed: usize,
    pub total: usize,
    /// Boundary instant of the last resolved interval
    pub instant: DateTime<Utc>,
    pub revision_lookups: usize,
    pub path: Option<TreePath>,
}

impl DiscoveryProgress {
    pub fn label(&self) -> String {
        match self.path {
            Some(path) => format!(
                "{} / {} path: {:0width$b} total reqs: {}",
                self.processed,
                self.total,
                path.bits,
                self.revision_lookups,
                width = path.depth as usize
            ),
            None => format!("{} / {}", self.processed, self.total),
        }
    }
}

/// Hooks invoked while a discovery call runs
pub trait DiscoveryObserver {
    /// Called after each linear index, or after each run closed by the tree engine
    fn on_step(&mut self, _progress: &DiscoveryProgress) {}

    /// One-shot notification at the resolved trigger index (linear only)
    fn on_trigger(&mut self) {}
}

/// Observer that ignores everything
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopObserver;

impl DiscoveryObserver for NoopObserver {}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FetchStrategy {
    #[default]
    Linear,
    Tree,
}

impl fmt::Display for FetchStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FetchStrategy::Linear => write!(f, "linear"),
            FetchStrategy::Tree => write!(f, "tree"),
        }
    }
}

impl FromStr for FetchStrategy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "linear" => Ok(FetchStrategy::Linear),
            "tree" => Ok(FetchStrategy::Tree),
            other => Err(format!("unknown fetch strategy '{}' (expected linear or tree)", other)),
        }
    }
}

/// Run discovery with the chosen strategy.
///
/// A lookup failure aborts the whole call; runs gathered so far are dropped.
pub async fn discover(
    lookup: &dyn RevisionLookup,
    request: &DiscoveryRequest,
    strategy: FetchStrategy,
    callback: CallbackSpec,
    observer: &mut dyn DiscoveryObserver,
) -> Result<DiscoveryResult, DiscoveryError> {
    info!(
        "Discovering {} revisions of '{}' ({} strategy)",
        request.rev_total(),
        request.title(),
        strategy
    );

    let result = match strategy {
        FetchStrategy::Linear => discover_linear(lookup, request, callback, observer).await?,
        FetchStrategy::Tree => {
            debug!("Tree discovery ignores callback {:?}", callback);
            discover_tree(lookup, request, observer).await?
        }
    };

    info!(
        "Discovered {} runs with {} revision lookups and {} content fetches",
        result.runs().len(),
        result.stats().revision_lookups,
        result.stats().content_fetches
    );
    Ok(result)
}

/// Fetch markup for a newly opened run, counting only real requests
pub(crate) async fn fetch_run_content(
    lookup: &dyn RevisionLookup,
    revision: &RevisionRef,
    stats: &mut DiscoveryStats,
) -> Result<String, LookupError> {
    if revision.is_found() {
        stats.content_fetches += 1;
    }
    lookup.fetch_content(revision).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn at(h: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2021, 6, 1, h, 0, 0).unwrap()
    }

    #[test]
    fn test_rev_total_floors() {
        let request = DiscoveryRequest::new("T", at(0), at(10), Duration::hours(3)).unwrap();
        assert_eq!(request.rev_total(), 3);
        assert_eq!(request.instant_at(2), at(6));
    }

    #[test]
    fn test_rejects_non_positive_interval() {
        assert!(matches!(
            DiscoveryRequest::new("T", at(0), at(10), Duration::zero()),
            Err(DiscoveryError::InvalidRange(_))
        ));
    }

    #[test]
    fn test_rejects_reversed_window() {
        assert!(matches!(
            DiscoveryRequest::new("T", at(10), at(0), Duration::hours(1)),
            Err(DiscoveryError::InvalidRange(_))
        ));
    }

    #[test]
    fn test_rejects_window_shorter_than_interval() {
        assert!(matches!(
            DiscoveryRequest::new("T", at(0), at(1), Duration::hours(2)),
            Err(DiscoveryError::EmptyRange { .. })
        ));
    }

    #[test]
    fn test_interval_secs() {
        let request = DiscoveryRequest::with_interval_secs("T", at(0), at(4), 3600).unwrap();
        assert_eq!(request.rev_total(), 4);
        assert_eq!(request.interval(), Duration::hours(1));
    }

    #[test]
    fn test_progress_labels() {
        let linear = DiscoveryProgress {
            processed: 3,
            total: 10,
            instant: at(0),
            revision_lookups: 3,
            path: None,
        };
        assert_eq!(linear.label(), "3 / 10");

        let tree = DiscoveryProgress {
            path: Some(TreePath { bits: 5, depth: 4 }),
            revision_lookups: 7,
            processed: 6,
            ..linear
        };
        assert_eq!(tree.label(), "6 / 10 path: 0101 total reqs: 7");
    }

    #[test]
    fn test_strategy_parse() {
        assert_eq!("Tree".parse::<FetchStrategy>().unwrap(), FetchStrategy::Tree);
        assert_eq!(" linear ".parse::<FetchStrategy>().unwrap(), FetchStrategy::Linear);
        assert!("bogus".parse::<FetchStrategy>().is_err());
    }
}
