//! Tree Discovery
//!
//! Treats the intervals as the leaves of a complete binary tree and binary
//! searches for the end of each run instead of visiting every boundary.
//! Every internal node owns one midpoint (the first leaf of its right
//! subtree) and caches the revision found there the first time a descent
//! needs it, so later descents through the same node are free.
//!
//! Assumes a revision is current over one contiguous stretch of time, which
//! holds for wiki histories since revision ids only move forward.

use chrono::{DateTime, Utc};
use tracing::debug;

use super::{
    fetch_run_content, DiscoveryError, DiscoveryObserver, DiscoveryProgress, DiscoveryRequest,
    DiscoveryResult, DiscoveryStats, RevisionRun, TreePath,
};
use crate::lookup::{LookupResult, RevisionLookup, RevisionRef};

/// Lazily resolved midpoint of an internal node
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NodeProbe {
    pub instant: DateTime<Utc>,
    pub revision: RevisionRef,
}

/// Arena of internal nodes in heap order.
///
/// Node 1 is the root and node `n` has children `2n` and `2n + 1`, so the
/// path from the root to a leaf spells out the leaf index bit by bit,
/// most significant first. Leaves carry nothing and are not stored.
#[derive(Debug, Clone)]
pub struct ProbeTree {
    depth: u32,
    leaves: usize,
    nodes: Vec<Option<NodeProbe>>,
}

impl ProbeTree {
    /// Shape a tree for `leaves` intervals; no lookups happen here
    pub fn new(leaves: usize) -> Self {
        let depth = tree_depth(leaves);
        Self {
            depth,
            leaves,
            nodes: vec![None; 1usize << depth],
        }
    }

    /// `ceil(log2(leaves))`, zero for a single leaf
    pub fn depth(&self) -> u32 {
        self.depth
    }

    pub fn leaves(&self) -> usize {
        self.leaves
    }

    /// Internal nodes whose midpoint has been resolved
    pub fn probed_nodes(&self) -> usize {
        self.nodes.iter().filter(|n| n.is_some()).count()
    }

    #[cfg(test)]
    pub(crate) fn probe(&self, node: usize) -> Option<&NodeProbe> {
        self.nodes.get(node).and_then(Option::as_ref)
    }

    /// Last interval index, inclusive, still on the revision found at `index`.
    ///
    /// At each level the descent moves into the right half when its first
    /// leaf is at or before `index`, or when that leaf resolves to the same
    /// revision; otherwise it stays left. Right halves past the last leaf do
    /// not exist and are never probed.
    pub async fn find_run_end(
        &mut self,
        lookup: &dyn RevisionLookup,
        request: &DiscoveryRequest,
        index: usize,
        revision: &RevisionRef,
        stats: &mut DiscoveryStats,
    ) -> LookupResult<usize> {
        let mut node = 1usize;
        let mut bits = 0usize;

        for level in (0..self.depth).rev() {
            let midpoint = bits | (1usize << level);

            let go_right = if midpoint >= self.leaves {
                false
            } else if midpoint <= index {
                true
            } else {
                let probe = match self.nodes[node] {
                    Some(probe) => probe,
                    None => {
                        let instant = request.instant_at(midpoint);
                        let probed = lookup.resolve_revision(request.title(), instant).await?;
                        stats.revision_lookups += 1;
                        let probe = NodeProbe {
                            instant,
                            revision: probed,
                        };
                        self.nodes[node] = Some(probe);
                        probe
                    }
                };
                revision.same_revision(&probe.revision)
            };

            if go_right {
                bits = midpoint;
                node = node * 2 + 1;
            } else {
                node *= 2;
            }
        }

        Ok(bits)
    }
}

fn tree_depth(leaves: usize) -> u32 {
    if leaves <= 1 {
        0
    } else {
        usize::BITS - (leaves - 1).leading_zeros()
    }
}

/// Discover runs by binary subdivision.
///
/// Each round resolves the first uncovered interval, searches the tree for
/// where its revision ends, and closes a run over that stretch with a single
/// content fetch. Progress is reported once per run. There is no trigger:
/// run ends are found out of chronological order.
pub async fn discover_tree(
    lookup: &dyn RevisionLookup,
    request: &DiscoveryRequest,
    observer: &mut dyn DiscoveryObserver,
) -> Result<DiscoveryResult, DiscoveryError> {
    let total = request.rev_total();
    let mut tree = ProbeTree::new(total);
    debug!("Tree discovery over {} intervals, depth {}", tree.leaves(), tree.depth());

    let mut stats = DiscoveryStats::default();
    let mut runs = Vec::new();
    let mut index = 0usize;

    while index < total {
        let at = request.instant_at(index);
        let revision = lookup.resolve_revision(request.title(), at).await?;
        stats.revision_lookups += 1;

        let end = tree
            .find_run_end(lookup, request, index, &revision, &mut stats)
            .await?;

        let content = fetch_run_content(lookup, &revision, &mut stats).await?;
        let occurrences = (index..=end).map(|i| request.instant_at(i)).collect();
        let run = RevisionRun::covering(revision, content, occurrences);
        debug!("Closed run {} over [{}, {}]", run.revision(), index, end);
        runs.push(run);

        index = end + 1;
        observer.on_step(&DiscoveryProgress {
            processed: index,
            total,
            instant: request.instant_at(end),
            revision_lookups: stats.revision_lookups,
            path: Some(TreePath {
                bits: end,
                depth: tree.depth(),
            }),
        });
    }

    debug!(
        "Tree discovery closed {} runs with {} cached midpoints",
        runs.len(),
        tree.probed_nodes()
    );
    Ok(DiscoveryResult::new(request, runs, stats))
}
