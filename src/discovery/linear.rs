//! Linear Discovery
//!
//! Resolves every interval boundary in order and coalesces consecutive
//! boundaries on the same revision into a run.

use tracing::debug;

use super::trigger::resolve_trigger;
use super::{
    fetch_run_content, CallbackSpec, DiscoveryError, DiscoveryObserver, DiscoveryProgress,
    DiscoveryRequest, DiscoveryResult, DiscoveryStats, RevisionRun,
};
use crate::lookup::RevisionLookup;

/// Walk every boundary of `request`, one lookup at a time.
///
/// `observer.on_trigger` fires exactly once: before the first lookup when the
/// callback asks for it, when the loop reaches the trigger index, or after the
/// loop if the index was never reached.
pub async fn discover_linear(
    lookup: &dyn RevisionLookup,
    request: &DiscoveryRequest,
    callback: CallbackSpec,
    observer: &mut dyn DiscoveryObserver,
) -> Result<DiscoveryResult, DiscoveryError> {
    let total = request.rev_total();
    let trigger = resolve_trigger(callback, total);
    debug!("Linear discovery trigger resolved to {:?}", trigger);
    if trigger.out_of_range(total) {
        debug!(
            "Trigger index {} is outside 0..{}, firing after the last lookup",
            trigger.index, total
        );
    }

    let mut fired = false;
    if trigger.immediate {
        observer.on_trigger();
        fired = true;
    }

    let mut stats = DiscoveryStats::default();
    let mut runs: Vec<RevisionRun> = Vec::new();
    let mut current: Option<RevisionRun> = None;

    for index in 0..total {
        if !fired && trigger.fires_at(index) {
            observer.on_trigger();
            fired = true;
        }

        let at = request.instant_at(index);
        let revision = lookup.resolve_revision(request.title(), at).await?;
        stats.revision_lookups += 1;

        match current.as_mut() {
            Some(run) if run.revision().same_revision(&revision) => run.extend(at),
            _ => {
                let content = fetch_run_content(lookup, &revision, &mut stats).await?;
                let opened = RevisionRun::open(revision, content, at);
                if let Some(closed) = current.replace(opened) {
                    debug!("Closed run {} spanning {} intervals", closed.revision(), closed.span());
                    runs.push(closed);
                }
            }
        }

        observer.on_step(&DiscoveryProgress {
            processed: index + 1,
            total,
            instant: at,
            revision_lookups: stats.revision_lookups,
            path: None,
        });
    }

    if let Some(last) = current {
        runs.push(last);
    }
    if !fired {
        observer.on_trigger();
    }

    Ok(DiscoveryResult::new(request, runs, stats))
}
