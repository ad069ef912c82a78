//! Linear and tree discovery must agree.
//!
//! Tree discovery is only a cheaper way of computing the linear result, so
//! every history is run through both engines and the runs compared.

use chrono::{DateTime, Duration, TimeZone, Utc};
use proptest::prelude::*;
use proptest::test_runner::Config;

use wiki_timelapse::discovery::{
    discover, discover_linear, discover_tree, CallbackSpec, DiscoveryObserver, DiscoveryProgress,
    DiscoveryRequest, DiscoveryResult, FetchStrategy, NoopObserver,
};
use wiki_timelapse::lookup::{RevisionId, RevisionRef, StaticLookup};

fn origin() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2005, 1, 1, 0, 0, 0).unwrap()
}

/// A history made of consecutive segments, each either a fresh revision or
/// a stretch where the page does not exist
fn build_history(start: DateTime<Utc>, interval: Duration, segments: &[(usize, bool)], jitter: Duration) -> (StaticLookup, usize) {
    let mut lookup = StaticLookup::new();
    let mut offset = 0usize;
    for (i, (len, missing)) in segments.iter().enumerate() {
        let from = start + interval * offset as i32 - jitter;
        lookup = if *missing {
            lookup.with_deletion(from)
        } else {
            lookup.with_revision(from, (i + 1) as u64, format!("<p>revision {}</p>", i + 1))
        };
        offset += len;
    }
    (lookup, offset)
}

async fn both(lookup: &StaticLookup, request: &DiscoveryRequest) -> (DiscoveryResult, DiscoveryResult) {
    let linear = discover_linear(lookup, request, CallbackSpec::default(), &mut NoopObserver)
        .await
        .unwrap();
    let tree = discover_tree(lookup, request, &mut NoopObserver).await.unwrap();
    (linear, tree)
}

fn assert_well_formed(result: &DiscoveryResult, request: &DiscoveryRequest) {
    assert_eq!(result.covered(), request.rev_total());
    let instants: Vec<DateTime<Utc>> = result
        .runs()
        .iter()
        .flat_map(|run| run.occurrences().iter().copied())
        .collect();
    let expected: Vec<DateTime<Utc>> = (0..request.rev_total()).map(|i| request.instant_at(i)).collect();
    assert_eq!(instants, expected);
    assert!(result.runs().iter().all(|run| run.span() >= 1));
}

#[tokio::test]
async fn slowly_edited_article_needs_fewer_tree_lookups() {
    let start = origin();
    let interval = Duration::days(1);
    let (lookup, total) = build_history(
        start,
        interval,
        &[(40, false), (120, false), (3, false), (200, false)],
        Duration::zero(),
    );
    let request = DiscoveryRequest::new("UVB-76", start, start + interval * total as i32, interval).unwrap();
    let (linear, tree) = both(&lookup, &request).await;

    assert_eq!(linear.runs(), tree.runs());
    assert_eq!(tree.runs().len(), 4);
    assert_eq!(linear.stats().revision_lookups, total);
    assert!(tree.stats().revision_lookups < total / 4);
    assert_eq!(linear.stats().content_fetches, tree.stats().content_fetches);
}

#[tokio::test]
async fn adjacent_not_found_intervals_never_coalesce() {
    let start = origin();
    let interval = Duration::hours(6);
    let (lookup, total) = build_history(start, interval, &[(4, true), (3, false)], Duration::zero());
    let request = DiscoveryRequest::new("Stub", start, start + interval * total as i32, interval).unwrap();
    let (linear, tree) = both(&lookup, &request).await;

    assert_eq!(linear.runs(), tree.runs());
    let shape: Vec<(RevisionRef, usize)> = linear.runs().iter().map(|r| (*r.revision(), r.span())).collect();
    assert_eq!(
        shape,
        vec![
            (RevisionRef::NotFound, 1),
            (RevisionRef::NotFound, 1),
            (RevisionRef::NotFound, 1),
            (RevisionRef::NotFound, 1),
            (RevisionRef::Found(RevisionId(2)), 3),
        ]
    );
}

#[tokio::test]
async fn deletion_in_the_middle_splits_runs() {
    let start = origin();
    let interval = Duration::days(7);
    let (lookup, total) = build_history(start, interval, &[(5, false), (2, true), (6, false)], Duration::hours(3));
    let request = DiscoveryRequest::new("Gone", start, start + interval * total as i32, interval).unwrap();
    let (linear, tree) = both(&lookup, &request).await;

    assert_eq!(linear.runs(), tree.runs());
    let spans: Vec<usize> = tree.runs().iter().map(|r| r.span()).collect();
    assert_eq!(spans, vec![5, 1, 1, 6]);
}

#[tokio::test]
async fn dispatcher_tree_mode_never_triggers() {
    #[derive(Default)]
    struct Counts {
        steps: usize,
        triggers: usize,
    }
    impl DiscoveryObserver for Counts {
        fn on_step(&mut self, _progress: &DiscoveryProgress) {
            self.steps += 1;
        }
        fn on_trigger(&mut self) {
            self.triggers += 1;
        }
    }

    let start = origin();
    let interval = Duration::days(1);
    let (lookup, total) = build_history(start, interval, &[(10, false), (6, false)], Duration::zero());
    let request = DiscoveryRequest::new("T", start, start + interval * total as i32, interval).unwrap();

    let mut linear = Counts::default();
    discover(&lookup, &request, FetchStrategy::Linear, CallbackSpec::Fraction(0.5), &mut linear)
        .await
        .unwrap();
    assert_eq!((linear.steps, linear.triggers), (16, 1));

    let mut tree = Counts::default();
    discover(&lookup, &request, FetchStrategy::Tree, CallbackSpec::Fraction(0.5), &mut tree)
        .await
        .unwrap();
    assert_eq!((tree.steps, tree.triggers), (2, 0));
}

fn segments() -> impl Strategy<Value = Vec<(usize, bool)>> {
    prop::collection::vec((1usize..12, prop::bool::weighted(0.2)), 1..10)
}

proptest! {
    #![proptest_config(Config {
        cases: 64,
        max_shrink_iters: 500,
        ..Config::default()
    })]

    /// Both engines cover every interval once, in order, with identical runs
    #[test]
    fn prop_tree_matches_linear(
        segments in segments(),
        interval_hours in prop::sample::select(vec![1i64, 6, 24, 24 * 7]),
        jitter_fraction in 0.0..1.0f64,
        trailing in 0usize..3,
    ) {
        let start = origin();
        let interval = Duration::hours(interval_hours);
        let jitter = Duration::seconds((interval.num_seconds() as f64 * jitter_fraction) as i64);
        let (lookup, total) = build_history(start, interval, &segments, jitter);
        // a partial trailing interval is dropped by the floor
        let end = start + interval * total as i32 + Duration::minutes(trailing as i64 * 10);
        let request = DiscoveryRequest::new("Prop", start, end, interval).unwrap();

        let (linear, tree) = tokio_test::block_on(both(&lookup, &request));

        assert_well_formed(&linear, &request);
        assert_well_formed(&tree, &request);
        prop_assert_eq!(linear.runs(), tree.runs());
        prop_assert!(tree.stats().content_fetches == linear.stats().content_fetches);
    }

    /// Every interval resolves to the revision the history says was current
    #[test]
    fn prop_runs_reflect_history(segments in segments()) {
        let start = origin();
        let interval = Duration::days(1);
        let (lookup, total) = build_history(start, interval, &segments, Duration::zero());
        let request = DiscoveryRequest::new("Prop", start, start + interval * total as i32, interval).unwrap();

        let result = tokio_test::block_on(
            discover_tree(&lookup, &request, &mut NoopObserver)
        ).unwrap();

        for run in result.runs() {
            for at in run.occurrences() {
                prop_assert_eq!(lookup.revision_at(*at), *run.revision());
            }
        }
    }
}
