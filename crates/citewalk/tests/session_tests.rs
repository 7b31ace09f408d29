//! Session/queue controller tests.

use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use citewalk::client::MetadataFetcher;
use citewalk::config::EngineConfig;
use citewalk::error::{FetchError, FetchResult};
use citewalk::events::NullSink;
use citewalk::models::{Doi, RawRecord};
use citewalk::session::{DoiState, Session};

// =============================================================================
// Test doubles and builders
// =============================================================================

#[derive(Default)]
struct MapFetcher {
    records: HashMap<String, RawRecord>,
    systemic: AtomicBool,
}

impl MapFetcher {
    fn with_records(records: &[RawRecord]) -> Self {
        Self {
            records: records
                .iter()
                .map(|r| (r.doi.clone().unwrap_or_default().to_lowercase(), r.clone()))
                .collect(),
            systemic: AtomicBool::new(false),
        }
    }

    fn set_systemic(&self, value: bool) {
        self.systemic.store(value, Ordering::SeqCst);
    }
}

#[async_trait::async_trait]
impl MetadataFetcher for MapFetcher {
    async fn hydrate(&self, doi: &Doi) -> FetchResult<RawRecord> {
        if self.systemic.load(Ordering::SeqCst) {
            return Err(FetchError::server(503, "catalog down"));
        }
        self.records
            .get(doi.as_str())
            .cloned()
            .ok_or_else(|| FetchError::not_found(doi.as_str()))
    }
}

fn record(doi: &str, title: &str, year: Option<i32>, references: &[&str]) -> RawRecord {
    RawRecord {
        doi: Some(doi.to_string()),
        title: Some(title.to_string()),
        authors: vec!["Session Tester".to_string()],
        year,
        reference_dois: references.iter().map(ToString::to_string).collect(),
        ..RawRecord::default()
    }
}

fn session_over(fetcher: Arc<MapFetcher>) -> Session {
    let config = EngineConfig::for_testing("http://unused.invalid");
    Session::new(fetcher, &config, Arc::new(NullSink))
}

fn doi(raw: &str) -> Doi {
    Doi::parse(raw).unwrap()
}

// =============================================================================
// addPublicationsToSelection robustness contract
// =============================================================================

#[tokio::test]
async fn test_add_drops_malformed_entries_silently() {
    let fetcher = Arc::new(MapFetcher::default());
    let mut session = session_over(fetcher);

    session
        .add_publications_to_selection(&[
            None,
            Some("10.1/a"),
            None,
            Some(""),
            Some("  "),
            Some("10.1/b"),
        ])
        .await;

    let selected: Vec<&str> = session.selected_dois().iter().map(Doi::as_str).collect();
    assert_eq!(selected, vec!["10.1/a", "10.1/b"]);
}

#[tokio::test]
async fn test_add_is_idempotent_and_order_preserving() {
    let fetcher = Arc::new(MapFetcher::default());
    let mut session = session_over(fetcher);

    session.add_publications_to_selection(&[Some("10.1/a"), Some("10.1/b")]).await;
    session.add_publications_to_selection(&[Some("10.1/B"), Some("10.1/c")]).await;

    let selected: Vec<&str> = session.selected_dois().iter().map(Doi::as_str).collect();
    assert_eq!(selected, vec!["10.1/a", "10.1/b", "10.1/c"]);
}

#[tokio::test]
async fn test_add_hydrates_known_records_and_keeps_stubs_for_unknown() {
    let fetcher =
        Arc::new(MapFetcher::with_records(&[record("10.1/known", "Known Work", Some(2020), &[])]));
    let mut session = session_over(fetcher);

    session.add_publications_to_selection(&[Some("10.1/known"), Some("10.1/ghost")]).await;

    let publications = session.selected_publications();
    assert_eq!(publications.len(), 2);
    assert!(publications[0].was_fetched);
    assert_eq!(publications[0].title.as_deref(), Some("Known Work"));
    // Hydration failure leaves a stub entry, not a hole.
    assert!(!publications[1].was_fetched);
}

#[tokio::test]
async fn test_excluded_wins_over_new_selection() {
    let fetcher = Arc::new(MapFetcher::default());
    let mut session = session_over(fetcher);

    session.queue_for_exclusion(doi("10.1/x"));
    session.apply_queues().await;
    assert_eq!(session.state(&doi("10.1/x")), DoiState::Excluded);

    session.add_publications_to_selection(&[Some("10.1/x")]).await;

    assert_eq!(session.state(&doi("10.1/x")), DoiState::Excluded);
    assert!(session.selected_dois().is_empty());
}

// =============================================================================
// Queue state machine
// =============================================================================

#[tokio::test]
async fn test_queues_are_mutually_exclusive() {
    let fetcher = Arc::new(MapFetcher::default());
    let mut session = session_over(fetcher);
    let x = doi("10.1/x");

    session.queue_for_selection(x.clone());
    assert_eq!(session.state(&x), DoiState::QueuedForSelection);

    session.queue_for_exclusion(x.clone());
    assert_eq!(session.state(&x), DoiState::QueuedForExclusion);

    session.queue_for_selection(x.clone());
    assert_eq!(session.state(&x), DoiState::QueuedForSelection);
}

#[tokio::test]
async fn test_remove_from_queues_and_clear() {
    let fetcher = Arc::new(MapFetcher::default());
    let mut session = session_over(fetcher);

    session.add_publications_to_selection(&[Some("10.1/kept")]).await;
    session.queue_for_selection(doi("10.1/a"));
    session.queue_for_exclusion(doi("10.1/b"));

    session.remove_from_queues(&doi("10.1/a"));
    assert_eq!(session.state(&doi("10.1/a")), DoiState::Unqueued);
    // Removing an absent DOI is a no-op.
    session.remove_from_queues(&doi("10.1/a"));

    session.clear_queues();
    assert_eq!(session.state(&doi("10.1/b")), DoiState::Unqueued);
    // Selected set untouched by queue operations.
    assert_eq!(session.state(&doi("10.1/kept")), DoiState::Selected);
}

#[tokio::test]
async fn test_apply_queues_drains_whole_batch() {
    let fetcher = Arc::new(MapFetcher::with_records(&[
        record("10.1/sel1", "S1", Some(2020), &[]),
        record("10.1/sel2", "S2", Some(2021), &[]),
    ]));
    let mut session = session_over(fetcher);

    session.queue_for_selection(doi("10.1/sel1"));
    session.queue_for_selection(doi("10.1/sel2"));
    session.queue_for_exclusion(doi("10.1/bad"));
    session.apply_queues().await;

    assert_eq!(session.state(&doi("10.1/sel1")), DoiState::Selected);
    assert_eq!(session.state(&doi("10.1/sel2")), DoiState::Selected);
    assert_eq!(session.state(&doi("10.1/bad")), DoiState::Excluded);
    assert_eq!(session.excluded_dois(), vec![doi("10.1/bad")]);
    // Queues are empty afterwards.
    session.clear_queues();
    assert_eq!(session.selected_dois().len(), 2);
}

#[tokio::test]
async fn test_unselect_and_unexclude_return_to_neutral() {
    let fetcher = Arc::new(MapFetcher::default());
    let mut session = session_over(fetcher);

    session.add_publications_to_selection(&[Some("10.1/a")]).await;
    session.queue_for_exclusion(doi("10.1/b"));
    session.apply_queues().await;

    session.unselect(&doi("10.1/a")).await;
    assert_eq!(session.state(&doi("10.1/a")), DoiState::Unqueued);
    assert!(session.selected_dois().is_empty());
    assert!(session.selected_publications().is_empty());

    session.unexclude(&doi("10.1/b")).await;
    assert_eq!(session.state(&doi("10.1/b")), DoiState::Unqueued);
    assert!(session.excluded_dois().is_empty());
}

// =============================================================================
// Suggestions through the session
// =============================================================================

#[tokio::test]
async fn test_suggestions_follow_selection_and_respect_exclusion() {
    let fetcher = Arc::new(MapFetcher::with_records(&[
        record("10.1/seed", "Seed", Some(2019), &["10.1/f1", "10.1/f2"]),
        record("10.1/f1", "Frontier One", Some(2020), &[]),
        record("10.1/f2", "Frontier Two", Some(2021), &[]),
    ]));
    let mut session = session_over(fetcher);

    session.add_publications_to_selection(&[Some("10.1/seed")]).await;
    let suggested: Vec<&str> = session.suggestions().iter().map(|s| s.doi().as_str()).collect();
    assert_eq!(suggested.len(), 2);
    assert!(suggested.contains(&"10.1/f1"));
    assert!(suggested.contains(&"10.1/f2"));

    // Excluding one frontier member removes it from the next aggregation.
    session.queue_for_exclusion(doi("10.1/f1"));
    session.apply_queues().await;
    let suggested: Vec<&str> = session.suggestions().iter().map(|s| s.doi().as_str()).collect();
    assert_eq!(suggested, vec!["10.1/f2"]);
}

#[tokio::test]
async fn test_aggregation_failure_preserves_stale_list() {
    let fetcher = Arc::new(MapFetcher::with_records(&[
        record("10.1/seed", "Seed", Some(2019), &["10.1/f1"]),
        record("10.1/f1", "Frontier", Some(2020), &[]),
    ]));
    let mut session = session_over(Arc::clone(&fetcher));

    session.add_publications_to_selection(&[Some("10.1/seed")]).await;
    assert_eq!(session.suggestions().len(), 1);

    // Catalog goes down; the recompute fails and the old list survives.
    fetcher.set_systemic(true);
    session.recompute_suggestions().await;
    assert_eq!(session.suggestions().len(), 1);
    assert_eq!(session.suggestions()[0].doi(), &doi("10.1/f1"));
}

#[tokio::test]
async fn test_mutation_storm_settles_on_final_state() {
    let fetcher = Arc::new(MapFetcher::with_records(&[
        record("10.1/s1", "S1", Some(2019), &["10.1/f1"]),
        record("10.1/s2", "S2", Some(2019), &["10.1/f2"]),
        record("10.1/f1", "F1", Some(2020), &[]),
        record("10.1/f2", "F2", Some(2020), &[]),
    ]));
    let mut session = session_over(fetcher);

    session.add_publications_to_selection(&[Some("10.1/s1")]).await;
    session.add_publications_to_selection(&[Some("10.1/s2")]).await;
    session.unselect(&doi("10.1/s1")).await;

    let suggested: Vec<&str> = session.suggestions().iter().map(|s| s.doi().as_str()).collect();
    assert_eq!(suggested, vec!["10.1/f2"]);
}

#[tokio::test]
async fn test_selected_view_honors_filter_scope() {
    let fetcher = Arc::new(MapFetcher::with_records(&[
        record("10.1/old", "Old Work", Some(1990), &[]),
        record("10.1/new", "New Work", Some(2022), &[]),
    ]));
    let mut session = session_over(fetcher);
    session.add_publications_to_selection(&[Some("10.1/old"), Some("10.1/new")]).await;

    session.filter.is_active = true;
    session.filter.year_start = Some(2000);
    assert_eq!(session.selected_publications().len(), 1);

    session.filter.apply_to_selected = false;
    assert_eq!(session.selected_publications().len(), 2);
}
