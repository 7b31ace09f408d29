//! Suggestion aggregator: one-hop citation-graph expansion and ranking.
//!
//! Given the selected set, enumerates the citation/reference frontier,
//! aggregates multiplicity per candidate DOI, hydrates candidates through
//! the fetch collaborator, and produces a deterministically ranked list.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use chrono::{Datelike, Utc};
use futures::stream::{self, StreamExt};

use crate::client::MetadataFetcher;
use crate::config::ScoringConfig;
use crate::error::{EngineError, EngineResult, FetchError};
use crate::events::{EngineEvent, EventSink};
use crate::filter::Filter;
use crate::models::{Doi, Publication};

/// One ranked candidate.
#[derive(Debug, Clone)]
pub struct Suggestion {
    /// The candidate record; a placeholder stub when hydration failed.
    pub publication: Publication,

    /// Number of distinct selected publications corroborating this
    /// candidate via a citation or reference edge.
    pub multiplicity: usize,

    /// Composite relevance score at aggregation time.
    pub score: f64,
}

impl Suggestion {
    /// The candidate's DOI.
    #[must_use]
    pub fn doi(&self) -> &Doi {
        &self.publication.doi
    }
}

/// A ranked suggestion list. Filtering is a borrowed view: filtered-out
/// candidates stay in the underlying ranked vector, so toggling the filter
/// off restores them without recomputation.
#[derive(Debug, Clone, Default)]
pub struct SuggestionList {
    ranked: Vec<Suggestion>,
}

impl SuggestionList {
    /// An empty list.
    #[must_use]
    pub fn empty() -> Self {
        Self::default()
    }

    /// Build a list from an already-ranked vector. The caller is
    /// responsible for ordering; used when pruning an existing list.
    #[must_use]
    pub fn from_ranked(ranked: Vec<Suggestion>) -> Self {
        Self { ranked }
    }

    /// The full ranked list, ignoring any filter.
    #[must_use]
    pub fn ranked(&self) -> &[Suggestion] {
        &self.ranked
    }

    /// The ranked list narrowed by a filter scoped to suggestions. When the
    /// filter is inactive or not applied to suggestions, this is the full
    /// list.
    #[must_use]
    pub fn filtered(&self, filter: &Filter) -> Vec<&Suggestion> {
        if !filter.is_active || !filter.apply_to_suggested {
            return self.ranked.iter().collect();
        }
        self.ranked.iter().filter(|s| filter.matches(&s.publication)).collect()
    }

    /// Number of ranked candidates.
    #[must_use]
    pub fn len(&self) -> usize {
        self.ranked.len()
    }

    /// Whether the list has no candidates.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.ranked.is_empty()
    }
}

/// The aggregation engine.
pub struct SuggestionEngine {
    fetcher: Arc<dyn MetadataFetcher>,
    scoring: ScoringConfig,
    sink: Arc<dyn EventSink>,
    max_concurrent_hydrations: usize,
}

impl SuggestionEngine {
    /// Create an engine over the given fetch collaborator.
    #[must_use]
    pub fn new(
        fetcher: Arc<dyn MetadataFetcher>,
        scoring: ScoringConfig,
        sink: Arc<dyn EventSink>,
        max_concurrent_hydrations: usize,
    ) -> Self {
        Self { fetcher, scoring, sink, max_concurrent_hydrations: max_concurrent_hydrations.max(1) }
    }

    /// Aggregate suggestions for the current selected set against the
    /// wall-clock year.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::Aggregation`] on systemic fetch-layer
    /// unavailability; the caller should keep its previous list.
    pub async fn aggregate(
        &self,
        selected: &[Publication],
        skip: &HashSet<Doi>,
    ) -> EngineResult<SuggestionList> {
        self.aggregate_at(selected, skip, Utc::now().year()).await
    }

    /// Aggregate with an explicit current year (deterministic scoring).
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::Aggregation`] on systemic fetch-layer
    /// unavailability; the caller should keep its previous list.
    pub async fn aggregate_at(
        &self,
        selected: &[Publication],
        skip: &HashSet<Doi>,
        current_year: i32,
    ) -> EngineResult<SuggestionList> {
        let mut multiplicity = frontier_multiplicity(selected);
        multiplicity.retain(|doi, _| !skip.contains(doi));

        if multiplicity.is_empty() {
            return Ok(SuggestionList::empty());
        }

        tracing::debug!(candidates = multiplicity.len(), "hydrating suggestion frontier");

        let hydrated: Vec<(Doi, Result<Publication, FetchError>)> =
            stream::iter(multiplicity.keys().cloned())
                .map(|doi| {
                    let fetcher = Arc::clone(&self.fetcher);
                    async move {
                        let outcome = fetcher.hydrate(&doi).await.map(|record| {
                            let mut publication = Publication::placeholder(doi.clone());
                            publication.hydrate(&record);
                            publication
                        });
                        (doi, outcome)
                    }
                })
                .buffer_unordered(self.max_concurrent_hydrations)
                .collect()
                .await;

        let total = hydrated.len();
        let systemic = hydrated
            .iter()
            .filter(|(_, outcome)| matches!(outcome, Err(e) if e.is_systemic()))
            .count();

        if systemic == total {
            let detail = format!("catalog unavailable for all {total} candidates");
            self.sink.emit(EngineEvent::AggregationFailed { detail: detail.clone() });
            return Err(EngineError::aggregation(detail));
        }

        let mut ranked: Vec<Suggestion> = hydrated
            .into_iter()
            .map(|(doi, outcome)| {
                let publication = match outcome {
                    Ok(publication) => publication,
                    Err(_) => {
                        // Low-confidence stub: the DOI is still known-relevant,
                        // so the candidate is retained rather than dropped.
                        self.sink.emit(EngineEvent::HydrationFailed { doi: doi.clone() });
                        Publication::placeholder(doi.clone())
                    }
                };
                let score = publication.score(current_year, &self.scoring);
                let multiplicity = multiplicity.get(&doi).copied().unwrap_or(0);
                Suggestion { publication, multiplicity, score }
            })
            .collect();

        ranked.sort_by(|a, b| {
            b.multiplicity
                .cmp(&a.multiplicity)
                .then_with(|| b.score.total_cmp(&a.score))
                .then_with(|| a.doi().cmp(b.doi()))
        });

        Ok(SuggestionList { ranked })
    }
}

impl std::fmt::Debug for SuggestionEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SuggestionEngine")
            .field("max_concurrent_hydrations", &self.max_concurrent_hydrations)
            .finish()
    }
}

/// Multiplicity per frontier DOI: the number of distinct selected
/// publications referencing it through either edge direction. A selected
/// publication that both cites and references the same DOI counts once.
fn frontier_multiplicity(selected: &[Publication]) -> HashMap<Doi, usize> {
    let mut multiplicity: HashMap<Doi, usize> = HashMap::new();
    for publication in selected {
        let edges: HashSet<&Doi> =
            publication.citation_dois.iter().chain(publication.reference_dois.iter()).collect();
        for doi in edges {
            *multiplicity.entry(doi.clone()).or_insert(0) += 1;
        }
    }
    multiplicity
}
