//! Session state: the authoritative per-DOI selection state machine.
//!
//! Each DOI has exactly one tagged state in one map, so contradictory
//! membership (selected *and* excluded) is unrepresentable. All state
//! transitions for a mutation happen before any await point; under the
//! session's single-owner model no reader can observe a half-applied batch.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use crate::client::MetadataFetcher;
use crate::config::EngineConfig;
use crate::error::EngineError;
use crate::events::{EngineEvent, EventSink};
use crate::filter::Filter;
use crate::models::{Doi, Publication};
use crate::suggest::{Suggestion, SuggestionEngine, SuggestionList};

/// Per-DOI state. Absence from the session map reads as `Unqueued`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DoiState {
    /// Not tracked by this session.
    Unqueued,
    /// Marked for the next batched selection.
    QueuedForSelection,
    /// Marked for the next batched exclusion.
    QueuedForExclusion,
    /// Explicitly chosen by the user.
    Selected,
    /// Explicitly rejected; never resurfaces as a suggestion.
    Excluded,
}

/// One user session: selected/excluded state, pending queues, the current
/// filter, and the last good suggestion list.
pub struct Session {
    engine: SuggestionEngine,
    fetcher: Arc<dyn MetadataFetcher>,
    sink: Arc<dyn EventSink>,

    states: HashMap<Doi, DoiState>,
    selected_order: Vec<Doi>,
    publications: HashMap<Doi, Publication>,
    suggestions: SuggestionList,

    /// Filter applied to the selected and suggested views.
    pub filter: Filter,

    /// Monotonic re-aggregation generation; an in-flight aggregation is
    /// applied only if no newer mutation superseded it.
    generation: u64,
}

impl Session {
    /// Create a session over a fetch collaborator and event sink.
    #[must_use]
    pub fn new(
        fetcher: Arc<dyn MetadataFetcher>,
        config: &EngineConfig,
        sink: Arc<dyn EventSink>,
    ) -> Self {
        let engine = SuggestionEngine::new(
            Arc::clone(&fetcher),
            config.scoring.clone(),
            Arc::clone(&sink),
            config.max_concurrent_hydrations,
        );
        Self {
            engine,
            fetcher,
            sink,
            states: HashMap::new(),
            selected_order: Vec::new(),
            publications: HashMap::new(),
            suggestions: SuggestionList::empty(),
            filter: Filter::new(),
            generation: 0,
        }
    }

    /// Current state of a DOI.
    #[must_use]
    pub fn state(&self, doi: &Doi) -> DoiState {
        self.states.get(doi).copied().unwrap_or(DoiState::Unqueued)
    }

    /// Selected DOIs in insertion order.
    #[must_use]
    pub fn selected_dois(&self) -> &[Doi] {
        &self.selected_order
    }

    /// Excluded DOIs, in deterministic order.
    #[must_use]
    pub fn excluded_dois(&self) -> Vec<Doi> {
        let mut excluded: Vec<Doi> = self
            .states
            .iter()
            .filter(|(_, state)| **state == DoiState::Excluded)
            .map(|(doi, _)| doi.clone())
            .collect();
        excluded.sort_unstable();
        excluded
    }

    /// Selected publication records in insertion order, narrowed by the
    /// filter when it is active and scoped to the selected view.
    #[must_use]
    pub fn selected_publications(&self) -> Vec<&Publication> {
        let narrow = self.filter.is_active && self.filter.apply_to_selected;
        self.selected_order
            .iter()
            .filter_map(|doi| self.publications.get(doi))
            .filter(|p| !narrow || self.filter.matches(p))
            .collect()
    }

    /// The current suggestion list, narrowed by the filter when it is
    /// scoped to suggestions. Stale-but-valid after an aggregation failure.
    #[must_use]
    pub fn suggestions(&self) -> Vec<&Suggestion> {
        self.suggestions.filtered(&self.filter)
    }

    /// The full ranked suggestion list, ignoring the filter.
    #[must_use]
    pub fn suggestions_unfiltered(&self) -> &SuggestionList {
        &self.suggestions
    }

    /// Add publications to the selected set.
    ///
    /// Missing, empty, whitespace-only, and duplicate entries are dropped
    /// silently; this never fails on malformed input. Already-selected DOIs
    /// are no-ops. A currently excluded DOI stays excluded (excluded wins)
    /// and the rejection is reported through the event sink. Newly selected
    /// DOIs are hydrated afterwards; suggestions are recomputed once.
    pub async fn add_publications_to_selection(&mut self, raw: &[Option<&str>]) {
        let mut added = Vec::new();

        for entry in raw {
            let Some(doi) = Doi::parse_opt(*entry) else { continue };
            match self.state(&doi) {
                DoiState::Selected => {}
                DoiState::Excluded => {
                    tracing::warn!(%doi, "selection dropped, DOI is excluded");
                    self.sink.emit(EngineEvent::SelectionRejected {
                        doi,
                        reason: "excluded".to_string(),
                    });
                }
                _ => {
                    self.select(doi.clone());
                    added.push(doi);
                }
            }
        }

        if added.is_empty() {
            return;
        }

        self.emit_selection_changed();
        self.hydrate_selected(&added).await;
        self.recompute_suggestions().await;
    }

    /// Mark a suggestion for batched selection. Clears a pending exclusion
    /// mark; no-op for already selected or excluded DOIs.
    pub fn queue_for_selection(&mut self, doi: Doi) {
        match self.state(&doi) {
            DoiState::Selected | DoiState::Excluded => {}
            _ => {
                self.states.insert(doi, DoiState::QueuedForSelection);
            }
        }
    }

    /// Mark a suggestion for batched exclusion. Clears a pending selection
    /// mark; no-op for already selected or excluded DOIs.
    pub fn queue_for_exclusion(&mut self, doi: Doi) {
        match self.state(&doi) {
            DoiState::Selected | DoiState::Excluded => {}
            _ => {
                self.states.insert(doi, DoiState::QueuedForExclusion);
            }
        }
    }

    /// Return a queued DOI to neutral. Selected/excluded DOIs untouched.
    pub fn remove_from_queues(&mut self, doi: &Doi) {
        if matches!(
            self.state(doi),
            DoiState::QueuedForSelection | DoiState::QueuedForExclusion
        ) {
            self.states.remove(doi);
        }
    }

    /// Empty both queues without touching selected or excluded.
    pub fn clear_queues(&mut self) {
        self.states.retain(|_, state| {
            !matches!(state, DoiState::QueuedForSelection | DoiState::QueuedForExclusion)
        });
    }

    /// Drain both queues into their target sets.
    ///
    /// Every state transition happens synchronously before hydration and
    /// re-aggregation, so the whole batch becomes visible at once.
    pub async fn apply_queues(&mut self) {
        let mut to_select = Vec::new();
        let mut to_exclude = Vec::new();
        for (doi, state) in &self.states {
            match state {
                DoiState::QueuedForSelection => to_select.push(doi.clone()),
                DoiState::QueuedForExclusion => to_exclude.push(doi.clone()),
                _ => {}
            }
        }
        if to_select.is_empty() && to_exclude.is_empty() {
            return;
        }
        // Deterministic batch order regardless of map iteration.
        to_select.sort_unstable();
        to_exclude.sort_unstable();

        for doi in &to_select {
            self.select(doi.clone());
        }
        for doi in &to_exclude {
            self.states.insert(doi.clone(), DoiState::Excluded);
            self.publications.remove(doi);
        }

        self.emit_selection_changed();
        self.hydrate_selected(&to_select).await;
        self.recompute_suggestions().await;
    }

    /// Remove a DOI from the selected set, back to neutral.
    pub async fn unselect(&mut self, doi: &Doi) {
        if self.state(doi) != DoiState::Selected {
            return;
        }
        self.states.remove(doi);
        self.selected_order.retain(|d| d != doi);
        self.publications.remove(doi);

        self.emit_selection_changed();
        self.recompute_suggestions().await;
    }

    /// Remove a DOI from the excluded set, back to neutral. It may
    /// resurface as a suggestion on the next aggregation.
    pub async fn unexclude(&mut self, doi: &Doi) {
        if self.state(doi) != DoiState::Excluded {
            return;
        }
        self.states.remove(doi);

        self.emit_selection_changed();
        self.recompute_suggestions().await;
    }

    /// Recompute the suggestion list from the current selected set.
    ///
    /// A newer mutation supersedes an in-flight aggregation: the result is
    /// applied only when the generation is still current. Candidates whose
    /// DOI was selected or excluded since issuance are dropped on apply.
    /// On failure the previous list stays visible, stale but valid.
    pub async fn recompute_suggestions(&mut self) {
        self.generation += 1;
        let generation = self.generation;

        let selected: Vec<Publication> = self
            .selected_order
            .iter()
            .filter_map(|doi| self.publications.get(doi))
            .cloned()
            .collect();
        let skip: HashSet<Doi> = self
            .states
            .iter()
            .filter(|(_, state)| matches!(state, DoiState::Selected | DoiState::Excluded))
            .map(|(doi, _)| doi.clone())
            .collect();

        let outcome = self.engine.aggregate(&selected, &skip).await;

        if self.generation != generation {
            tracing::debug!(generation, "aggregation superseded, discarding result");
            return;
        }

        match outcome {
            Ok(mut list) => {
                // States may have shifted while hydration was in flight.
                list = self.drop_stale_candidates(list);
                let candidates = list.len();
                self.suggestions = list;
                self.sink.emit(EngineEvent::SuggestionsRecomputed { candidates, generation });
            }
            Err(error) => {
                tracing::warn!(%error, "keeping previous suggestion list");
            }
        }
    }

    fn drop_stale_candidates(&self, list: SuggestionList) -> SuggestionList {
        let stale: Vec<Doi> = list
            .ranked()
            .iter()
            .filter(|s| {
                matches!(self.state(s.doi()), DoiState::Selected | DoiState::Excluded)
            })
            .map(|s| s.doi().clone())
            .collect();
        if stale.is_empty() {
            return list;
        }
        let mut ranked: Vec<Suggestion> = list.ranked().to_vec();
        ranked.retain(|s| !stale.contains(s.doi()));
        SuggestionList::from_ranked(ranked)
    }

    /// Transition one DOI into `Selected` and register its record.
    fn select(&mut self, doi: Doi) {
        let previous = self.states.insert(doi.clone(), DoiState::Selected);
        if previous != Some(DoiState::Selected) {
            self.selected_order.push(doi.clone());
            self.publications.entry(doi).or_insert_with_key(|d| Publication::placeholder(d.clone()));
        }
    }

    /// Hydrate freshly selected records; failures leave stubs in place.
    async fn hydrate_selected(&mut self, dois: &[Doi]) {
        for doi in dois {
            match self.fetcher.hydrate(doi).await {
                Ok(record) => {
                    if let Some(publication) = self.publications.get_mut(doi) {
                        publication.hydrate(&record);
                    }
                }
                Err(source) => {
                    let error = EngineError::Hydration { doi: doi.clone(), source };
                    tracing::warn!(%error, "selected publication left unhydrated");
                    self.sink.emit(EngineEvent::HydrationFailed { doi: doi.clone() });
                }
            }
        }
    }

    fn emit_selection_changed(&self) {
        self.sink.emit(EngineEvent::SelectionChanged {
            selected: self.selected_order.len(),
            excluded: self.states.values().filter(|s| **s == DoiState::Excluded).count(),
        });
    }
}

impl std::fmt::Debug for Session {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Session")
            .field("selected", &self.selected_order.len())
            .field("suggestions", &self.suggestions.len())
            .field("generation", &self.generation)
            .finish()
    }
}
