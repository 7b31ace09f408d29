//! Composable filter predicate over publication records.
//!
//! A filter narrows the selected and suggested views without mutating
//! underlying data. All criteria compose by AND with vacuous truth: an
//! empty criterion matches everything.

use std::collections::BTreeSet;

use crate::models::{Doi, Publication};

/// Year bounds are only meaningful inside this range; anything else is
/// treated as absent and always matches.
const YEAR_MIN: i32 = 1000;
const YEAR_MAX: i32 = 10000;

/// A UI-session-scoped filter over publications.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Filter {
    /// Free-text substring matched against title + authors + year.
    pub text: String,

    /// Lower year bound (inclusive). Active only within `[1000, 10000)`.
    pub year_start: Option<i32>,

    /// Upper year bound (inclusive). Active only within `[1000, 10000)`.
    pub year_end: Option<i32>,

    /// Tag names, OR-matched against the publication's truthy tags.
    pub tags: BTreeSet<String>,

    /// DOIs, OR-matched against the publication's own DOI and its
    /// citation/reference lists.
    pub dois: BTreeSet<Doi>,

    /// Master toggle. A deactivated filter hides nothing.
    pub is_active: bool,

    /// Whether the filter narrows the selected view.
    pub apply_to_selected: bool,

    /// Whether the filter narrows the suggested view.
    pub apply_to_suggested: bool,
}

/// Whether a year bound is numeric and in the meaningful range.
fn year_bound_active(bound: Option<i32>) -> bool {
    bound.is_some_and(|y| (YEAR_MIN..YEAR_MAX).contains(&y))
}

impl Filter {
    /// Create an inactive filter that applies to both views once activated.
    #[must_use]
    pub fn new() -> Self {
        Self { apply_to_selected: true, apply_to_suggested: true, ..Self::default() }
    }

    /// Whether the publication passes this filter.
    #[must_use]
    pub fn matches(&self, publication: &Publication) -> bool {
        if !self.is_active {
            return true;
        }
        self.matches_text(publication)
            && self.matches_tags(publication)
            && self.matches_year(publication)
            && self.matches_dois(publication)
    }

    fn matches_text(&self, publication: &Publication) -> bool {
        self.text.is_empty() || publication.matches_meta_string(&self.text)
    }

    fn matches_tags(&self, publication: &Publication) -> bool {
        self.tags.is_empty() || self.tags.iter().any(|t| publication.tag(t))
    }

    fn matches_year(&self, publication: &Publication) -> bool {
        let start_active = year_bound_active(self.year_start);
        let end_active = year_bound_active(self.year_end);
        if !start_active && !end_active {
            return true;
        }
        // An unknown year never matches an active year bound.
        let Some(year) = publication.year else {
            return false;
        };
        if start_active && year < self.year_start.unwrap_or(YEAR_MIN) {
            return false;
        }
        if end_active && year > self.year_end.unwrap_or(YEAR_MAX) {
            return false;
        }
        true
    }

    fn matches_dois(&self, publication: &Publication) -> bool {
        if self.dois.is_empty() {
            return true;
        }
        self.dois.contains(&publication.doi)
            || publication.citation_dois.iter().any(|d| self.dois.contains(d))
            || publication.reference_dois.iter().any(|d| self.dois.contains(d))
    }

    /// Whether the filter is actually narrowing anything: active, with at
    /// least one non-empty criterion, and at least one scope toggle on.
    #[must_use]
    pub fn has_active_filters(&self) -> bool {
        if !self.is_active || !(self.apply_to_selected || self.apply_to_suggested) {
            return false;
        }
        !self.text.is_empty()
            || !self.tags.is_empty()
            || !self.dois.is_empty()
            || year_bound_active(self.year_start)
            || year_bound_active(self.year_end)
    }

    /// Add a DOI to the DOI criterion. Adding a present DOI is a no-op.
    pub fn add_doi(&mut self, doi: Doi) {
        self.dois.insert(doi);
    }

    /// Remove a DOI from the DOI criterion. Removing an absent DOI is a no-op.
    pub fn remove_doi(&mut self, doi: &Doi) {
        self.dois.remove(doi);
    }

    /// Toggle membership of a DOI in the DOI criterion.
    pub fn toggle_doi(&mut self, doi: Doi) {
        if !self.dois.remove(&doi) {
            self.dois.insert(doi);
        }
    }
}
