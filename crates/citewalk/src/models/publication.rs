//! Publication record: lifecycle, derived bibliometric quantities, scoring.

use std::collections::{BTreeMap, HashSet};

use chrono::{Datelike, Utc};
use serde::{Deserialize, Serialize};

use super::Doi;
use crate::config::ScoringConfig;
use crate::error::EngineResult;

/// Tag name for survey/review publications.
pub const TAG_SURVEY: &str = "isSurvey";

/// One fetched metadata payload, as returned by the catalog collaborator.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawRecord {
    /// Identifier of the described work.
    #[serde(default)]
    pub doi: Option<String>,

    /// Work title.
    #[serde(default)]
    pub title: Option<String>,

    /// Author names in byline order.
    #[serde(default)]
    pub authors: Vec<String>,

    /// Publication year.
    #[serde(default)]
    pub year: Option<i32>,

    /// DOIs of works citing this one.
    #[serde(default)]
    pub citation_dois: Vec<String>,

    /// DOIs of works this one cites.
    #[serde(default)]
    pub reference_dois: Vec<String>,

    /// Boolean named attributes supplied by the catalog.
    #[serde(default)]
    pub tags: BTreeMap<String, bool>,
}

/// A bibliographic record keyed by its DOI.
///
/// Created the moment its DOI is referenced; starts as an unhydrated
/// placeholder (`was_fetched = false`) and is filled in by [`Publication::hydrate`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Publication {
    /// Unique, case-normalized identifier.
    pub doi: Doi,

    /// Work title.
    pub title: Option<String>,

    /// Author names in byline order.
    pub authors: Vec<String>,

    /// Publication year, when known.
    pub year: Option<i32>,

    /// DOIs of works citing this one, in catalog order.
    pub citation_dois: Vec<Doi>,

    /// DOIs of works this one cites, in catalog order.
    pub reference_dois: Vec<Doi>,

    /// Boolean named attributes (e.g. `isSurvey`, `isHighlyCited`).
    pub tags: BTreeMap<String, bool>,

    /// Whether a full metadata record has been merged in, as opposed to a
    /// placeholder created purely from a DOI reference.
    pub was_fetched: bool,
}

impl Publication {
    /// Create an unhydrated placeholder for a known-good DOI.
    #[must_use]
    pub fn placeholder(doi: Doi) -> Self {
        Self {
            doi,
            title: None,
            authors: Vec::new(),
            year: None,
            citation_dois: Vec::new(),
            reference_dois: Vec::new(),
            tags: BTreeMap::new(),
            was_fetched: false,
        }
    }

    /// Create an unhydrated record from a raw identifier string.
    ///
    /// # Errors
    ///
    /// Returns [`crate::error::EngineError::InvalidIdentifier`] on empty or
    /// whitespace-only input.
    pub fn create(raw: &str) -> EngineResult<Self> {
        Ok(Self::placeholder(Doi::parse(raw)?))
    }

    /// Merge fetched metadata into this record.
    ///
    /// Safe to call repeatedly with the same or updated data: scalar fields
    /// are overwritten only when the record supplies them, citation and
    /// reference lists are merged with case-insensitive dedupe and existing
    /// order preserved, and tags are unioned. Sets `was_fetched`.
    pub fn hydrate(&mut self, record: &RawRecord) {
        if record.title.is_some() {
            self.title.clone_from(&record.title);
        }
        if !record.authors.is_empty() {
            self.authors.clone_from(&record.authors);
        }
        if record.year.is_some() {
            self.year = record.year;
        }
        merge_doi_list(&mut self.citation_dois, &record.citation_dois);
        merge_doi_list(&mut self.reference_dois, &record.reference_dois);
        for (name, value) in &record.tags {
            self.tags.insert(name.clone(), *value);
        }
        self.was_fetched = true;
    }

    /// Citations per year of age, derived on every call.
    ///
    /// `citation_dois.len() / max(1, current_year - year)`. The denominator
    /// falls back to exactly 1 for unknown, current-year, or future-dated
    /// publications so every candidate stays numerically comparable.
    /// Always finite and non-negative.
    #[must_use]
    pub fn citations_per_year(&self, current_year: i32) -> f64 {
        let age = self.year.map_or(1, |y| current_year.saturating_sub(y).max(1));
        self.citation_dois.len() as f64 / f64::from(age)
    }

    /// [`Self::citations_per_year`] against the wall-clock year.
    #[must_use]
    pub fn citations_per_year_now(&self) -> f64 {
        self.citations_per_year(Utc::now().year())
    }

    /// Case-insensitive substring match over title + authors + year.
    #[must_use]
    pub fn matches_meta_string(&self, needle: &str) -> bool {
        if needle.is_empty() {
            return true;
        }
        let haystack = format!(
            "{} {} {}",
            self.title.as_deref().unwrap_or_default(),
            self.authors.join(" "),
            self.year.map(|y| y.to_string()).unwrap_or_default()
        )
        .to_lowercase();
        haystack.contains(&needle.to_lowercase())
    }

    /// Whether a named tag is present and truthy.
    #[must_use]
    pub fn tag(&self, name: &str) -> bool {
        self.tags.get(name).copied().unwrap_or(false)
    }

    /// Set a boolean named attribute.
    pub fn set_tag(&mut self, name: impl Into<String>, value: bool) {
        self.tags.insert(name.into(), value);
    }

    /// Whether the configured researcher appears in first author position.
    #[must_use]
    pub fn has_first_author(&self, researcher: &str) -> bool {
        if researcher.trim().is_empty() {
            return false;
        }
        self.authors
            .first()
            .is_some_and(|first| first.to_lowercase().contains(&researcher.trim().to_lowercase()))
    }

    /// Whether the title matches any of the given survey keywords, or the
    /// `isSurvey` tag is truthy.
    #[must_use]
    pub fn is_survey(&self, keywords: &[String]) -> bool {
        if self.tag(TAG_SURVEY) {
            return true;
        }
        let Some(title) = self.title.as_deref() else {
            return false;
        };
        let title = title.to_lowercase();
        keywords.iter().any(|k| !k.is_empty() && title.contains(&k.to_lowercase()))
    }

    /// Composite relevance score: citations-per-year times the configured
    /// weight, with each enabled boost applied as an independent multiplier.
    ///
    /// Pure function of stored state; recomputed on every call. Always
    /// finite and non-negative (all factors are clamped at zero).
    #[must_use]
    pub fn score(&self, current_year: i32, scoring: &ScoringConfig) -> f64 {
        let mut score = self.citations_per_year(current_year) * scoring.base_weight.max(0.0);

        if scoring.first_author_boost_enabled {
            if let Some(researcher) = scoring.researcher_name.as_deref() {
                if self.has_first_author(researcher) {
                    score *= scoring.first_author_boost.max(0.0);
                }
            }
        }

        if scoring.new_work_boost_enabled {
            let is_recent = self
                .year
                .is_some_and(|y| current_year.saturating_sub(y) <= scoring.new_work_window_years);
            if is_recent {
                score *= scoring.new_work_boost.max(0.0);
            }
        }

        if scoring.survey_boost_enabled && self.is_survey(&scoring.survey_keywords) {
            score *= scoring.survey_boost.max(0.0);
        }

        for (tag, factor) in &scoring.tag_boosts {
            if self.tag(tag) {
                score *= factor.max(0.0);
            }
        }

        score
    }
}

/// Append new entries to an ordered DOI list, skipping entries already
/// present and invalid identifiers. Existing order is never disturbed.
fn merge_doi_list(existing: &mut Vec<Doi>, incoming: &[String]) {
    let mut seen: HashSet<Doi> = existing.iter().cloned().collect();
    for raw in incoming {
        let Ok(doi) = Doi::parse(raw) else { continue };
        if seen.insert(doi.clone()) {
            existing.push(doi);
        }
    }
}
