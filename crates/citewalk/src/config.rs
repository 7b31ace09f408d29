//! Configuration for the suggestion engine and catalog client.

use std::collections::BTreeMap;
use std::time::Duration;

/// Default constants for the catalog client and engine.
pub mod defaults {
    use std::time::Duration;

    /// Base URL for the works-metadata catalog API.
    pub const CATALOG_API: &str = "https://api.catalog.example.org/v1";

    /// Request timeout.
    pub const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

    /// Connection timeout.
    pub const CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

    /// Polite delay between catalog requests (5 req/s).
    pub const RATE_LIMIT_DELAY: Duration = Duration::from_millis(200);

    /// Cache TTL for hydration responses (5 minutes).
    pub const CACHE_TTL: Duration = Duration::from_secs(300);

    /// Maximum cached hydration responses.
    pub const CACHE_MAX_SIZE: u64 = 1000;

    /// Outstanding concurrent hydration requests per aggregation run.
    pub const MAX_CONCURRENT_HYDRATIONS: usize = 8;

    /// Keepalive connections to the catalog host.
    pub const MAX_KEEPALIVE: usize = 10;

    /// Keepalive expiry.
    pub const KEEPALIVE_EXPIRY: Duration = Duration::from_secs(30);

    /// Score weight applied to citations-per-year.
    pub const BASE_WEIGHT: f64 = 1.0;

    /// First-author boost factor.
    pub const FIRST_AUTHOR_BOOST: f64 = 2.0;

    /// New-work boost factor.
    pub const NEW_WORK_BOOST: f64 = 1.5;

    /// Publications at most this many years old count as new work.
    pub const NEW_WORK_WINDOW_YEARS: i32 = 2;

    /// Survey boost factor.
    pub const SURVEY_BOOST: f64 = 1.25;

    /// Title keywords marking a survey/review publication.
    pub const SURVEY_KEYWORDS: &[&str] = &["survey", "review", "overview"];
}

/// Relevance scoring knobs. All boosts are independent multipliers with
/// their own enable flags; negative factors are clamped to zero at
/// evaluation time so scores stay non-negative.
#[derive(Debug, Clone, PartialEq)]
pub struct ScoringConfig {
    /// Weight applied to citations-per-year before any boost.
    pub base_weight: f64,

    /// Name of the querying researcher, for the first-author boost.
    pub researcher_name: Option<String>,

    /// First-author boost factor.
    pub first_author_boost: f64,

    /// Whether the first-author boost applies.
    pub first_author_boost_enabled: bool,

    /// Boost factor for recent publications.
    pub new_work_boost: f64,

    /// Whether the new-work boost applies.
    pub new_work_boost_enabled: bool,

    /// Age window (in years) for the new-work boost.
    pub new_work_window_years: i32,

    /// Boost factor for survey/review publications.
    pub survey_boost: f64,

    /// Whether the survey boost applies.
    pub survey_boost_enabled: bool,

    /// Title keywords marking a survey publication.
    pub survey_keywords: Vec<String>,

    /// Extra multipliers keyed by tag name, applied when the tag is truthy.
    pub tag_boosts: BTreeMap<String, f64>,
}

impl Default for ScoringConfig {
    fn default() -> Self {
        Self {
            base_weight: defaults::BASE_WEIGHT,
            researcher_name: None,
            first_author_boost: defaults::FIRST_AUTHOR_BOOST,
            first_author_boost_enabled: true,
            new_work_boost: defaults::NEW_WORK_BOOST,
            new_work_boost_enabled: true,
            new_work_window_years: defaults::NEW_WORK_WINDOW_YEARS,
            survey_boost: defaults::SURVEY_BOOST,
            survey_boost_enabled: true,
            survey_keywords: defaults::SURVEY_KEYWORDS.iter().map(ToString::to_string).collect(),
            tag_boosts: BTreeMap::new(),
        }
    }
}

/// Engine configuration.
#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// Base URL for the catalog API (overridable for mock servers).
    pub catalog_api_url: String,

    /// Request timeout.
    pub request_timeout: Duration,

    /// Connection timeout.
    pub connect_timeout: Duration,

    /// Polite delay between catalog requests.
    pub rate_limit_delay: Duration,

    /// Hydration response cache TTL.
    pub cache_ttl: Duration,

    /// Maximum cached hydration responses.
    pub cache_max_size: u64,

    /// Outstanding concurrent hydrations per aggregation run.
    pub max_concurrent_hydrations: usize,

    /// Relevance scoring knobs.
    pub scoring: ScoringConfig,
}

impl EngineConfig {
    /// Create a configuration with default limits and the given scoring knobs.
    #[must_use]
    pub fn new(scoring: ScoringConfig) -> Self {
        Self {
            catalog_api_url: defaults::CATALOG_API.to_string(),
            request_timeout: defaults::REQUEST_TIMEOUT,
            connect_timeout: defaults::CONNECT_TIMEOUT,
            rate_limit_delay: defaults::RATE_LIMIT_DELAY,
            cache_ttl: defaults::CACHE_TTL,
            cache_max_size: defaults::CACHE_MAX_SIZE,
            max_concurrent_hydrations: defaults::MAX_CONCURRENT_HYDRATIONS,
            scoring,
        }
    }

    /// Create a test configuration pointed at a mock server: no delays, no
    /// caching.
    #[must_use]
    pub fn for_testing(base_url: &str) -> Self {
        Self {
            catalog_api_url: base_url.to_string(),
            request_timeout: Duration::from_secs(5),
            connect_timeout: Duration::from_secs(2),
            rate_limit_delay: Duration::from_millis(0),
            // Caching is disabled through the zero capacity; the TTL value
            // just needs to be valid.
            cache_ttl: Duration::from_secs(1),
            cache_max_size: 0,
            max_concurrent_hydrations: 4,
            scoring: ScoringConfig::default(),
        }
    }

    /// Create configuration from environment variables.
    ///
    /// `CITEWALK_CATALOG_URL` overrides the catalog base URL and
    /// `CITEWALK_RESEARCHER` sets the first-author boost name.
    ///
    /// # Errors
    ///
    /// Returns error if an environment variable is set but not valid UTF-8.
    pub fn from_env() -> anyhow::Result<Self> {
        let scoring = ScoringConfig {
            researcher_name: read_env("CITEWALK_RESEARCHER")?,
            ..ScoringConfig::default()
        };

        let mut config = Self::new(scoring);
        if let Some(url) = read_env("CITEWALK_CATALOG_URL")? {
            config.catalog_api_url = url;
        }
        Ok(config)
    }
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self::new(ScoringConfig::default())
    }
}

fn read_env(name: &str) -> anyhow::Result<Option<String>> {
    match std::env::var(name) {
        Ok(value) => Ok(Some(value)),
        Err(std::env::VarError::NotPresent) => Ok(None),
        Err(e) => Err(anyhow::anyhow!("invalid value for {name}: {e}")),
    }
}
