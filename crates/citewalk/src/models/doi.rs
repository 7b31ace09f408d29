//! DOI identifier newtype with case normalization.

use std::fmt;
use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::error::{EngineError, EngineResult};

/// DOIs are case-insensitive per the DOI handbook; registered DOIs start
/// with a `10.` directory prefix.
static DOI_SHAPE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^10\.\d+/\S+$").expect("valid DOI regex"));

/// A case-normalized publication identifier.
///
/// Stored trimmed and lowercased, so equality, hashing, and ordering are all
/// case-insensitive and deterministic. Construction rejects empty and
/// whitespace-only input; every other string is accepted (the catalog may
/// hand back identifiers that are not strictly DOI-shaped).
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Doi(String);

impl Doi {
    /// Parse a raw identifier string.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::InvalidIdentifier`] on empty or
    /// whitespace-only input.
    pub fn parse(raw: &str) -> EngineResult<Self> {
        let normalized = raw.trim().to_lowercase();
        if normalized.is_empty() {
            return Err(EngineError::invalid_identifier(raw));
        }
        Ok(Self(normalized))
    }

    /// Lenient form for list hygiene: `None` instead of an error for
    /// missing or blank entries.
    #[must_use]
    pub fn parse_opt(raw: Option<&str>) -> Option<Self> {
        raw.and_then(|r| Self::parse(r).ok())
    }

    /// Whether this identifier has the registered-DOI shape (`10.<prefix>/<suffix>`).
    ///
    /// Used for diagnostics only; non-DOI identifiers are still accepted.
    #[must_use]
    pub fn looks_like_doi(&self) -> bool {
        DOI_SHAPE.is_match(&self.0)
    }

    /// The normalized identifier string.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Doi {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for Doi {
    fn as_ref(&self) -> &str {
        &self.0
    }
}
