//! Data models: DOI identifiers and publication records.

mod doi;
mod publication;

pub use doi::Doi;
pub use publication::{Publication, RawRecord, TAG_SURVEY};
