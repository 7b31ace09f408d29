//! citewalk: citation-graph suggestion engine
//!
//! Recommends scientific publications by walking the citation graph one hop
//! outward from a user-curated selection. Candidates discovered through
//! multiple selected publications outrank singly-cited ones; a composite
//! bibliometric score breaks ties.
//!
//! # Features
//!
//! - **Publication model**: DOI-keyed records with derived-on-read
//!   citations-per-year and a configurable multiplicative scoring model
//! - **Composable filters**: free text, year range, tags, and DOI sets,
//!   applied as non-destructive views
//! - **Async hydration**: candidates are fetched concurrently through a
//!   cached, retrying catalog client
//! - **Session state machine**: one tagged state per DOI, so a publication
//!   can never be selected and excluded at once
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//!
//! use citewalk::client::CatalogClient;
//! use citewalk::config::EngineConfig;
//! use citewalk::events::TracingSink;
//! use citewalk::session::Session;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let config = EngineConfig::from_env()?;
//!     let client = Arc::new(CatalogClient::new(&config)?);
//!     let mut session = Session::new(client, &config, Arc::new(TracingSink));
//!
//!     session
//!         .add_publications_to_selection(&[Some("10.1038/nature14539")])
//!         .await;
//!
//!     for suggestion in session.suggestions() {
//!         println!("{} (x{})", suggestion.doi(), suggestion.multiplicity);
//!     }
//!     Ok(())
//! }
//! ```

pub mod client;
pub mod config;
pub mod error;
pub mod events;
pub mod filter;
pub mod models;
pub mod session;
pub mod suggest;

pub use client::{CatalogClient, MetadataFetcher};
pub use config::{EngineConfig, ScoringConfig};
pub use error::{EngineError, FetchError};
pub use filter::Filter;
pub use models::{Doi, Publication, RawRecord};
pub use session::{DoiState, Session};
pub use suggest::{Suggestion, SuggestionEngine, SuggestionList};
