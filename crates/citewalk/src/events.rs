//! Structured engine events and the injected sink they flow through.
//!
//! The engine never writes to a process-global accumulator; observers
//! receive events through an [`EventSink`] passed in at construction.

use serde::Serialize;

use crate::models::Doi;

/// A structured event emitted by the engine.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase", tag = "kind")]
pub enum EngineEvent {
    /// The selected/excluded sets changed.
    SelectionChanged {
        /// Number of selected publications after the mutation.
        selected: usize,
        /// Number of excluded DOIs after the mutation.
        excluded: usize,
    },

    /// A fresh suggestion list was computed and applied.
    SuggestionsRecomputed {
        /// Number of ranked candidates.
        candidates: usize,
        /// Aggregation generation that produced the list.
        generation: u64,
    },

    /// One candidate could not be hydrated; it was retained as a stub.
    HydrationFailed {
        /// The affected candidate.
        doi: Doi,
    },

    /// The whole aggregation run failed; the previous list was kept.
    AggregationFailed {
        /// Failure summary.
        detail: String,
    },

    /// A selection request was rejected because the DOI is excluded.
    SelectionRejected {
        /// The rejected DOI.
        doi: Doi,
        /// Why the request was dropped.
        reason: String,
    },
}

/// Destination for structured engine events.
pub trait EventSink: Send + Sync {
    /// Deliver one event. Must not block the engine.
    fn emit(&self, event: EngineEvent);
}

/// Default sink: forwards events to `tracing`.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingSink;

impl EventSink for TracingSink {
    fn emit(&self, event: EngineEvent) {
        match &event {
            EngineEvent::HydrationFailed { doi } => {
                tracing::warn!(%doi, "candidate hydration failed, keeping stub");
            }
            EngineEvent::AggregationFailed { detail } => {
                tracing::warn!(%detail, "aggregation failed, previous suggestions kept");
            }
            EngineEvent::SelectionRejected { doi, reason } => {
                tracing::warn!(%doi, %reason, "selection rejected");
            }
            _ => tracing::debug!(?event, "engine event"),
        }
    }
}

/// Sink that discards everything.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullSink;

impl EventSink for NullSink {
    fn emit(&self, _event: EngineEvent) {}
}
