//! Aggregation engine.
//!
//! Owns the selection set and every running total derived from it.

pub mod aggregator;
pub mod state;

pub use aggregator::{ReportState, RowChange, SelectionSummary, ToggleOutcome};
pub use state::{EngineOptions, ImpactSign, MunicipalityState};
