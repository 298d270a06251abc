//! Error types for the engine and input validation.

use thiserror::Error;

/// A parcel toggle the engine refused to apply.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EngineError {
    #[error("parcel '{0}' is not in the report")]
    UnknownParcel(String),

    #[error("parcel '{0}' is already selected")]
    AlreadySelected(String),

    #[error("parcel '{0}' is not selected")]
    NotSelected(String),
}

/// Suspicious but non-fatal input data.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum InputIssue {
    #[error("parcel '{parcel}' has share {share} in '{municipality}', expected 0-1")]
    ShareOutOfRange {
        parcel: String,
        municipality: String,
        share: f64,
    },

    #[error("parcel '{parcel}' overlaps '{municipality}', which has no population data")]
    MissingMunicipality {
        parcel: String,
        municipality: String,
    },

    #[error("parcel '{parcel}' uses ecosystem type '{eco_type}', which has no required offset")]
    UnknownEcoType { parcel: String, eco_type: String },

    #[error("parcel '{0}' appears more than once in the parcel table")]
    DuplicateParcel(String),
}
