//! Report projection and rendering.

pub mod csv;
pub mod generator;
pub mod html;
pub mod table;

pub use self::csv::export_csv;
pub use generator::{generate_json_report, generate_markdown_report};
pub use html::render_html;
pub use table::{ProjectionOptions, ReportTables};

use crate::engine::ReportState;
use crate::input::RawDocuments;
use crate::models::ReportMetadata;
use crate::schema::TableSchema;

/// Everything a renderer needs.
#[derive(Debug, Clone)]
pub struct Report {
    pub metadata: ReportMetadata,
    /// Selected parcel ids, sorted.
    pub selection: Vec<String>,
    pub tables: ReportTables,
    /// Input documents to embed in the HTML output.
    pub embedded: Option<RawDocuments>,
}

impl Report {
    pub fn build(
        state: &ReportState,
        schema: &TableSchema,
        options: &ProjectionOptions,
        metadata: ReportMetadata,
        embedded: Option<RawDocuments>,
    ) -> Self {
        Self {
            metadata,
            selection: state.selection().iter().cloned().collect(),
            tables: ReportTables::project(state, schema, options),
            embedded,
        }
    }
}
