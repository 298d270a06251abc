//! Markdown and JSON report generation.
//!
//! This module renders the projected tables as a Markdown document or a
//! JSON snapshot.

use super::table::Table;
use super::Report;
use crate::format::Sign;
use crate::models::ReportMetadata;
use anyhow::Result;
use serde::Serialize;

/// Generate a complete Markdown report.
pub fn generate_markdown_report(report: &Report) -> String {
    let mut output = String::new();

    // Title
    output.push_str(&format!("# {}\n\n", report.metadata.title));

    // Metadata section
    output.push_str(&generate_metadata_section(&report.metadata));

    // Selection
    output.push_str(&generate_selection_section(&report.selection));

    // One section per table
    for table in report.tables.iter() {
        output.push_str(&generate_table_section(table));
    }

    // Footer
    output.push_str(&generate_footer());

    output
}

/// Generate the metadata section.
fn generate_metadata_section(metadata: &ReportMetadata) -> String {
    let mut section = String::new();

    section.push_str("## Metadata\n\n");
    section.push_str(&format!(
        "- **Generated:** {}\n",
        metadata.generated_at.format("%Y-%m-%d %H:%M:%S UTC")
    ));
    section.push_str(&format!("- **Services:** {}\n", metadata.services.join(", ")));
    section.push_str(&format!(
        "- **Parcels Selected:** {} of {}\n",
        metadata.parcels_selected, metadata.parcels_total
    ));
    section.push_str(&format!(
        "- **Municipalities Tracked:** {}\n",
        metadata.municipalities_tracked
    ));
    if metadata.toggles_rejected > 0 {
        section.push_str(&format!(
            "- **Toggles Skipped:** {}\n",
            metadata.toggles_rejected
        ));
    }
    section.push('\n');

    section
}

/// Generate the list of selected parcels.
fn generate_selection_section(selection: &[String]) -> String {
    let mut section = String::new();

    section.push_str("## Selected Parcels\n\n");
    if selection.is_empty() {
        section.push_str("No parcels are selected.\n\n");
    } else {
        let ids: Vec<String> = selection.iter().map(|id| format!("`{}`", id)).collect();
        section.push_str(&ids.join(", "));
        section.push_str("\n\n");
    }

    section
}

/// Generate a GitHub table for one report table.
fn generate_table_section(table: &Table) -> String {
    let mut section = String::new();

    section.push_str(&format!("## {}\n\n", table.title));

    if table.rows.is_empty() && table.footer.is_empty() {
        section.push_str("*No rows.*\n\n");
        return section;
    }

    let header: Vec<String> = table.columns.iter().map(|c| escape_pipe(&c.label)).collect();
    section.push_str(&format!("| {} |\n", header.join(" | ")));

    let align: Vec<&str> = table
        .columns
        .iter()
        .enumerate()
        .map(|(i, c)| if c.centered { ":---:" } else if i == 0 { ":---" } else { "---:" })
        .collect();
    section.push_str(&format!("|{}|\n", align.join("|")));

    for row in &table.rows {
        section.push_str(&markdown_row(table, &row.cells, false));
    }
    for row in &table.footer {
        section.push_str(&markdown_row(table, &row.cells, true));
    }
    section.push('\n');

    section
}

fn markdown_row(table: &Table, cells: &[crate::format::CellValue], bold: bool) -> String {
    let rendered: Vec<String> = cells
        .iter()
        .enumerate()
        .map(|(i, cell)| {
            let mut text = escape_pipe(&table.display(i, cell));
            // Negative nets are flagged since Markdown has no cell styling.
            if table.sign(i, cell) == Sign::Negative {
                text = format!("🔴 {}", text);
            }
            if bold && !text.is_empty() {
                text = format!("**{}**", text);
            }
            text
        })
        .collect();
    format!("| {} |\n", rendered.join(" | "))
}

fn escape_pipe(text: &str) -> String {
    text.replace('|', "\\|")
}

/// Generate the report footer.
fn generate_footer() -> String {
    let mut footer = String::new();

    footer.push_str("---\n\n");
    footer.push_str("*Report generated by offset-report*\n");

    footer
}

/// JSON view of a table: labels and formatted cells.
#[derive(Debug, Serialize)]
struct TableSnapshot<'a> {
    id: &'a str,
    title: &'a str,
    columns: Vec<&'a str>,
    rows: Vec<RowSnapshot>,
    footer: Vec<RowSnapshot>,
}

#[derive(Debug, Serialize)]
struct RowSnapshot {
    #[serde(skip_serializing_if = "Option::is_none")]
    key: Option<String>,
    cells: Vec<String>,
    signs: Vec<Sign>,
}

#[derive(Debug, Serialize)]
struct ReportSnapshot<'a> {
    metadata: &'a ReportMetadata,
    selection: &'a [String],
    tables: Vec<TableSnapshot<'a>>,
}

fn snapshot_row(table: &Table, row: &super::table::Row) -> RowSnapshot {
    RowSnapshot {
        key: row.key.clone(),
        cells: row
            .cells
            .iter()
            .enumerate()
            .map(|(i, c)| table.display(i, c))
            .collect(),
        signs: row
            .cells
            .iter()
            .enumerate()
            .map(|(i, c)| table.sign(i, c))
            .collect(),
    }
}

/// Generate a JSON report.
pub fn generate_json_report(report: &Report) -> Result<String> {
    let tables = report
        .tables
        .iter()
        .map(|table| TableSnapshot {
            id: &table.id,
            title: &table.title,
            columns: table.columns.iter().map(|c| c.label.as_str()).collect(),
            rows: table.rows.iter().map(|r| snapshot_row(table, r)).collect(),
            footer: table.footer.iter().map(|r| snapshot_row(table, r)).collect(),
        })
        .collect();

    let snapshot = ReportSnapshot {
        metadata: &report.metadata,
        selection: &report.selection,
        tables,
    };
    serde_json::to_string_pretty(&snapshot).map_err(Into::into)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::{EngineOptions, ImpactSign, ReportState};
    use crate::input::{parse_benefits, parse_muni_data, parse_parcel_data};
    use crate::models::{ReportInputs, ServiceKey};
    use crate::report::table::ProjectionOptions;
    use crate::schema::TableSchema;
    use chrono::Utc;

    fn create_test_report() -> Report {
        let inputs = ReportInputs {
            contributions: parse_parcel_data(
                r#"{"101": {"municipalities": {"Springfield": 0.5}, "Sediment": 40}}"#,
            )
            .unwrap(),
            municipalities: parse_muni_data(
                r#"{"Springfield": {"pop": 10},
                    "Shelbyville": {"pop": 5, "impacts": {"Sediment impact": -2}}}"#,
            )
            .unwrap(),
            benefits: parse_benefits(
                r#"{"parcels": [{"id": 101, "area": 3, "eco_type": "wetland"}],
                    "ecosystems": [{"eco_type": "wetland", "required_offset": 10}]}"#,
            )
            .unwrap(),
        };
        let services = vec![ServiceKey::new("sediment")];
        let mut state = ReportState::initialize(
            inputs,
            EngineOptions {
                services: services.clone(),
                impact_sign: ImpactSign::AsAuthored,
            },
        );
        state.select_parcel("101").unwrap();

        let metadata = ReportMetadata {
            title: "Offset Portfolio Report".to_string(),
            generated_at: Utc::now(),
            services: vec!["Sediment".to_string()],
            parcels_total: 1,
            parcels_selected: 1,
            municipalities_tracked: 2,
            toggles_applied: 1,
            toggles_rejected: 1,
        };
        Report::build(
            &state,
            &TableSchema::municipality(&services, Some(2)),
            &ProjectionOptions::default(),
            metadata,
            None,
        )
    }

    #[test]
    fn test_generate_markdown_report() {
        let report = create_test_report();
        let markdown = generate_markdown_report(&report);

        assert!(markdown.contains("# Offset Portfolio Report"));
        assert!(markdown.contains("## Metadata"));
        assert!(markdown.contains("- **Toggles Skipped:** 1"));
        assert!(markdown.contains("`101`"));
        assert!(markdown.contains("## Hydrological servicesheds"));
        assert!(markdown.contains("| Springfield | 10 | 0.00 | 20.00 | 20.00 | 200.00 |"));
        assert!(markdown.contains("🔴 -7.00"));
        assert!(markdown.contains("## Global benefits\n\n*No rows.*"));
    }

    #[test]
    fn test_generate_json_report() {
        let report = create_test_report();
        let json = generate_json_report(&report).unwrap();
        let value: serde_json::Value = serde_json::from_str(&json).unwrap();

        assert_eq!(value["selection"][0], "101");
        assert_eq!(value["tables"][1]["id"], "muni_table");
        assert_eq!(value["tables"][1]["footer"][0]["cells"][0], "Total");
        assert_eq!(value["tables"][2]["rows"][0]["signs"][3], "negative");
    }

    #[test]
    fn test_escape_pipe() {
        assert_eq!(escape_pipe("a|b"), "a\\|b");
    }
}
