//! CSV export of a rendered table.
//!
//! Cells are joined with placeholder delimiters first (vertical tab between
//! columns, NUL between rows) and the placeholders are swapped for the real
//! `","` / `"\r\n"` delimiters at the end, so commas and line breaks inside
//! cell text never split a cell.

use super::table::Table;

const TMP_COL_DELIM: char = '\u{0B}';
const TMP_ROW_DELIM: char = '\u{00}';
const COL_DELIM: &str = "\",\"";
const ROW_DELIM: &str = "\"\r\n\"";

/// Serialize a table as CSV: a header row, then data and footer rows.
///
/// Checkbox cells are written as their underlying value (`1`/`0`).
pub fn export_csv(table: &Table) -> String {
    let header: Vec<String> = table.columns.iter().map(|c| c.label.clone()).collect();

    let rows: Vec<String> = std::iter::once(header)
        .chain(table.formatted_rows())
        .map(|cells| {
            cells
                .iter()
                .map(|cell| escape_cell(cell))
                .collect::<Vec<_>>()
                .join(&TMP_COL_DELIM.to_string())
        })
        .collect();

    let joined = rows.join(&TMP_ROW_DELIM.to_string());
    format!(
        "\"{}\"",
        joined
            .replace(TMP_ROW_DELIM, ROW_DELIM)
            .replace(TMP_COL_DELIM, COL_DELIM)
    )
}

/// Double embedded quotes and drop stray placeholder characters.
fn escape_cell(value: &str) -> String {
    value
        .chars()
        .filter(|c| *c != TMP_COL_DELIM && *c != TMP_ROW_DELIM)
        .collect::<String>()
        .replace('"', "\"\"")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::format::{CellValue, FormatSpec};
    use crate::report::table::{Column, Row};

    fn create_test_table() -> Table {
        Table {
            id: "parcel_table".to_string(),
            title: "Offset parcels".to_string(),
            columns: vec![
                Column::new("Selected", FormatSpec::default()),
                Column::new("Parcel ID", FormatSpec::default()),
                Column::new("Carbon", FormatSpec::rounded(Some(2))),
                Column::new("Ecosystem type", FormatSpec::default()),
            ],
            rows: vec![
                Row {
                    key: Some("101".to_string()),
                    cells: vec![
                        CellValue::from("1"),
                        CellValue::from("101"),
                        CellValue::Number(1234.5),
                        CellValue::from("wet \"lowland\" forest"),
                    ],
                },
                Row {
                    key: Some("102".to_string()),
                    cells: vec![
                        CellValue::from("0"),
                        CellValue::from("102"),
                        CellValue::Number(3.0),
                        CellValue::from("grassland, dry"),
                    ],
                },
            ],
            footer: Vec::new(),
            checkbox: true,
        }
    }

    #[test]
    fn test_export_csv() {
        let csv = export_csv(&create_test_table());
        let lines: Vec<&str> = csv.split("\r\n").collect();

        assert_eq!(lines.len(), 3);
        assert_eq!(lines[0], "\"Selected\",\"Parcel ID\",\"Carbon\",\"Ecosystem type\"");
        assert_eq!(
            lines[1],
            "\"1\",\"101\",\"1,234.50\",\"wet \"\"lowland\"\" forest\""
        );
        assert_eq!(lines[2], "\"0\",\"102\",\"3.00\",\"grassland, dry\"");
    }

    #[test]
    fn test_escape_cell() {
        assert_eq!(escape_cell("a\"b\"c"), "a\"\"b\"\"c");
        assert_eq!(escape_cell("tab\u{0B}bed"), "tabbed");
    }
}
