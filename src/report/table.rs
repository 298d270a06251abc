//! Projection of the engine state into presentational tables.
//!
//! Rows are keyed by their data-model key (municipality name, ecosystem
//! type, service, parcel id), so renderers never have to search rendered
//! text to find the row a value belongs to.

use crate::engine::{MunicipalityState, ReportState};
use crate::format::{classify_sign, format_for_display, CellValue, FormatSpec, Sign};
use crate::models::ServiceKey;
use crate::schema::{ColumnCategory, ColumnSpec, TableSchema};
use serde::Serialize;
use tracing::warn;

/// A rendered column.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Column {
    pub label: String,
    pub format: FormatSpec,
    pub centered: bool,
    /// Class list naming the column's category and service, e.g.
    /// `services_net_sediment net round2`. Empty for fixed tables.
    pub class: String,
}

impl Column {
    pub fn new(label: impl Into<String>, format: FormatSpec) -> Self {
        Self {
            label: label.into(),
            format,
            centered: false,
            class: String::new(),
        }
    }

    pub fn centered(mut self) -> Self {
        self.centered = true;
        self
    }
}

impl From<&ColumnSpec> for Column {
    fn from(spec: &ColumnSpec) -> Self {
        Self {
            label: spec.label.clone(),
            format: spec.format,
            centered: spec.centered,
            class: spec.class_list(),
        }
    }
}

/// One table row.
#[derive(Debug, Clone, PartialEq)]
pub struct Row {
    /// Data-model key of the row; `None` for footer rows.
    pub key: Option<String>,
    pub cells: Vec<CellValue>,
}

/// A projected table.
#[derive(Debug, Clone, PartialEq)]
pub struct Table {
    /// HTML id, e.g. `muni_table`.
    pub id: String,
    pub title: String,
    pub columns: Vec<Column>,
    pub rows: Vec<Row>,
    /// Totals rows rendered after the data rows.
    pub footer: Vec<Row>,
    /// The first column holds selection checkboxes.
    pub checkbox: bool,
}

impl Table {
    fn new(id: &str, title: &str, columns: Vec<Column>) -> Self {
        Self {
            id: id.to_string(),
            title: title.to_string(),
            columns,
            rows: Vec::new(),
            footer: Vec::new(),
            checkbox: false,
        }
    }

    /// Display text of a cell in the given column.
    pub fn display(&self, column: usize, value: &CellValue) -> String {
        match self.columns.get(column) {
            Some(col) => format_for_display(value, &col.format),
            None => format_for_display(value, &FormatSpec::default()),
        }
    }

    /// Sign class of a cell, only for columns that are styled by sign.
    pub fn sign(&self, column: usize, value: &CellValue) -> Sign {
        match self.columns.get(column) {
            Some(col) if col.format.signed => classify_sign(value),
            _ => Sign::None,
        }
    }

    /// Formatted text of every data and footer row.
    pub fn formatted_rows(&self) -> Vec<Vec<String>> {
        self.rows
            .iter()
            .chain(&self.footer)
            .map(|row| {
                row.cells
                    .iter()
                    .enumerate()
                    .map(|(i, cell)| self.display(i, cell))
                    .collect()
            })
            .collect()
    }

}

/// Layout choices that do not come from the schema.
#[derive(Debug, Clone, Copy)]
pub struct ProjectionOptions {
    pub round_digits: Option<usize>,
    pub include_parcel_totals: bool,
}

impl Default for ProjectionOptions {
    fn default() -> Self {
        Self {
            round_digits: Some(2),
            include_parcel_totals: true,
        }
    }
}

/// The four report tables.
#[derive(Debug, Clone, PartialEq)]
pub struct ReportTables {
    pub parcels: Table,
    pub municipalities: Table,
    pub biodiversity: Table,
    pub global_benefits: Table,
}

impl ReportTables {
    pub fn project(state: &ReportState, schema: &TableSchema, options: &ProjectionOptions) -> Self {
        Self {
            parcels: parcel_table(state, options),
            municipalities: municipality_table(state, schema),
            biodiversity: biodiversity_table(state, options.round_digits),
            global_benefits: global_benefits_table(state, options.round_digits),
        }
    }

    /// Tables in report order.
    pub fn iter(&self) -> impl Iterator<Item = &Table> {
        [
            &self.parcels,
            &self.municipalities,
            &self.biodiversity,
            &self.global_benefits,
        ]
        .into_iter()
    }
}

/// Municipality (hydrological servicesheds) table with its totals row.
pub fn municipality_table(state: &ReportState, schema: &TableSchema) -> Table {
    let columns = schema.columns.iter().map(Column::from).collect();
    let mut table = Table::new("muni_table", "Hydrological servicesheds", columns);

    for muni in state.municipalities() {
        let cells = schema
            .columns
            .iter()
            .map(|column| municipality_cell(muni, column))
            .collect();
        table.rows.push(Row {
            key: Some(muni.name.clone()),
            cells,
        });
    }

    let totals = schema
        .columns
        .iter()
        .map(|column| match (&column.category, &column.service) {
            (ColumnCategory::Name, _) => CellValue::from("Total"),
            (ColumnCategory::NetAdj, Some(service)) => CellValue::Number(state.aggregate(service)),
            _ => CellValue::Placeholder,
        })
        .collect();
    table.footer.push(Row {
        key: None,
        cells: totals,
    });

    table
}

fn municipality_cell(muni: &MunicipalityState, column: &ColumnSpec) -> CellValue {
    match (&column.category, &column.service) {
        (ColumnCategory::Name, _) => CellValue::Text(muni.name.clone()),
        (ColumnCategory::Count, _) => CellValue::Number(muni.population),
        (ColumnCategory::Impact, Some(service)) => CellValue::Number(muni.impact(service)),
        (ColumnCategory::Offset, Some(service)) => CellValue::Number(muni.offset(service)),
        (ColumnCategory::Net, Some(service)) => CellValue::Number(muni.net(service)),
        (ColumnCategory::NetAdj, Some(service)) => CellValue::Number(muni.population_net(service)),
        (category, _) => {
            warn!(
                "Cannot populate column '{}' ({}) for municipality '{}'",
                column.label, category, muni.name
            );
            CellValue::Empty
        }
    }
}

/// Biodiversity table: required offset, selected area and net per
/// ecosystem type.
pub fn biodiversity_table(state: &ReportState, round_digits: Option<usize>) -> Table {
    let numeric = FormatSpec::rounded(round_digits);
    let columns = vec![
        Column::new("Ecosystem type", FormatSpec::default()),
        Column::new("Required offset", numeric),
        Column::new("Area offset", numeric),
        Column::new("Net", numeric.signed()),
    ];
    let mut table = Table::new("bio_table", "Biodiversity", columns);

    for eco in state.ecosystems() {
        table.rows.push(Row {
            key: Some(eco.eco_type.clone()),
            cells: vec![
                CellValue::Text(eco.eco_type.clone()),
                CellValue::Number(eco.required_offset),
                CellValue::Number(eco.offset),
                CellValue::Number(eco.net()),
            ],
        });
    }
    table
}

/// Global benefits table: impact, selected offset and net per service.
pub fn global_benefits_table(state: &ReportState, round_digits: Option<usize>) -> Table {
    let numeric = FormatSpec::rounded(round_digits);
    let columns = vec![
        Column::new("Service type", FormatSpec::default()),
        Column::new("Impacts to service", numeric),
        Column::new("Selected offset", numeric),
        Column::new("Net service", numeric.signed()),
    ];
    let mut table = Table::new("global_benefits_table", "Global benefits", columns);

    for service in state.global_services() {
        table.rows.push(Row {
            key: Some(service.service.as_str().to_string()),
            cells: vec![
                CellValue::Text(service.service.capitalized()),
                CellValue::Number(service.impact),
                CellValue::Number(service.offset),
                CellValue::Number(service.net()),
            ],
        });
    }
    table
}

/// Parcel table with constant and selected totals.
pub fn parcel_table(state: &ReportState, options: &ProjectionOptions) -> Table {
    let numeric = FormatSpec::rounded(options.round_digits);
    let services = parcel_services(state);

    let mut columns = vec![
        Column::new("Selected", FormatSpec::default()).centered(),
        Column::new("Parcel ID", FormatSpec::default()),
    ];
    for service in &services {
        columns.push(Column::new(service.capitalized(), numeric));
    }
    columns.push(Column::new("Area", numeric));
    columns.push(Column::new("Ecosystem type", FormatSpec::default()));

    let mut table = Table::new("parcel_table", "Offset parcels", columns);
    table.checkbox = true;

    let mut all_totals = vec![0.0; services.len() + 1];
    let mut selected_totals = vec![0.0; services.len() + 1];

    for id in state.parcel_ids() {
        let selected = state.is_selected(&id);
        let row = state.parcels().iter().find(|p| p.id == id);
        let contribution = state.contribution(&id);

        let mut values: Vec<f64> = services
            .iter()
            .map(|service| {
                row.and_then(|r| r.service_value(service))
                    .or_else(|| contribution.map(|c| c.service_offset(service)))
                    .unwrap_or(0.0)
            })
            .collect();
        values.push(row.map(|r| r.area).unwrap_or(0.0));

        for (i, value) in values.iter().enumerate() {
            all_totals[i] += value;
            if selected {
                selected_totals[i] += value;
            }
        }

        let mut cells = vec![
            CellValue::Text(if selected { "1" } else { "0" }.to_string()),
            CellValue::Text(id.clone()),
        ];
        cells.extend(values.into_iter().map(CellValue::Number));
        cells.push(CellValue::Text(
            row.map(|r| r.eco_type.clone()).unwrap_or_default(),
        ));

        table.rows.push(Row {
            key: Some(id),
            cells,
        });
    }

    if options.include_parcel_totals {
        for (label, totals) in [("Total", all_totals), ("Selected total", selected_totals)] {
            let mut cells = vec![CellValue::Empty, CellValue::from(label)];
            cells.extend(totals.into_iter().map(CellValue::Number));
            cells.push(CellValue::Placeholder);
            table.footer.push(Row { key: None, cells });
        }
    }

    table
}

/// Service columns of the parcel table: the municipality services, then
/// any other numeric columns of the parcel rows.
fn parcel_services(state: &ReportState) -> Vec<ServiceKey> {
    let mut services: Vec<ServiceKey> = state.services().to_vec();
    for global in state.global_services() {
        if !services.contains(&global.service) {
            services.push(global.service.clone());
        }
    }
    for row in state.parcels() {
        for (name, value) in &row.values {
            let key = ServiceKey::new(name);
            if value.is_number() && !services.contains(&key) {
                services.push(key);
            }
        }
    }
    services
}
