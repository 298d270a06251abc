//! Column descriptors for the municipality table.
//!
//! Each column knows its category (name, population, impact, offset, net,
//! population-adjusted net), the service it belongs to and how it is
//! formatted. The schema is built once, either from the default service
//! list or from class-list labels such as `services_offset_sediment offsets
//! round2`, and the engine routes values through it instead of looking at
//! rendered labels.

use crate::config::{ColumnConfig, SchemaConfig};
use crate::format::FormatSpec;
use crate::models::ServiceKey;
use serde::{Deserialize, Serialize};
use std::fmt;
use tracing::debug;

/// What a municipality-table column shows.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ColumnCategory {
    /// Municipality name.
    Name,
    /// Population size.
    Count,
    Impact,
    Offset,
    Net,
    /// Net multiplied by population.
    NetAdj,
    /// Anything the engine does not know how to populate.
    Other(String),
}

impl ColumnCategory {
    fn from_class_parts(category: &str, detail: &str) -> Self {
        match (category, detail) {
            ("pop", "name") => ColumnCategory::Name,
            ("pop", "count") => ColumnCategory::Count,
            ("impact", _) => ColumnCategory::Impact,
            ("offset", _) => ColumnCategory::Offset,
            ("net", _) => ColumnCategory::Net,
            ("netadj", _) => ColumnCategory::NetAdj,
            (other, _) => ColumnCategory::Other(other.to_string()),
        }
    }

    fn class_token(&self) -> &str {
        match self {
            ColumnCategory::Name | ColumnCategory::Count => "pop",
            ColumnCategory::Impact => "impact",
            ColumnCategory::Offset => "offset",
            ColumnCategory::Net => "net",
            ColumnCategory::NetAdj => "netadj",
            ColumnCategory::Other(other) => other,
        }
    }

    fn is_per_service(&self) -> bool {
        matches!(
            self,
            ColumnCategory::Impact
                | ColumnCategory::Offset
                | ColumnCategory::Net
                | ColumnCategory::NetAdj
        )
    }
}

impl fmt::Display for ColumnCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.class_token())
    }
}

/// A typed column descriptor.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ColumnSpec {
    /// Header text.
    pub label: String,
    pub category: ColumnCategory,
    /// Service the column belongs to (per-service categories only).
    pub service: Option<ServiceKey>,
    pub format: FormatSpec,
    /// Center cell contents.
    pub centered: bool,
}

impl ColumnSpec {
    pub fn new(
        label: impl Into<String>,
        category: ColumnCategory,
        service: Option<ServiceKey>,
    ) -> Self {
        Self {
            label: label.into(),
            category,
            service,
            format: FormatSpec::default(),
            centered: false,
        }
    }

    pub fn with_format(mut self, format: FormatSpec) -> Self {
        self.format = format;
        self
    }

    /// Build a column from a class list such as
    /// `services_netadj_sediment population round2`.
    ///
    /// The first token encodes `services_<category>_<service>`; `round<N>`,
    /// `scientific` and `tdcenter` set formatting, and `net`/`population`
    /// turn on sign styling.
    pub fn from_class_list(label: &str, class_list: &str) -> Self {
        let mut tokens = class_list.split_whitespace();
        let detailed = tokens.next().unwrap_or_default();

        let mut parts = detailed.splitn(3, '_');
        let _prefix = parts.next();
        let category_part = parts.next().unwrap_or_default();
        let detail_part = parts.next().unwrap_or_default();

        let category = ColumnCategory::from_class_parts(category_part, detail_part);
        let service = if category.is_per_service() && !detail_part.is_empty() {
            Some(ServiceKey::new(detail_part))
        } else {
            None
        };

        let mut column = ColumnSpec::new(label, category, service);
        for token in tokens {
            match token {
                "scientific" => column.format.scientific = true,
                "tdcenter" => column.centered = true,
                "net" | "population" => column.format.signed = true,
                _ => {
                    if let Some(digits) = token.strip_prefix("round") {
                        if let Ok(digits) = digits.parse::<usize>() {
                            column.format.round = Some(digits);
                        }
                    }
                }
            }
        }

        debug!(
            "Parsed column '{}' as {} ({:?})",
            column.label, column.category, column.service
        );
        column
    }

    /// Class list equivalent of this descriptor.
    pub fn class_list(&self) -> String {
        let detail = match (&self.category, &self.service) {
            (ColumnCategory::Name, _) => "name".to_string(),
            (ColumnCategory::Count, _) => "count".to_string(),
            (_, Some(service)) => service.as_str().to_string(),
            (_, None) => String::new(),
        };

        let mut classes = vec![format!("services_{}_{}", self.category, detail)];
        if self.format.signed {
            classes.push(match self.category {
                ColumnCategory::NetAdj => "population".to_string(),
                _ => "net".to_string(),
            });
        }
        if let Some(digits) = self.format.round {
            classes.push(format!("round{}", digits));
        }
        if self.format.scientific {
            classes.push("scientific".to_string());
        }
        if self.centered {
            classes.push("tdcenter".to_string());
        }
        classes.join(" ")
    }
}

/// Ordered column descriptors of the municipality table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TableSchema {
    pub columns: Vec<ColumnSpec>,
}

impl TableSchema {
    /// Default municipality columns for a list of services: name,
    /// population, then impacts, offsets, nets and population-adjusted
    /// nets, one per service.
    pub fn municipality(services: &[ServiceKey], round_digits: Option<usize>) -> Self {
        let numeric = FormatSpec::rounded(round_digits);

        let mut columns = vec![
            ColumnSpec::new("Population center", ColumnCategory::Name, None),
            ColumnSpec::new("Population size", ColumnCategory::Count, None),
        ];

        for service in services {
            columns.push(
                ColumnSpec::new(service.impact_key(), ColumnCategory::Impact, Some(service.clone()))
                    .with_format(numeric),
            );
        }
        for service in services {
            columns.push(
                ColumnSpec::new(
                    format!("{} offset", service.capitalized()),
                    ColumnCategory::Offset,
                    Some(service.clone()),
                )
                .with_format(numeric),
            );
        }
        for service in services {
            columns.push(
                ColumnSpec::new(net_label(service), ColumnCategory::Net, Some(service.clone()))
                    .with_format(numeric.signed()),
            );
        }
        for service in services {
            columns.push(
                ColumnSpec::new(
                    net_population_label(service),
                    ColumnCategory::NetAdj,
                    Some(service.clone()),
                )
                .with_format(numeric.signed()),
            );
        }

        Self { columns }
    }

    /// Schema from explicit `(label, class)` pairs.
    pub fn from_columns(columns: &[ColumnConfig]) -> Self {
        Self {
            columns: columns
                .iter()
                .map(|c| ColumnSpec::from_class_list(&c.label, &c.class))
                .collect(),
        }
    }

    /// Switch the named columns to scientific notation.
    pub fn mark_scientific(&mut self, labels: &[String]) {
        for column in &mut self.columns {
            if labels.iter().any(|l| l.eq_ignore_ascii_case(&column.label)) {
                column.format.scientific = true;
            }
        }
    }

    /// Distinct services referenced by the columns, in column order.
    pub fn services(&self) -> Vec<ServiceKey> {
        let mut services: Vec<ServiceKey> = Vec::new();
        for service in self.columns.iter().filter_map(|c| c.service.as_ref()) {
            if !services.contains(service) {
                services.push(service.clone());
            }
        }
        services
    }

    pub fn column(&self, category: &ColumnCategory, service: &ServiceKey) -> Option<&ColumnSpec> {
        self.columns
            .iter()
            .find(|c| &c.category == category && c.service.as_ref() == Some(service))
    }
}

impl From<&SchemaConfig> for TableSchema {
    fn from(config: &SchemaConfig) -> Self {
        let mut schema = if config.columns.is_empty() {
            let services: Vec<ServiceKey> =
                config.services.iter().map(|s| ServiceKey::new(s)).collect();
            TableSchema::municipality(&services, config.round_digits)
        } else {
            TableSchema::from_columns(&config.columns)
        };
        schema.mark_scientific(&config.scientific);
        schema
    }
}

fn net_label(service: &ServiceKey) -> String {
    match service.as_str() {
        "sediment" | "nitrogen" => format!("Net {} retention benefits", service.as_str()),
        "custom" => "Net custom ES benefits".to_string(),
        other => format!("Net {} benefits", other),
    }
}

fn net_population_label(service: &ServiceKey) -> String {
    match service.as_str() {
        "custom" => "Net custom ES x population".to_string(),
        other => format!("Net {} x population", other),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_class_list() {
        let column = ColumnSpec::from_class_list(
            "Net sediment x population",
            "services_netadj_sediment population round2",
        );
        assert_eq!(column.category, ColumnCategory::NetAdj);
        assert_eq!(column.service, Some(ServiceKey::new("sediment")));
        assert_eq!(column.format.round, Some(2));
        assert!(column.format.signed);
        assert!(!column.format.scientific);

        let name = ColumnSpec::from_class_list("Population center", "services_pop_name");
        assert_eq!(name.category, ColumnCategory::Name);
        assert_eq!(name.service, None);

        let count = ColumnSpec::from_class_list("Population size", "services_pop_count tdcenter");
        assert_eq!(count.category, ColumnCategory::Count);
        assert!(count.centered);
    }

    #[test]
    fn test_unknown_category() {
        let column = ColumnSpec::from_class_list("Mystery", "services_ratio_sediment scientific");
        assert_eq!(column.category, ColumnCategory::Other("ratio".to_string()));
        assert!(column.format.scientific);
        assert_eq!(column.service, None);
    }

    #[test]
    fn test_default_municipality_schema() {
        let services = vec![ServiceKey::new("sediment"), ServiceKey::new("nutrient")];
        let schema = TableSchema::municipality(&services, Some(2));

        assert_eq!(schema.columns.len(), 2 + 4 * 2);
        assert_eq!(schema.columns[2].label, "Sediment impact");
        assert_eq!(schema.columns[5].label, "Nitrogen offset");
        assert_eq!(schema.columns[6].label, "Net sediment retention benefits");
        assert_eq!(schema.columns[9].label, "Net nitrogen x population");
        assert_eq!(schema.services(), services);

        let net = schema
            .column(&ColumnCategory::Net, &ServiceKey::new("nitrogen"))
            .unwrap();
        assert!(net.format.signed);
        assert_eq!(net.class_list(), "services_net_nitrogen net round2");
    }

    #[test]
    fn test_class_list_round_trip() {
        let schema = TableSchema::municipality(&[ServiceKey::new("custom")], Some(2));
        for column in &schema.columns {
            let reparsed = ColumnSpec::from_class_list(&column.label, &column.class_list());
            assert_eq!(&reparsed, column);
        }
    }

    #[test]
    fn test_schema_from_config() {
        let config = SchemaConfig {
            services: vec!["sediment".to_string()],
            round_digits: Some(1),
            scientific: vec!["Population size".to_string()],
            columns: Vec::new(),
        };
        let schema = TableSchema::from(&config);
        assert!(schema.columns[1].format.scientific);
        assert_eq!(schema.columns[2].format.round, Some(1));
    }
}
