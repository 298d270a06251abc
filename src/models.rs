//! Data models for the offset report.
//!
//! This module contains the input documents the report generator embeds
//! (parcel contributions, municipality baselines, benefits tables) and the
//! small value types shared by the engine and the renderers.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// A normalized ecosystem-service name.
///
/// Keys are stored lower-case so that `Sediment`, `sediment` and the
/// `services_offset_sediment` column class all refer to the same service.
/// `nutrient` is accepted as an alias of `nitrogen`.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub struct ServiceKey(String);

impl ServiceKey {
    /// Creates a normalized service key.
    pub fn new(name: &str) -> Self {
        let lower = name.trim().to_lowercase();
        match lower.as_str() {
            "nutrient" => Self("nitrogen".to_string()),
            _ => Self(lower),
        }
    }

    /// Returns the lower-case key.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Returns the sentence-case display name (`sediment` -> `Sediment`).
    pub fn capitalized(&self) -> String {
        let mut chars = self.0.chars();
        match chars.next() {
            Some(first) => first.to_uppercase().chain(chars).collect(),
            None => String::new(),
        }
    }

    /// Returns the key used for this service in municipality impact maps.
    pub fn impact_key(&self) -> String {
        format!("{} impact", self.capitalized())
    }

    /// Whether a free-form label names this service.
    pub fn matches(&self, label: &str) -> bool {
        ServiceKey::new(label) == *self
    }
}

impl fmt::Display for ServiceKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.capitalized())
    }
}

impl From<&str> for ServiceKey {
    fn from(s: &str) -> Self {
        ServiceKey::new(s)
    }
}

impl From<String> for ServiceKey {
    fn from(s: String) -> Self {
        ServiceKey::new(&s)
    }
}

impl From<ServiceKey> for String {
    fn from(key: ServiceKey) -> Self {
        key.0
    }
}

/// Parcel identifiers may be authored as JSON strings or numbers.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum ParcelRef {
    Text(String),
    Integer(i64),
    Float(f64),
}

impl From<ParcelRef> for String {
    fn from(id: ParcelRef) -> Self {
        match id {
            ParcelRef::Text(s) => s,
            ParcelRef::Integer(i) => i.to_string(),
            ParcelRef::Float(f) => f.to_string(),
        }
    }
}

fn deserialize_parcel_id<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    ParcelRef::deserialize(deserializer).map(String::from)
}

/// One parcel's contribution to the municipalities it overlaps.
///
/// Any key other than `municipalities` is a per-service offset magnitude,
/// e.g. `{"municipalities": {"Springfield": 0.5}, "Sediment": 12.0}`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ParcelContribution {
    /// Fractional share (0-1) of the parcel's contribution per municipality.
    #[serde(default)]
    pub municipalities: BTreeMap<String, f64>,
    /// Per-service offset magnitudes.
    #[serde(flatten)]
    pub services: BTreeMap<String, serde_json::Value>,
}

impl ParcelContribution {
    /// Offset magnitude for a service. Missing or non-numeric values count as zero.
    pub fn service_offset(&self, service: &ServiceKey) -> f64 {
        self.services
            .iter()
            .find(|(name, _)| service.matches(name))
            .and_then(|(_, value)| value.as_f64())
            .unwrap_or(0.0)
    }
}

/// Reference data for one municipality.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MunicipalityBaseline {
    /// Population count.
    #[serde(default)]
    pub pop: Option<f64>,
    /// Baseline impacts keyed `"<Service> impact"`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub impacts: Option<BTreeMap<String, f64>>,
}

impl MunicipalityBaseline {
    /// Population, zero when the generator left it blank.
    pub fn population(&self) -> f64 {
        self.pop.unwrap_or(0.0)
    }

    /// Baseline impact for a service, as authored.
    pub fn impact(&self, service: &ServiceKey) -> f64 {
        let key = service.impact_key();
        self.impacts
            .as_ref()
            .and_then(|impacts| {
                impacts
                    .iter()
                    .find(|(name, _)| name.eq_ignore_ascii_case(&key))
                    .map(|(_, value)| *value)
            })
            .unwrap_or(0.0)
    }

    /// Whether at least one baseline impact is nonzero.
    pub fn has_baseline(&self) -> bool {
        self.impacts
            .as_ref()
            .map(|impacts| impacts.values().any(|v| *v != 0.0))
            .unwrap_or(false)
    }
}

/// A row of the selectable parcel table.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ParcelRow {
    /// Parcel identifier.
    #[serde(deserialize_with = "deserialize_parcel_id")]
    pub id: String,
    /// Parcel area, offset against the biodiversity requirement.
    #[serde(default)]
    pub area: f64,
    /// Ecosystem type the area counts toward.
    #[serde(default)]
    pub eco_type: String,
    /// Remaining columns (service values such as `carbon`).
    #[serde(flatten)]
    pub values: BTreeMap<String, serde_json::Value>,
}

impl ParcelRow {
    /// Numeric value of a service column, if present.
    pub fn service_value(&self, service: &ServiceKey) -> Option<f64> {
        self.values
            .iter()
            .find(|(name, _)| service.matches(name))
            .and_then(|(_, value)| value.as_f64())
    }
}

/// Required offset for one ecosystem type.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EcoTypeTarget {
    pub eco_type: String,
    #[serde(default)]
    pub required_offset: f64,
}

/// Baseline impact for a service of the global benefits table.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GlobalServiceBaseline {
    pub service: ServiceKey,
    #[serde(default)]
    pub impact: f64,
}

/// Parcel table plus the fixed biodiversity and global-benefit targets.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct BenefitsDocument {
    #[serde(default)]
    pub parcels: Vec<ParcelRow>,
    #[serde(default)]
    pub ecosystems: Vec<EcoTypeTarget>,
    #[serde(default)]
    pub global_services: Vec<GlobalServiceBaseline>,
}

/// Everything the engine reads once at startup.
#[derive(Debug, Clone, Default)]
pub struct ReportInputs {
    /// Parcel id -> contribution.
    pub contributions: BTreeMap<String, ParcelContribution>,
    /// Municipality name -> baseline.
    pub municipalities: BTreeMap<String, MunicipalityBaseline>,
    pub benefits: BenefitsDocument,
}

/// Metadata about a rendered report.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReportMetadata {
    /// Report title.
    pub title: String,
    /// Date and time the report was rendered.
    pub generated_at: DateTime<Utc>,
    /// Services tracked in the municipality table.
    pub services: Vec<String>,
    /// Number of parcels available for selection.
    pub parcels_total: usize,
    /// Number of parcels selected.
    pub parcels_selected: usize,
    /// Number of municipalities with a row in the table.
    pub municipalities_tracked: usize,
    /// Toggles applied successfully.
    pub toggles_applied: usize,
    /// Toggles skipped with an error.
    pub toggles_rejected: usize,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_service_key_normalization() {
        assert_eq!(ServiceKey::new("Sediment"), ServiceKey::new("sediment"));
        assert_eq!(ServiceKey::new("nutrient").as_str(), "nitrogen");
        assert_eq!(ServiceKey::new("carbon").capitalized(), "Carbon");
        assert_eq!(ServiceKey::new("custom").impact_key(), "Custom impact");
    }

    #[test]
    fn test_parse_contribution() {
        let json = r#"{"municipalities": {"Springfield": 0.5}, "Carbon": 40, "Note": "x"}"#;
        let contribution: ParcelContribution = serde_json::from_str(json).unwrap();

        assert_eq!(contribution.municipalities.get("Springfield"), Some(&0.5));
        assert_eq!(contribution.service_offset(&"carbon".into()), 40.0);
        assert_eq!(contribution.service_offset(&"sediment".into()), 0.0);
        assert_eq!(contribution.service_offset(&"note".into()), 0.0);
    }

    #[test]
    fn test_baseline_impacts() {
        let json = r#"{"pop": 1200, "impacts": {"Sediment impact": -3.5, "Nitrogen impact": 0.0}}"#;
        let baseline: MunicipalityBaseline = serde_json::from_str(json).unwrap();

        assert!(baseline.has_baseline());
        assert_eq!(baseline.population(), 1200.0);
        assert_eq!(baseline.impact(&"sediment".into()), -3.5);
        assert_eq!(baseline.impact(&"custom".into()), 0.0);

        let quiet: MunicipalityBaseline = serde_json::from_str(r#"{"pop": null}"#).unwrap();
        assert!(!quiet.has_baseline());
        assert_eq!(quiet.population(), 0.0);
    }

    #[test]
    fn test_parcel_row_numeric_id() {
        let json = r#"{"id": 101, "area": 30, "eco_type": "wetland", "carbon": 12.5}"#;
        let row: ParcelRow = serde_json::from_str(json).unwrap();

        assert_eq!(row.id, "101");
        assert_eq!(row.eco_type, "wetland");
        assert_eq!(row.service_value(&"Carbon".into()), Some(12.5));
        assert_eq!(row.service_value(&"custom".into()), None);
    }
}
