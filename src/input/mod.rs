//! Loading of the report's input documents.
//!
//! The report generator hands over two JSON documents (parcel contributions
//! and municipality baselines) plus an optional benefits document holding
//! the parcel table and the biodiversity / global-service targets.

use crate::error::InputIssue;
use crate::models::{
    BenefitsDocument, MunicipalityBaseline, ParcelContribution, ParcelRef, ReportInputs,
};
use anyhow::{Context, Result};
use std::collections::{BTreeMap, BTreeSet};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// Where to find the input documents.
#[derive(Debug, Clone)]
pub struct InputPaths {
    /// Parcel id -> municipality shares and service magnitudes.
    pub parcel_data: PathBuf,
    /// Municipality name -> population and baseline impacts.
    pub muni_data: PathBuf,
    /// Parcel table, ecosystem targets and global services.
    pub benefits: Option<PathBuf>,
}

impl From<&crate::cli::Args> for InputPaths {
    fn from(args: &crate::cli::Args) -> Self {
        Self {
            parcel_data: args.parcel_data.clone().unwrap_or_default(),
            muni_data: args.muni_data.clone().unwrap_or_default(),
            benefits: args.benefits.clone(),
        }
    }
}

/// Raw JSON text of the two embedded documents, kept for the HTML report.
#[derive(Debug, Clone, Default)]
pub struct RawDocuments {
    pub parcel_data: String,
    pub muni_data: String,
}

/// Load and parse all input documents.
pub fn load_inputs(paths: &InputPaths) -> Result<(ReportInputs, RawDocuments)> {
    let parcel_text = read_document(&paths.parcel_data)?;
    let muni_text = read_document(&paths.muni_data)?;

    let contributions = parse_parcel_data(&parcel_text).with_context(|| {
        format!(
            "Failed to parse parcel data: {}",
            paths.parcel_data.display()
        )
    })?;
    let municipalities = parse_muni_data(&muni_text).with_context(|| {
        format!(
            "Failed to parse municipality data: {}",
            paths.muni_data.display()
        )
    })?;

    let benefits = match paths.benefits {
        Some(ref path) => {
            let text = read_document(path)?;
            parse_benefits(&text)
                .with_context(|| format!("Failed to parse benefits data: {}", path.display()))?
        }
        None => {
            debug!("No benefits document, biodiversity and global tables stay empty");
            BenefitsDocument::default()
        }
    };

    info!(
        "Loaded {} parcel contributions, {} municipalities, {} parcel rows",
        contributions.len(),
        municipalities.len(),
        benefits.parcels.len()
    );

    let inputs = ReportInputs {
        contributions,
        municipalities,
        benefits,
    };
    let raw = RawDocuments {
        parcel_data: parcel_text,
        muni_data: muni_text,
    };
    Ok((inputs, raw))
}

/// Load a selection file: a JSON array of parcel ids (strings or numbers).
pub fn load_selection(path: &Path) -> Result<Vec<String>> {
    let text = read_document(path)?;
    parse_selection(&text)
        .with_context(|| format!("Failed to parse selection file: {}", path.display()))
}

pub fn parse_parcel_data(text: &str) -> Result<BTreeMap<String, ParcelContribution>> {
    Ok(serde_json::from_str(text)?)
}

pub fn parse_muni_data(text: &str) -> Result<BTreeMap<String, MunicipalityBaseline>> {
    Ok(serde_json::from_str(text)?)
}

pub fn parse_benefits(text: &str) -> Result<BenefitsDocument> {
    Ok(serde_json::from_str(text)?)
}

pub fn parse_selection(text: &str) -> Result<Vec<String>> {
    let ids: Vec<ParcelRef> = serde_json::from_str(text)?;
    Ok(ids.into_iter().map(String::from).collect())
}

fn read_document(path: &Path) -> Result<String> {
    fs::read_to_string(path).with_context(|| format!("Failed to read {}", path.display()))
}

/// Report suspicious data that the engine tolerates.
pub fn validate_inputs(inputs: &ReportInputs) -> Vec<InputIssue> {
    let mut issues = Vec::new();

    for (parcel, contribution) in &inputs.contributions {
        for (municipality, share) in &contribution.municipalities {
            if !(0.0..=1.0).contains(share) {
                issues.push(InputIssue::ShareOutOfRange {
                    parcel: parcel.clone(),
                    municipality: municipality.clone(),
                    share: *share,
                });
            }
            if !inputs.municipalities.contains_key(municipality) {
                issues.push(InputIssue::MissingMunicipality {
                    parcel: parcel.clone(),
                    municipality: municipality.clone(),
                });
            }
        }
    }

    let eco_types: BTreeSet<&str> = inputs
        .benefits
        .ecosystems
        .iter()
        .map(|e| e.eco_type.as_str())
        .collect();
    let mut seen = BTreeSet::new();
    for row in &inputs.benefits.parcels {
        if !seen.insert(row.id.as_str()) {
            issues.push(InputIssue::DuplicateParcel(row.id.clone()));
        }
        if !row.eco_type.is_empty() && !eco_types.contains(row.eco_type.as_str()) {
            issues.push(InputIssue::UnknownEcoType {
                parcel: row.id.clone(),
                eco_type: row.eco_type.clone(),
            });
        }
    }

    issues
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::TempDir;

    const PARCEL_DATA: &str = r#"{
        "101": {"municipalities": {"Springfield": 0.5}, "Carbon": 40},
        "102": {"municipalities": {"Springfield": 1.5, "Nowhere": 0.2}, "Sediment": 3}
    }"#;

    const MUNI_DATA: &str = r#"{
        "Springfield": {"pop": 1000},
        "Shelbyville": {"pop": 200, "impacts": {"Sediment impact": -6.0}}
    }"#;

    const BENEFITS: &str = r#"{
        "parcels": [
            {"id": 101, "area": 30, "eco_type": "wetland", "carbon": 12},
            {"id": "102", "area": 5, "eco_type": "desert"},
            {"id": 101, "area": 1, "eco_type": "wetland"}
        ],
        "ecosystems": [{"eco_type": "wetland", "required_offset": 100}],
        "global_services": [{"service": "Carbon", "impact": -50}]
    }"#;

    fn write_file(dir: &TempDir, name: &str, content: &str) -> PathBuf {
        let path = dir.path().join(name);
        let mut file = fs::File::create(&path).unwrap();
        file.write_all(content.as_bytes()).unwrap();
        path
    }

    #[test]
    fn test_load_inputs() {
        let dir = TempDir::new().unwrap();
        let paths = InputPaths {
            parcel_data: write_file(&dir, "parcels.json", PARCEL_DATA),
            muni_data: write_file(&dir, "munis.json", MUNI_DATA),
            benefits: Some(write_file(&dir, "benefits.json", BENEFITS)),
        };

        let (inputs, raw) = load_inputs(&paths).unwrap();
        assert_eq!(inputs.contributions.len(), 2);
        assert!(inputs.municipalities["Shelbyville"].has_baseline());
        assert_eq!(inputs.benefits.parcels[0].id, "101");
        assert_eq!(inputs.benefits.global_services[0].service.as_str(), "carbon");
        assert_eq!(raw.muni_data, MUNI_DATA);
    }

    #[test]
    fn test_missing_file_reports_path() {
        let paths = InputPaths {
            parcel_data: PathBuf::from("/nonexistent/parcels.json"),
            muni_data: PathBuf::from("/nonexistent/munis.json"),
            benefits: None,
        };
        let err = load_inputs(&paths).unwrap_err();
        assert!(err.to_string().contains("parcels.json"));
    }

    #[test]
    fn test_parse_selection_mixed_ids() {
        let ids = parse_selection(r#"[101, "102", 103]"#).unwrap();
        assert_eq!(ids, vec!["101", "102", "103"]);
        assert!(parse_selection(r#"{"101": true}"#).is_err());
    }

    #[test]
    fn test_validate_inputs() {
        let inputs = ReportInputs {
            contributions: parse_parcel_data(PARCEL_DATA).unwrap(),
            municipalities: parse_muni_data(MUNI_DATA).unwrap(),
            benefits: parse_benefits(BENEFITS).unwrap(),
        };

        let issues = validate_inputs(&inputs);
        assert!(issues.contains(&InputIssue::ShareOutOfRange {
            parcel: "102".to_string(),
            municipality: "Springfield".to_string(),
            share: 1.5,
        }));
        assert!(issues.contains(&InputIssue::MissingMunicipality {
            parcel: "102".to_string(),
            municipality: "Nowhere".to_string(),
        }));
        assert!(issues.contains(&InputIssue::UnknownEcoType {
            parcel: "102".to_string(),
            eco_type: "desert".to_string(),
        }));
        assert!(issues.contains(&InputIssue::DuplicateParcel("101".to_string())));
    }
}
