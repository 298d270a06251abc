//! Configuration file handling.
//!
//! This module handles loading and merging configuration from
//! `.offset-report.toml` files.

use crate::cli::OutputFormat;
use crate::engine::{EngineOptions, ImpactSign};
use crate::models::ServiceKey;
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Default configuration file name.
pub const CONFIG_FILE: &str = ".offset-report.toml";

/// Root configuration structure.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// General settings.
    #[serde(default)]
    pub general: GeneralConfig,

    /// Aggregation settings.
    #[serde(default)]
    pub engine: EngineConfig,

    /// Municipality table columns.
    #[serde(default)]
    pub schema: SchemaConfig,

    /// Report settings.
    #[serde(default)]
    pub report: ReportConfig,
}

/// General application settings.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct GeneralConfig {
    /// Output file path. Defaults to `offset_report.<format extension>`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub output: Option<String>,

    /// Output format.
    #[serde(default)]
    pub format: OutputFormat,

    /// Enable verbose logging by default.
    #[serde(default)]
    pub verbose: bool,

    /// Exit with code 2 when a toggle is rejected.
    #[serde(default)]
    pub strict: bool,
}

/// Aggregation settings.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Treat authored impacts as positive magnitudes of loss and negate
    /// them before they enter the nets.
    #[serde(default)]
    pub negate_impacts: bool,
}

/// Municipality table schema settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SchemaConfig {
    /// Services shown per municipality.
    #[serde(default = "default_services")]
    pub services: Vec<String>,

    /// Decimal places of numeric columns.
    #[serde(default = "default_round_digits")]
    pub round_digits: Option<usize>,

    /// Column labels rendered in scientific notation.
    #[serde(default)]
    pub scientific: Vec<String>,

    /// Explicit column list; overrides `services` when present.
    #[serde(default)]
    pub columns: Vec<ColumnConfig>,
}

impl Default for SchemaConfig {
    fn default() -> Self {
        Self {
            services: default_services(),
            round_digits: default_round_digits(),
            scientific: Vec::new(),
            columns: Vec::new(),
        }
    }
}

fn default_services() -> Vec<String> {
    vec!["sediment", "nitrogen", "custom"]
        .into_iter()
        .map(String::from)
        .collect()
}

fn default_round_digits() -> Option<usize> {
    Some(2)
}

/// One explicit column: header text and class list, e.g.
/// `{ label = "Sediment offset", class = "services_offset_sediment offsets round2" }`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColumnConfig {
    pub label: String,
    pub class: String,
}

/// Report rendering settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReportConfig {
    /// Report title.
    #[serde(default = "default_title")]
    pub title: String,

    /// Embed the input documents in HTML output.
    #[serde(default = "default_true")]
    pub embed_data: bool,

    /// Add total rows to the parcel table.
    #[serde(default = "default_true")]
    pub include_parcel_totals: bool,
}

impl Default for ReportConfig {
    fn default() -> Self {
        Self {
            title: default_title(),
            embed_data: true,
            include_parcel_totals: true,
        }
    }
}

fn default_title() -> String {
    "Offset Portfolio Report".to_string()
}

fn default_true() -> bool {
    true
}

impl Config {
    /// Load configuration from a file path.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        let config: Config = toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))?;

        Ok(config)
    }

    /// Try to load configuration from the default location.
    ///
    /// Returns `Ok(None)` if the file doesn't exist, `Err` if it exists but can't be parsed.
    pub fn load_default() -> Result<Option<Self>> {
        let default_path = Path::new(CONFIG_FILE);

        if default_path.exists() {
            Ok(Some(Self::load(default_path)?))
        } else {
            Ok(None)
        }
    }

    /// Merge this configuration with CLI arguments.
    ///
    /// CLI arguments take precedence over config file settings. Only
    /// values given on the command line override the file.
    pub fn merge_with_args(&mut self, args: &crate::cli::Args) {
        if let Some(ref output) = args.output {
            self.general.output = Some(output.display().to_string());
        }
        if let Some(format) = args.format {
            self.general.format = format;
        }
        if let Some(ref services) = args.services {
            self.schema.services = services.clone();
            self.schema.columns.clear();
        }
        if let Some(digits) = args.round {
            self.schema.round_digits = Some(digits);
        }

        // Flags always override
        if args.negate_impacts {
            self.engine.negate_impacts = true;
        }
        if args.strict {
            self.general.strict = true;
        }
        if args.verbose {
            self.general.verbose = true;
        }
    }

    /// Output path, derived from the format when not configured.
    pub fn output_path(&self) -> String {
        self.general
            .output
            .clone()
            .unwrap_or_else(|| format!("offset_report.{}", self.general.format.extension()))
    }

    /// Engine options for the given services.
    pub fn engine_options(&self, services: Vec<ServiceKey>) -> EngineOptions {
        EngineOptions {
            services,
            impact_sign: if self.engine.negate_impacts {
                ImpactSign::Negated
            } else {
                ImpactSign::AsAuthored
            },
        }
    }

    /// Generate a default configuration file content.
    pub fn default_toml() -> String {
        let config = Config::default();
        toml::to_string_pretty(&config).unwrap_or_else(|_| String::new())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.schema.services, vec!["sediment", "nitrogen", "custom"]);
        assert_eq!(config.schema.round_digits, Some(2));
        assert!(!config.engine.negate_impacts);
        assert_eq!(config.output_path(), "offset_report.html");
    }

    #[test]
    fn test_parse_config() {
        let toml_content = r#"
[general]
output = "portfolio.md"
format = "markdown"
strict = true
verbose = true

[engine]
negate_impacts = true

[schema]
services = ["sediment", "nutrient"]
round_digits = 1
scientific = ["Population size"]

[[schema.columns]]
label = "Sediment offset"
class = "services_offset_sediment offsets round2"
"#;

        let config: Config = toml::from_str(toml_content).unwrap();
        assert_eq!(config.general.output.as_deref(), Some("portfolio.md"));
        assert_eq!(config.general.format, OutputFormat::Markdown);
        assert!(config.general.strict);
        assert!(config.general.verbose);
        assert!(config.engine.negate_impacts);
        assert_eq!(config.schema.round_digits, Some(1));
        assert_eq!(config.schema.columns.len(), 1);
        assert_eq!(config.report.title, "Offset Portfolio Report");

        let options = config.engine_options(vec![ServiceKey::new("sediment")]);
        assert_eq!(options.impact_sign, ImpactSign::Negated);
    }

    #[test]
    fn test_default_toml_generation() {
        let toml_str = Config::default_toml();
        assert!(!toml_str.is_empty());
        assert!(toml_str.contains("[general]"));
        assert!(toml_str.contains("[engine]"));
        assert!(toml_str.contains("[schema]"));
        assert!(toml_str.contains("[report]"));

        let reparsed: Config = toml::from_str(&toml_str).unwrap();
        assert_eq!(reparsed.schema.services, Config::default().schema.services);
    }
}
