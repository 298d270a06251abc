//! Command-line interface argument parsing.
//!
//! This module handles all CLI argument parsing using clap,
//! including validation and default values.

use clap::Parser;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// offset-report - offset portfolio reports for conservation planning
///
/// Aggregates the ecosystem-service offsets of a set of selected parcels
/// into municipality, ecosystem and global benefit tables, and renders them
/// as HTML, Markdown, JSON or CSV.
///
/// Examples:
///   offset-report --parcel-data parcels.json --muni-data munis.json --select-all
///   offset-report --parcel-data parcels.json --muni-data munis.json --selection chosen.json
///   offset-report --parcel-data parcels.json --muni-data munis.json --toggle 101,102 --format csv
///   offset-report --init-config
#[derive(Parser, Debug, Clone)]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Args {
    /// Parcel contribution document (JSON)
    ///
    /// Maps parcel ids to municipality shares and service magnitudes.
    #[arg(long, value_name = "FILE", required_unless_present = "init_config")]
    pub parcel_data: Option<PathBuf>,

    /// Municipality baseline document (JSON)
    ///
    /// Maps municipality names to population and baseline impacts.
    #[arg(long, value_name = "FILE", required_unless_present = "init_config")]
    pub muni_data: Option<PathBuf>,

    /// Benefits document (JSON) with the parcel table, ecosystem targets
    /// and global services
    #[arg(long, value_name = "FILE")]
    pub benefits: Option<PathBuf>,

    /// Selection document (JSON array of parcel ids) to select first
    #[arg(short, long, value_name = "FILE")]
    pub selection: Option<PathBuf>,

    /// Parcel ids to toggle, in order (comma-separated)
    ///
    /// Example: --toggle 101,102,101
    #[arg(short, long, value_name = "IDS", value_delimiter = ',')]
    pub toggle: Vec<String>,

    /// Select every parcel before applying toggles
    #[arg(long)]
    pub select_all: bool,

    /// Deselect every parcel before applying toggles
    ///
    /// Runs after --selection and --select-all, so --toggle starts from
    /// an empty selection.
    #[arg(long)]
    pub clear: bool,

    /// Output format (html, markdown, json, csv)
    #[arg(short, long, value_name = "FORMAT")]
    pub format: Option<OutputFormat>,

    /// Output file path for the report
    ///
    /// Defaults to offset_report.<ext> for the chosen format.
    #[arg(short, long, value_name = "FILE")]
    pub output: Option<PathBuf>,

    /// Path to configuration file
    ///
    /// If not specified, looks for .offset-report.toml in the current directory
    #[arg(short, long, value_name = "FILE", env = "OFFSET_REPORT_CONFIG")]
    pub config: Option<PathBuf>,

    /// Services shown in the municipality table (comma-separated)
    ///
    /// Example: --services sediment,nitrogen
    #[arg(long, value_name = "SERVICES", value_delimiter = ',')]
    pub services: Option<Vec<String>>,

    /// Decimal places for numeric columns
    #[arg(long, value_name = "DIGITS")]
    pub round: Option<usize>,

    /// Negate authored impacts before they enter the nets
    #[arg(long)]
    pub negate_impacts: bool,

    /// Exit with code 2 when any toggle is rejected
    #[arg(long)]
    pub strict: bool,

    /// Enable verbose logging output
    #[arg(short, long)]
    pub verbose: bool,

    /// Run in quiet mode (minimal output)
    #[arg(short, long)]
    pub quiet: bool,

    /// Generate a default .offset-report.toml configuration file
    #[arg(long)]
    pub init_config: bool,
}

/// Output format for the report.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Default, clap::ValueEnum, Serialize, Deserialize,
)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    /// Self-contained HTML page (default)
    #[default]
    Html,
    /// Markdown format
    Markdown,
    /// JSON format
    Json,
    /// CSV export of the parcel table
    Csv,
}

impl OutputFormat {
    /// File extension used for the default output path.
    pub fn extension(&self) -> &'static str {
        match self {
            OutputFormat::Html => "html",
            OutputFormat::Markdown => "md",
            OutputFormat::Json => "json",
            OutputFormat::Csv => "csv",
        }
    }
}

impl Args {
    /// Parse command-line arguments.
    pub fn parse_args() -> Self {
        Self::parse()
    }

    /// Validate the parsed arguments.
    pub fn validate(&self) -> Result<(), String> {
        // Skip validation for --init-config
        if self.init_config {
            return Ok(());
        }

        // Check for conflicting options
        if self.verbose && self.quiet {
            return Err("Cannot use both --verbose and --quiet".to_string());
        }

        if let Some(digits) = self.round {
            if digits > 9 {
                return Err("Round digits must be between 0 and 9".to_string());
            }
        }

        if let Some(ref services) = self.services {
            if services.iter().all(|s| s.trim().is_empty()) {
                return Err("At least one service is required".to_string());
            }
        }

        let documents = [
            ("Parcel data", self.parcel_data.as_ref()),
            ("Municipality data", self.muni_data.as_ref()),
            ("Benefits data", self.benefits.as_ref()),
            ("Selection", self.selection.as_ref()),
        ];
        for (name, path) in documents {
            if let Some(path) = path {
                if !path.is_file() {
                    return Err(format!("{} file does not exist: {}", name, path.display()));
                }
            }
        }

        Ok(())
    }

    /// Returns the log level based on verbosity settings.
    ///
    /// `config_verbose` is the `verbose` setting of the config file;
    /// `--quiet` wins over both.
    pub fn log_level(&self, config_verbose: bool) -> tracing::Level {
        if self.quiet {
            tracing::Level::ERROR
        } else if self.verbose || config_verbose {
            tracing::Level::DEBUG
        } else {
            tracing::Level::INFO
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn make_args(parcel_data: &NamedTempFile, muni_data: &NamedTempFile) -> Args {
        Args {
            parcel_data: Some(parcel_data.path().to_path_buf()),
            muni_data: Some(muni_data.path().to_path_buf()),
            benefits: None,
            selection: None,
            toggle: Vec::new(),
            select_all: false,
            clear: false,
            format: None,
            output: None,
            config: None,
            services: None,
            round: None,
            negate_impacts: false,
            strict: false,
            verbose: false,
            quiet: false,
            init_config: false,
        }
    }

    fn document() -> NamedTempFile {
        let mut file = NamedTempFile::new().unwrap();
        write!(file, "{{}}").unwrap();
        file
    }

    #[test]
    fn test_validation_ok() {
        let (parcels, munis) = (document(), document());
        assert!(make_args(&parcels, &munis).validate().is_ok());
    }

    #[test]
    fn test_validation_missing_file() {
        let (parcels, munis) = (document(), document());
        let mut args = make_args(&parcels, &munis);
        args.benefits = Some(PathBuf::from("/nonexistent/benefits.json"));
        let err = args.validate().unwrap_err();
        assert!(err.contains("Benefits data"));
    }

    #[test]
    fn test_validation_conflicting_options() {
        let (parcels, munis) = (document(), document());
        let mut args = make_args(&parcels, &munis);
        args.verbose = true;
        args.quiet = true;
        assert!(args.validate().is_err());
    }

    #[test]
    fn test_validation_round_range() {
        let (parcels, munis) = (document(), document());
        let mut args = make_args(&parcels, &munis);
        args.round = Some(12);
        assert!(args.validate().is_err());
        args.round = Some(0);
        assert!(args.validate().is_ok());
    }

    #[test]
    fn test_parse_toggle_list() {
        let args = Args::try_parse_from([
            "offset-report",
            "--parcel-data",
            "p.json",
            "--muni-data",
            "m.json",
            "--toggle",
            "101,102",
            "--format",
            "csv",
        ])
        .unwrap();
        assert_eq!(args.toggle, vec!["101", "102"]);
        assert_eq!(args.format, Some(OutputFormat::Csv));
    }

    #[test]
    fn test_init_config_needs_no_documents() {
        let args = Args::try_parse_from(["offset-report", "--init-config"]).unwrap();
        assert!(args.init_config);
        assert!(Args::try_parse_from(["offset-report"]).is_err());
    }

    #[test]
    fn test_log_level() {
        let (parcels, munis) = (document(), document());
        let mut args = make_args(&parcels, &munis);
        assert_eq!(args.log_level(false), tracing::Level::INFO);
        assert_eq!(args.log_level(true), tracing::Level::DEBUG);

        args.verbose = true;
        assert_eq!(args.log_level(false), tracing::Level::DEBUG);

        args.verbose = false;
        args.quiet = true;
        assert_eq!(args.log_level(true), tracing::Level::ERROR);
    }

    #[test]
    fn test_extension() {
        assert_eq!(OutputFormat::Html.extension(), "html");
        assert_eq!(OutputFormat::Markdown.extension(), "md");
    }
}
