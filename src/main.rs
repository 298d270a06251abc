//! offset-report - Offset portfolio reporting
//!
//! A CLI tool that aggregates the ecosystem-service offsets of selected
//! conservation parcels into municipality, ecosystem type and global
//! benefit tables, and renders them as an HTML, Markdown, JSON or CSV report.
//!
//! Exit codes:
//!   0 - Success
//!   1 - Runtime error (missing or malformed input, config, write failure)
//!   2 - A toggle was rejected and --strict is set

mod cli;
mod config;
mod engine;
mod error;
mod format;
mod input;
mod models;
mod report;
mod schema;

use anyhow::{Context, Result};
use chrono::Utc;
use cli::{Args, OutputFormat};
use config::{Config, CONFIG_FILE};
use engine::{ReportState, RowChange, SelectionSummary, ToggleOutcome};
use input::InputPaths;
use models::ReportMetadata;
use report::{ProjectionOptions, Report};
use schema::TableSchema;
use std::path::PathBuf;
use std::time::Instant;
use tracing::{debug, error, info, warn};
use tracing_subscriber::FmtSubscriber;

fn main() -> Result<()> {
    // Parse command-line arguments
    let args = Args::parse_args();

    // Validate arguments
    if let Err(e) = args.validate() {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }

    // Handle --init-config early (no logging needed)
    if args.init_config {
        return handle_init_config();
    }

    // Load configuration first so `verbose` in the file sets the log level
    let (mut config, origin) = match load_config(&args) {
        Ok(loaded) => loaded,
        Err(e) => {
            eprintln!("\n❌ Error: {:#}", e);
            std::process::exit(1);
        }
    };
    config.merge_with_args(&args);

    // Initialize logging
    init_logging(args.log_level(config.general.verbose));

    info!("offset-report v{}", env!("CARGO_PKG_VERSION"));
    debug!("Arguments: {:?}", args);
    origin.log();

    match run_report(args, config) {
        Ok(exit_code) => {
            std::process::exit(exit_code);
        }
        Err(e) => {
            error!("Report failed: {:#}", e);
            eprintln!("\n❌ Error: {:#}", e);
            std::process::exit(1);
        }
    }
}

/// Handle --init-config: generate a default .offset-report.toml.
fn handle_init_config() -> Result<()> {
    let path = std::path::Path::new(CONFIG_FILE);

    if path.exists() {
        eprintln!(
            "⚠️  {} already exists. Remove it first or edit it manually.",
            CONFIG_FILE
        );
        std::process::exit(1);
    }

    let content = Config::default_toml();
    std::fs::write(path, &content).with_context(|| format!("Failed to write {}", CONFIG_FILE))?;

    println!("✅ Created {} with default settings.", CONFIG_FILE);
    println!("   Edit it to customize services, columns, rounding, and more.");
    Ok(())
}

/// Initialize logging at the given level.
fn init_logging(level: tracing::Level) {
    let subscriber = FmtSubscriber::builder()
        .with_max_level(level)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .with_line_number(false)
        .with_writer(std::io::stderr)
        .compact()
        .finish();

    if let Err(e) = tracing::subscriber::set_global_default(subscriber) {
        eprintln!("Failed to set tracing subscriber: {}", e);
    }
}

/// Run the complete report workflow. Returns exit code (0 or 2).
fn run_report(args: Args, config: Config) -> Result<i32> {
    let start_time = Instant::now();

    // Step 1: Load the input documents
    println!("📥 Loading input documents...");
    let (inputs, raw) = input::load_inputs(&InputPaths::from(&args))?;
    for issue in input::validate_inputs(&inputs) {
        warn!("{}", issue);
    }

    // Step 2: Build the schema and seed the engine
    let schema = TableSchema::from(&config.schema);
    let services = schema.services();
    info!(
        "Tracking services: {}",
        services
            .iter()
            .map(|s| s.as_str())
            .collect::<Vec<_>>()
            .join(", ")
    );
    let mut state = ReportState::initialize(inputs, config.engine_options(services.clone()));

    // Step 3: Apply the selection
    let mut summary = SelectionSummary::default();
    if let Some(ref path) = args.selection {
        let ids = input::load_selection(path)?;
        info!("Applying {} selected parcels from {}", ids.len(), path.display());
        merge_summary(&mut summary, state.apply_selection(&ids));
    }
    if args.select_all {
        merge_summary(&mut summary, state.select_all());
    }
    if args.clear {
        let cleared = state.clear_selection();
        info!("Cleared {} selected parcels", cleared.applied);
        merge_summary(&mut summary, cleared);
    }
    for id in &args.toggle {
        match state.toggle_parcel(id) {
            Ok(outcome) => {
                summary.applied += 1;
                log_row_changes(&state, &outcome);
            }
            Err(e) => summary.rejected.push(e),
        }
    }
    for rejection in &summary.rejected {
        warn!("Skipped toggle: {}", rejection);
    }

    // Step 4: Build the report
    println!("📝 Generating report...");
    let metadata = ReportMetadata {
        title: config.report.title.clone(),
        generated_at: Utc::now(),
        services: services.iter().map(|s| s.capitalized()).collect(),
        parcels_total: state.parcel_ids().len(),
        parcels_selected: state.selection().len(),
        municipalities_tracked: state.municipalities().count(),
        toggles_applied: summary.applied,
        toggles_rejected: summary.rejected.len(),
    };
    let projection = ProjectionOptions {
        round_digits: config.schema.round_digits,
        include_parcel_totals: config.report.include_parcel_totals,
    };
    let embedded = if config.report.embed_data { Some(raw) } else { None };
    let report = Report::build(&state, &schema, &projection, metadata, embedded);

    // Step 5: Render and save
    let output = match config.general.format {
        OutputFormat::Html => report::render_html(&report),
        OutputFormat::Markdown => report::generate_markdown_report(&report),
        OutputFormat::Json => report::generate_json_report(&report)?,
        OutputFormat::Csv => report::export_csv(&report.tables.parcels),
    };

    let output_path = config.output_path();
    std::fs::write(&output_path, &output)
        .with_context(|| format!("Failed to write report to {}", output_path))?;

    // Print summary
    let duration = start_time.elapsed().as_secs_f64();
    println!("\n📊 Report Summary:");
    println!(
        "   Parcels selected: {} of {}",
        report.metadata.parcels_selected, report.metadata.parcels_total
    );
    println!(
        "   Municipalities tracked: {}",
        report.metadata.municipalities_tracked
    );
    for service in &services {
        println!(
            "   Net {} x population: {:.2}",
            service.as_str(),
            state.aggregate(service)
        );
    }
    if !summary.rejected.is_empty() {
        println!("   ⚠️  Toggles skipped: {}", summary.rejected.len());
    }
    println!("   Duration: {:.1}s", duration);
    println!("\n✅ Report complete! Saved to: {}", output_path);

    if config.general.strict && !summary.rejected.is_empty() {
        eprintln!(
            "\n⛔ {} toggle(s) were rejected. Failing (exit code 2).",
            summary.rejected.len()
        );
        return Ok(2);
    }

    Ok(0)
}

fn merge_summary(total: &mut SelectionSummary, part: SelectionSummary) {
    total.applied += part.applied;
    total.rejected.extend(part.rejected);
}

/// Log how a toggle changed the municipality rows.
fn log_row_changes(state: &ReportState, outcome: &ToggleOutcome) {
    debug!(
        "Toggled parcel {} (selected: {})",
        outcome.parcel_id, outcome.selected
    );
    for change in &outcome.rows {
        match change {
            RowChange::Inserted(name) | RowChange::Updated(name) => {
                if let Some(muni) = state.municipality(name) {
                    debug!("  {:?} (ref count {})", change, muni.ref_count());
                }
            }
            RowChange::Removed(name) => debug!("  Removed row '{}'", name),
        }
    }
}

/// Where the configuration came from, reported once logging is up.
enum ConfigOrigin {
    File(PathBuf),
    Defaults,
    Fallback(anyhow::Error),
}

impl ConfigOrigin {
    fn log(&self) {
        match self {
            ConfigOrigin::File(path) => info!("Loaded config from {}", path.display()),
            ConfigOrigin::Defaults => debug!("No config file found, using defaults"),
            ConfigOrigin::Fallback(e) => warn!("Failed to load config: {:#}", e),
        }
    }
}

/// Load configuration from file or use defaults.
fn load_config(args: &Args) -> Result<(Config, ConfigOrigin)> {
    // Try explicit config path
    if let Some(ref config_path) = args.config {
        let config = Config::load(config_path)?;
        return Ok((config, ConfigOrigin::File(config_path.clone())));
    }

    // Try default location
    match Config::load_default() {
        Ok(Some(config)) => Ok((config, ConfigOrigin::File(PathBuf::from(CONFIG_FILE)))),
        Ok(None) => Ok((Config::default(), ConfigOrigin::Defaults)),
        Err(e) => Ok((Config::default(), ConfigOrigin::Fallback(e))),
    }
}
