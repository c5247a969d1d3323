//! `ordercash run|items|validate`: config-driven extract over CSV source tables.

use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};

use chrono::NaiveDate;
use clap::Args;

use ordercash_recon::config::ExtractConfig;
use ordercash_recon::export::{write_extract_csv, write_item_aggregates_csv};
use ordercash_recon::load::{load_items, load_orders, load_partner_orders, load_primary_pnl, load_secondary_pnl};
use ordercash_recon::model::{ExtractInput, MergedRow};
use ordercash_recon::partition::{output_path, partition_rows};
use ordercash_recon::{ExtractError, ReportingWindow};

use crate::exit_codes::{EXIT_EMPTY, EXIT_INPUT, EXIT_INVALID_CONFIG, EXIT_OUTPUT, EXIT_USAGE};
use crate::CliError;

#[derive(Args, Debug)]
pub struct PeriodArgs {
    /// First day of the reporting window (YYYY-MM-DD), overrides [period]
    #[arg(long, requires = "end", conflicts_with = "month")]
    pub start: Option<NaiveDate>,

    /// Last day of the reporting window, inclusive (YYYY-MM-DD)
    #[arg(long, requires = "start", conflicts_with = "month")]
    pub end: Option<NaiveDate>,

    /// Whole calendar month, overrides [period]
    #[arg(long, value_name = "YYYY-MM")]
    pub month: Option<String>,
}

#[derive(Args, Debug)]
pub struct RunArgs {
    /// Path to the extract TOML config
    pub config: PathBuf,

    #[command(flatten)]
    pub period: PeriodArgs,

    /// Output root for provider folders (default: [output].dir, else the config's directory)
    #[arg(long)]
    pub out: Option<PathBuf>,

    /// Print run metadata and summary as JSON to stdout
    #[arg(long)]
    pub json: bool,

    /// Write the whole extract to one CSV instead of per-provider files
    #[arg(long, value_name = "PATH")]
    pub single_file: Option<PathBuf>,

    /// Exit with code 6 when the window selects no orders
    #[arg(long)]
    pub fail_on_empty: bool,
}

#[derive(Args, Debug)]
pub struct ItemsArgs {
    /// Path to the extract TOML config
    pub config: PathBuf,

    #[command(flatten)]
    pub period: PeriodArgs,

    /// Output CSV file (omit for stdout)
    #[arg(long, short = 'o')]
    pub output: Option<PathBuf>,

    /// Print aggregates as JSON instead of CSV
    #[arg(long)]
    pub json: bool,
}

// ============================================================================
// Shared plumbing
// ============================================================================

fn extract_err(code: u8, e: ExtractError) -> CliError {
    CliError::new(code, e.to_string())
}

/// Engine failures after loading: amounts past the decimal range are an input problem.
fn engine_err(e: ExtractError) -> CliError {
    match e {
        ExtractError::Overflow(_) => extract_err(EXIT_INPUT, e)
            .with_hint("check the source tables for corrupt or mis-scaled amounts"),
        _ => extract_err(EXIT_INVALID_CONFIG, e),
    }
}

/// Read and validate the config. Returns it with the directory source paths resolve against.
fn read_config(path: &Path) -> Result<(ExtractConfig, PathBuf), CliError> {
    let text = std::fs::read_to_string(path).map_err(|e| {
        CliError::new(EXIT_USAGE, format!("cannot read config {}: {e}", path.display()))
    })?;
    let config = ExtractConfig::from_toml(&text).map_err(|e| extract_err(EXIT_INVALID_CONFIG, e))?;
    let base_dir = path
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .unwrap_or_else(|| Path::new("."))
        .to_path_buf();
    Ok((config, base_dir))
}

fn parse_month(value: &str) -> Result<ReportingWindow, CliError> {
    let invalid = || {
        CliError::new(EXIT_USAGE, format!("invalid --month '{value}'"))
            .with_hint("use YYYY-MM, e.g. --month 2025-11")
    };
    let (year, month) = value.split_once('-').ok_or_else(invalid)?;
    let year: i32 = year.parse().map_err(|_| invalid())?;
    let month: u32 = month.parse().map_err(|_| invalid())?;
    ReportingWindow::for_month(year, month).ok_or_else(invalid)
}

/// Command-line period first, then the config's [period].
fn resolve_window(period: &PeriodArgs, config: &ExtractConfig) -> Result<ReportingWindow, CliError> {
    if let Some(month) = &period.month {
        return parse_month(month);
    }
    if let (Some(start), Some(end)) = (period.start, period.end) {
        return Ok(ReportingWindow::new(start, end));
    }
    config.period.map(|p| p.window()).ok_or_else(|| {
        CliError::new(EXIT_USAGE, "no reporting period")
            .with_hint("add a [period] table to the config, or pass --month / --start and --end")
    })
}

fn read_source(base_dir: &Path, file: &str) -> Result<String, CliError> {
    let path = base_dir.join(file);
    std::fs::read_to_string(&path)
        .map_err(|e| CliError::new(EXIT_INPUT, format!("cannot read {}: {e}", path.display())))
}

fn load_input(config: &ExtractConfig, base_dir: &Path) -> Result<ExtractInput, CliError> {
    let s = &config.sources;
    let input_err = |e| extract_err(EXIT_INPUT, e);

    let secondary_pnl = match &s.secondary_pnl {
        Some(file) => load_secondary_pnl(&read_source(base_dir, file)?).map_err(input_err)?,
        None => Vec::new(),
    };

    let input = ExtractInput {
        orders: load_orders(&read_source(base_dir, &s.orders)?).map_err(input_err)?,
        partner_orders: load_partner_orders(&read_source(base_dir, &s.partner_orders)?).map_err(input_err)?,
        primary_pnl: load_primary_pnl(&read_source(base_dir, &s.primary_pnl)?).map_err(input_err)?,
        secondary_pnl,
        items: load_items(&read_source(base_dir, &s.items)?).map_err(input_err)?,
    };
    log::info!(
        "loaded {} orders, {} partner orders, {} + {} P&L rows, {} item lines",
        input.orders.len(),
        input.partner_orders.len(),
        input.primary_pnl.len(),
        input.secondary_pnl.len(),
        input.items.len()
    );
    Ok(input)
}

fn create_output(path: &Path) -> Result<BufWriter<File>, CliError> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent).map_err(|e| {
            CliError::new(EXIT_OUTPUT, format!("cannot create {}: {e}", parent.display()))
        })?;
    }
    let file = File::create(path)
        .map_err(|e| CliError::new(EXIT_OUTPUT, format!("cannot write {}: {e}", path.display())))?;
    Ok(BufWriter::new(file))
}

fn write_extract_file(path: &Path, rows: &[&MergedRow], decimal_places: u32) -> Result<(), CliError> {
    let writer = create_output(path)?;
    write_extract_csv(rows, decimal_places, writer).map_err(|e| extract_err(EXIT_OUTPUT, e))?;
    eprintln!("wrote {} ({} rows)", path.display(), rows.len());
    Ok(())
}

// ============================================================================
// run
// ============================================================================

pub fn cmd_run(args: RunArgs) -> Result<(), CliError> {
    let (config, base_dir) = read_config(&args.config)?;
    let window = resolve_window(&args.period, &config)?;
    let input = load_input(&config, &base_dir)?;

    let result = ordercash_recon::run(&config, &window, &input).map_err(engine_err)?;

    let s = &result.summary;
    eprintln!(
        "extract {}..{}: {} orders, {} rows ({} placeholder), {} primary / {} secondary P&L matches, {}/{} marketplace rows linked",
        window.start,
        window.end,
        s.orders_selected,
        s.rows,
        s.placeholder_rows,
        s.primary_matched,
        s.secondary_matched,
        s.marketplace_linked,
        s.marketplace_rows,
    );
    eprintln!(
        "items: {} lines over {} orders ({} undefined quantity, {} other band)",
        s.item_lines_considered, s.item_orders, s.null_quantity_lines, s.other_band_lines,
    );

    if args.fail_on_empty && result.rows.is_empty() {
        return Err(CliError::new(EXIT_EMPTY, "no orders selected for the reporting window")
            .with_hint("check the period and the orders source"));
    }

    let decimal_places = config.output.decimal_places;
    let mut files: Vec<serde_json::Value> = Vec::new();

    if let Some(path) = &args.single_file {
        let rows: Vec<&MergedRow> = result.rows.iter().collect();
        write_extract_file(path, &rows, decimal_places)?;
        files.push(serde_json::json!({ "path": path.display().to_string(), "rows": rows.len() }));
    } else {
        let out_dir = match (&args.out, &config.output.dir) {
            (Some(dir), _) => dir.clone(),
            (None, Some(dir)) => base_dir.join(dir),
            (None, None) => base_dir.clone(),
        };
        let providers = config.providers();
        for slice in partition_rows(&result.rows, &providers) {
            let path = output_path(&out_dir, &window, slice.provider);
            write_extract_file(&path, &slice.rows, decimal_places)?;
            files.push(serde_json::json!({
                "provider": slice.provider.name,
                "path": path.display().to_string(),
                "rows": slice.rows.len(),
            }));
        }
    }

    if args.json {
        let report = serde_json::json!({
            "meta": result.meta,
            "summary": result.summary,
            "files": files,
        });
        let text = serde_json::to_string_pretty(&report)
            .map_err(|e| CliError::general(format!("JSON serialization error: {e}")))?;
        println!("{text}");
    }

    Ok(())
}

// ============================================================================
// items
// ============================================================================

pub fn cmd_items(args: ItemsArgs) -> Result<(), CliError> {
    let (config, base_dir) = read_config(&args.config)?;
    let window = resolve_window(&args.period, &config)?;
    let input = load_input(&config, &base_dir)?;

    let (aggregates, stats) =
        ordercash_recon::run_items(&config, &window, &input).map_err(engine_err)?;

    if args.json {
        let text = serde_json::to_string_pretty(&aggregates)
            .map_err(|e| CliError::general(format!("JSON serialization error: {e}")))?;
        match &args.output {
            Some(path) => {
                let mut writer = create_output(path)?;
                writeln!(writer, "{text}")
                    .and_then(|_| writer.flush())
                    .map_err(|e| CliError::new(EXIT_OUTPUT, format!("cannot write {}: {e}", path.display())))?;
            }
            None => println!("{text}"),
        }
    } else {
        let decimal_places = config.output.decimal_places;
        match &args.output {
            Some(path) => {
                let writer = create_output(path)?;
                write_item_aggregates_csv(&aggregates, decimal_places, writer)
                    .map_err(|e| extract_err(EXIT_OUTPUT, e))?;
            }
            None => {
                let stdout = io::stdout();
                write_item_aggregates_csv(&aggregates, decimal_places, stdout.lock())
                    .map_err(|e| extract_err(EXIT_OUTPUT, e))?;
            }
        }
    }

    eprintln!(
        "items {}..{}: {} band groups from {} lines ({} undefined quantity, {} other band)",
        window.start,
        window.end,
        aggregates.len(),
        stats.lines_considered,
        stats.null_quantity_lines,
        stats.other_band_lines,
    );
    Ok(())
}

// ============================================================================
// validate
// ============================================================================

pub fn cmd_validate(config_path: PathBuf) -> Result<(), CliError> {
    let (config, _) = read_config(&config_path)?;
    let period = match config.period {
        Some(p) => format!("period {}..{}", p.start, p.end),
        None => "no period".to_string(),
    };
    eprintln!(
        "valid: '{}' with {} provider(s), {}, item metrics {:?}",
        config.name,
        config.providers().len(),
        period,
        config.merge.item_metrics,
    );
    Ok(())
}
