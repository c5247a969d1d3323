// ordercash CLI - monthly order-to-cash extract
// Library logs go through `log`; this binary installs the subscriber.

mod exit_codes;
mod extract;

use std::process::ExitCode;

use clap::{Parser, Subcommand};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use exit_codes::{EXIT_ERROR, EXIT_SUCCESS};
use extract::{ItemsArgs, RunArgs};

#[derive(Parser)]
#[command(name = "ordercash")]
#[command(about = "Order-to-cash extract: orders x payment transactions with tax-aware financials")]
#[command(long_version = long_version())]
#[command(version)]
struct Cli {
    /// Increase log verbosity (-v info, -vv debug). RUST_LOG takes precedence.
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Build the order-level extract and write one CSV per provider
    #[command(after_help = "\
Examples:
  ordercash run november.toml
  ordercash run extract.toml --month 2025-11
  ordercash run extract.toml --start 2025-11-01 --end 2025-11-15 --out ./out
  ordercash run extract.toml --month 2025-11 --single-file all.csv --json")]
    Run(RunArgs),

    /// Write the (order, VAT band) item aggregates for the selected orders
    #[command(after_help = "\
Examples:
  ordercash items november.toml
  ordercash items extract.toml --month 2025-11 --output items.csv")]
    Items(ItemsArgs),

    /// Parse and validate a config without reading any source table
    #[command(after_help = "\
Examples:
  ordercash validate november.toml")]
    Validate {
        /// Path to the extract TOML config
        config: std::path::PathBuf,
    },
}

fn long_version() -> &'static str {
    concat!(
        env!("CARGO_PKG_VERSION"),
        "\nengine:  ordercash-recon ",
        env!("CARGO_PKG_VERSION"),
        "\ncontract_version(extract): 1",
    )
}

fn init_logging(verbose: u8) {
    let default_level = match verbose {
        0 => "warn",
        1 => "info",
        _ => "debug",
    };
    // `init` also bridges `log` records from the engine crate.
    let _ = tracing_subscriber::registry()
        .with(fmt::layer().with_target(false).with_writer(std::io::stderr))
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)))
        .try_init();
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let result = match cli.command {
        Commands::Run(args) => extract::cmd_run(args),
        Commands::Items(args) => extract::cmd_items(args),
        Commands::Validate { config } => extract::cmd_validate(config),
    };

    match result {
        Ok(()) => ExitCode::from(EXIT_SUCCESS),
        Err(CliError { code, message, hint }) => {
            if !message.is_empty() {
                eprintln!("error: {}", message);
            }
            if let Some(hint) = hint {
                eprintln!("hint:  {}", hint);
            }
            ExitCode::from(code)
        }
    }
}

#[derive(Debug)]
pub struct CliError {
    pub code: u8,
    pub message: String,
    pub hint: Option<String>,
}

impl CliError {
    pub fn new(code: u8, msg: impl Into<String>) -> Self {
        Self { code, message: msg.into(), hint: None }
    }

    pub fn general(msg: impl Into<String>) -> Self {
        Self::new(EXIT_ERROR, msg)
    }

    /// Add a hint to an existing error.
    pub fn with_hint(mut self, hint: impl Into<String>) -> Self {
        self.hint = Some(hint.into());
        self
    }
}
