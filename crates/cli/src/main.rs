// SCM CLI - reconcile scan findings against approved deviations

mod analyze;
mod exit_codes;
mod resolve;

use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Args, Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use exit_codes::{EXIT_SUCCESS, EXIT_USAGE};

#[derive(Parser)]
#[command(name = "scm")]
#[command(about = "Reconcile compliance findings against approved deviations in Smartsheet")]
#[command(long_version = long_version())]
#[command(version)]
struct Cli {
    /// Log progress to stderr (SCM_LOG / RUST_LOG override)
    #[arg(long, short = 'v', global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Compare findings with the SCM benchmark sheets and write an Excel report
    #[command(after_help = "\
Examples:
  scm analyze --poam poam.xlsx
  scm analyze --poam poam.xlsx --workspace-name 'SCM Program - Acme' --scm-sheet All --client Acme
  scm analyze --scan-csv nessus.csv --scm-sheet 'RHEL 8.X' --client Acme -o acme.xlsx
  scm analyze --poam poam.xlsx --non-interactive --json > report.json")]
    Analyze(AnalyzeArgs),

    /// List the benchmarks this build can extract
    Benchmarks,
}

#[derive(Args, Debug)]
#[command(group(
    clap::ArgGroup::new("findings")
        .required(true)
        .args(["poam", "scan_csv"]),
))]
pub struct AnalyzeArgs {
    /// POAM workbook (.xlsx / .xlsm)
    #[arg(long, value_name = "FILE")]
    pub poam: Option<PathBuf>,

    /// Flat scan export (.csv), e.g. Nessus compliance results
    #[arg(long, value_name = "FILE")]
    pub scan_csv: Option<PathBuf>,

    /// Smartsheet API access token
    #[arg(long, env = "SMARTSHEET_TOKEN", hide_env_values = true)]
    pub token: Option<String>,

    /// Workspace search text (case-insensitive substring)
    #[arg(long)]
    pub query: Option<String>,

    /// Exact workspace name
    #[arg(long)]
    pub workspace_name: Option<String>,

    /// Benchmark sheet to analyze (repeatable; `All` for every SCM sheet)
    #[arg(long = "scm-sheet", value_name = "NAME")]
    pub scm_sheets: Vec<String>,

    /// Compensating controls sheet name
    #[arg(long)]
    pub compensating_controls_sheet_name: Option<String>,

    /// Client whose compensating controls fill rationale placeholders
    #[arg(long)]
    pub client: Option<String>,

    /// Report path (.xlsx appended when missing)
    #[arg(long, short = 'o')]
    pub output: Option<PathBuf>,

    /// TOML config file
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Print the analysis as JSON to stdout
    #[arg(long)]
    pub json: bool,

    /// Do not list SCM items without a matching finding
    #[arg(long)]
    pub no_unmatched_items: bool,

    /// Never prompt; ambiguous selections are errors
    #[arg(long)]
    pub non_interactive: bool,
}

impl AnalyzeArgs {
    /// Every selection that would otherwise need a prompt was given.
    pub fn all_selected(&self) -> bool {
        self.workspace_name.is_some()
            && !self.scm_sheets.is_empty()
            && self.compensating_controls_sheet_name.is_some()
            && self.client.is_some()
    }
}

fn long_version() -> &'static str {
    if cfg!(debug_assertions) {
        concat!(
            env!("CARGO_PKG_VERSION"),
            " (", env!("GIT_COMMIT_HASH"), ")",
            "\nbuild:   debug",
            "\ntarget:  ", env!("TARGET"),
        )
    } else {
        concat!(
            env!("CARGO_PKG_VERSION"),
            " (", env!("GIT_COMMIT_HASH"), ")",
            "\nbuild:   release",
            "\ntarget:  ", env!("TARGET"),
        )
    }
}

/// `log` records from the library crates reach the subscriber through the
/// tracing-log bridge installed by `init()`.
fn init_logging(verbose: bool) {
    let default = if verbose { "info" } else { "warn" };
    let filter = EnvFilter::try_from_env("SCM_LOG")
        .or_else(|_| EnvFilter::try_from_default_env())
        .unwrap_or_else(|_| EnvFilter::new(default));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let result = match cli.command {
        Commands::Analyze(args) => analyze::cmd_analyze(args),
        Commands::Benchmarks => cmd_benchmarks(),
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
    pub fn args(msg: impl Into<String>) -> Self {
        Self { code: EXIT_USAGE, message: msg.into(), hint: None }
    }

    /// Add a hint to an existing error.
    pub fn with_hint(mut self, hint: impl Into<String>) -> Self {
        self.hint = Some(hint.into());
        self
    }
}

// ============================================================================
// benchmarks
// ============================================================================

fn cmd_benchmarks() -> Result<(), CliError> {
    let registry = scm_recon::BenchmarkRegistry::builtin();
    for strategy in registry.strategies() {
        println!("{:<28} {}", strategy.name(), strategy.short_name());
    }
    Ok(())
}
