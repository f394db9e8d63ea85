use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

#[derive(Debug, Parser)]
#[command(name = "analyst-kit")]
#[command(about = "Project scaffolding and data-cleaning helpers for reporting analysts", version)]
pub struct Cli {
    /// Path to a TOML configuration file (defaults to ./analyst-kit.toml when present)
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Scaffold a new analysis project folder for a commitment
    New(NewArgs),
    /// Print the folder date for a reporting period
    Period(PeriodArgs),
    /// Print the data and output folders for a reporting period
    Paths(PathsArgs),
    /// Normalise a date column to YYYY-MM-DD
    ParseDates(ParseDatesArgs),
    /// Compute length of stay from admission and discharge columns
    Los(LosArgs),
    /// Tag rows with fiscal year and quarter
    FiscalYear(FiscalYearArgs),
    /// Convert column names to snake_case
    CleanNames(TableIo),
    /// Find files whose names contain the given keywords
    Find(FindArgs),
    /// Export one or more CSV files to a workbook
    Export(ExportArgs),
    /// Run a TOML recipe: read, transform, write
    Run(RunArgs),
}

#[derive(Debug, Args)]
pub struct NewArgs {
    /// Commitment identifier, e.g. 1.3.a
    pub commitment: String,

    /// Short project title
    pub title: String,

    /// Parent folder for the project (defaults to paths.projects_root)
    #[arg(long)]
    pub root: Option<PathBuf>,

    /// Folder date for the period subfolders (defaults to the reporting period)
    #[arg(long)]
    pub period: Option<String>,

    /// Fill in missing pieces of an existing project without overwriting files
    #[arg(long)]
    pub force: bool,

    /// Show what would be created without touching the filesystem
    #[arg(long)]
    pub dry_run: bool,
}

#[derive(Debug, Args)]
pub struct PeriodArgs {
    /// Reference date (any supported date shape; defaults to today)
    #[arg(long)]
    pub date: Option<String>,

    /// monthly, quarterly or annual (overrides periods.cadence)
    #[arg(long)]
    pub cadence: Option<String>,

    /// Periods to step back (overrides periods.lag)
    #[arg(long)]
    pub lag: Option<u32>,

    /// Also print the first and last day of the period
    #[arg(long)]
    pub range: bool,
}

#[derive(Debug, Args)]
pub struct PathsArgs {
    /// Folder date (defaults to the reporting period)
    #[arg(long)]
    pub period: Option<String>,
}

#[derive(Debug, Args)]
pub struct TableIo {
    /// Input CSV file
    pub input: PathBuf,

    /// Output file (.csv or .xlsx); CSV on stdout when omitted
    #[arg(short, long)]
    pub output: Option<PathBuf>,

    /// Replace the output file if it exists
    #[arg(long)]
    pub overwrite: bool,
}

#[derive(Debug, Args)]
pub struct ParseDatesArgs {
    #[command(flatten)]
    pub io: TableIo,

    /// Column holding the dates
    #[arg(long)]
    pub column: String,

    /// Write parsed dates to this column instead of replacing the source
    #[arg(long)]
    pub into: Option<String>,

    /// Read ambiguous values such as 03/04/2025 as day-first
    #[arg(long)]
    pub day_first: bool,
}

#[derive(Debug, Args)]
pub struct LosArgs {
    #[command(flatten)]
    pub io: TableIo,

    /// Admission date column
    #[arg(long)]
    pub admit: String,

    /// Discharge / release date column
    #[arg(long)]
    pub discharge: String,

    /// Name of the computed column
    #[arg(long, default_value = "los_days")]
    pub output_column: String,

    /// Measure open stays to this date (any date shape, period_end or today)
    #[arg(long)]
    pub as_of: Option<String>,

    /// Folder date whose end `--as-of period_end` refers to (defaults to the reporting period)
    #[arg(long)]
    pub period: Option<String>,

    /// Count both admission and discharge days
    #[arg(long)]
    pub inclusive: bool,

    /// Band upper bounds, e.g. 7,30,90,180,365
    #[arg(long, value_delimiter = ',')]
    pub bands: Vec<i64>,
}

#[derive(Debug, Args)]
pub struct FiscalYearArgs {
    #[command(flatten)]
    pub io: TableIo,

    /// Date column to tag
    #[arg(long)]
    pub column: String,

    /// First month of the fiscal year (overrides fiscal.start_month)
    #[arg(long)]
    pub start_month: Option<u32>,

    /// Skip the fiscal_quarter column
    #[arg(long)]
    pub no_quarter: bool,
}

#[derive(Debug, Args)]
pub struct FindArgs {
    /// Keywords that must appear in the file name
    #[arg(required = true)]
    pub keywords: Vec<String>,

    /// Directory to search (defaults to paths.data_root)
    #[arg(long)]
    pub root: Option<PathBuf>,

    /// Match any keyword instead of all
    #[arg(long)]
    pub any: bool,

    /// Restrict to these extensions, e.g. csv,xlsx
    #[arg(long, value_delimiter = ',')]
    pub ext: Vec<String>,

    /// Maximum directory depth to search
    #[arg(long)]
    pub max_depth: Option<usize>,

    /// Include hidden files and folders
    #[arg(long)]
    pub hidden: bool,

    /// Print only the most recently modified match
    #[arg(long)]
    pub latest: bool,

    /// Print matches as JSON
    #[arg(long)]
    pub json: bool,
}

#[derive(Debug, Args)]
pub struct ExportArgs {
    /// CSV files, one sheet each
    #[arg(required = true)]
    pub inputs: Vec<PathBuf>,

    /// Output workbook path
    #[arg(short, long, conflicts_with = "stem")]
    pub output: Option<PathBuf>,

    /// File stem; writes <output_root>/<period>/<stem>_<period>.xlsx
    #[arg(long)]
    pub stem: Option<String>,

    /// Folder date used with --stem (defaults to the reporting period)
    #[arg(long)]
    pub period: Option<String>,

    /// Sheet names in input order (defaults to the input file stems)
    #[arg(long, value_delimiter = ',')]
    pub sheets: Vec<String>,

    /// Replace the workbook if it exists
    #[arg(long)]
    pub overwrite: bool,
}

#[derive(Debug, Args)]
pub struct RunArgs {
    /// Recipe TOML file
    pub recipe: PathBuf,

    /// Directory recipe paths are relative to
    #[arg(long, default_value = ".")]
    pub base_dir: PathBuf,

    /// Folder date (overrides the recipe and the reporting period)
    #[arg(long)]
    pub period: Option<String>,

    /// Show the resolved input, steps and outputs without running
    #[arg(long)]
    pub dry_run: bool,
}
