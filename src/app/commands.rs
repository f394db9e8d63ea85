use crate::config::cli::{
    Cli, Command, ExportArgs, FindArgs, FiscalYearArgs, LosArgs, NewArgs, ParseDatesArgs, PathsArgs,
    PeriodArgs, RunArgs, TableIo,
};
use crate::config::{AnalystConfig, RecipeConfig, RecipeContext};
use crate::core::dates::{DateParser, DayOrder};
use crate::core::discovery::{self, FileQuery, MatchMode};
use crate::core::export::{self, Workbook};
use crate::core::fiscal::FiscalCalendar;
use crate::core::los::{self, LosBands, LosCounting, LosOptions};
use crate::core::period::{Cadence, Period};
use crate::core::project::{self, ProjectRequest};
use crate::core::steps::{CleanNamesStep, FiscalYearStep, LengthOfStayStep, ParseDatesStep};
use crate::domain::model::Table;
use crate::domain::ports::TableStep;
use crate::utils::error::{KitError, Result};
use crate::utils::validation::Validate;
use chrono::{Local, NaiveDate};
use std::io::Write;
use std::path::{Path, PathBuf};

/// Everything a command needs besides its own arguments.
pub struct Session {
    pub config: AnalystConfig,
    pub today: NaiveDate,
}

impl Session {
    pub fn load(config_path: Option<&Path>) -> Result<Self> {
        let config = AnalystConfig::load(config_path)?;
        config.validate()?;
        Ok(Self {
            config,
            today: Local::now().date_naive(),
        })
    }

    fn period_or_default(&self, token: Option<&str>) -> Result<Period> {
        match token {
            Some(token) => token.parse(),
            None => self.config.reporting_period(self.today),
        }
    }
}

pub fn run(cli: Cli) -> Result<()> {
    let session = Session::load(cli.config.as_deref())?;
    let stdout = std::io::stdout();
    let mut out = stdout.lock();
    execute(&session, cli.command, &mut out)?;
    out.flush()?;
    Ok(())
}

/// Runs one subcommand, writing its results to `out`.
pub fn execute<W: Write>(session: &Session, command: Command, out: &mut W) -> Result<()> {
    match command {
        Command::New(args) => new_project(session, args, out),
        Command::Period(args) => period(session, args, out),
        Command::Paths(args) => paths(session, args, out),
        Command::ParseDates(args) => parse_dates(session, args, out),
        Command::Los(args) => los(session, args, out),
        Command::FiscalYear(args) => fiscal_year(session, args, out),
        Command::CleanNames(io) => apply_step(&io, &CleanNamesStep, out),
        Command::Find(args) => find(session, args, out),
        Command::Export(args) => export_workbook(session, args, out),
        Command::Run(args) => run_recipe(session, args, out),
    }
}

fn new_project<W: Write>(session: &Session, args: NewArgs, out: &mut W) -> Result<()> {
    let request = ProjectRequest {
        commitment: args.commitment.parse()?,
        title: args.title,
        period: session.period_or_default(args.period.as_deref())?,
        created: session.today,
    };
    let root = args
        .root
        .unwrap_or_else(|| session.config.workspace().projects_root);
    let plan = project::plan(&request, &session.config.scaffold_config(), &root);

    if args.dry_run {
        tracing::info!("🔍 DRY RUN MODE - nothing will be created");
        writeln!(out, "{}", plan.root.display())?;
        for dir in &plan.dirs {
            writeln!(out, "  dir  {}", dir.display())?;
        }
        for file in &plan.files {
            writeln!(out, "  file {}", file.path.display())?;
        }
        return Ok(());
    }

    let report = project::scaffold(&plan, args.force)?;
    tracing::info!(
        "✅ Project ready: {} ({} folders, {} files created, {} kept)",
        plan.root.display(),
        report.created_dirs.len(),
        report.created_files.len(),
        report.skipped_files.len()
    );
    writeln!(out, "{}", plan.root.display())?;
    Ok(())
}

fn period<W: Write>(session: &Session, args: PeriodArgs, out: &mut W) -> Result<()> {
    let date = match args.date.as_deref() {
        Some(raw) => session
            .config
            .date_parser()
            .parse(raw)?
            .ok_or_else(|| KitError::DateParseError {
                value: raw.to_string(),
            })?,
        None => session.today,
    };
    let cadence = match args.cadence.as_deref() {
        Some(raw) => raw.parse::<Cadence>()?,
        None => session.config.periods.cadence,
    };
    let lag = args.lag.unwrap_or(session.config.periods.lag);

    let period = Period::reporting(date, cadence, lag)?;
    if args.range {
        writeln!(out, "{}\t{}\t{}", period, period.start_date(), period.end_date())?;
    } else {
        writeln!(out, "{}", period)?;
    }
    Ok(())
}

fn paths<W: Write>(session: &Session, args: PathsArgs, out: &mut W) -> Result<()> {
    let period = session.period_or_default(args.period.as_deref())?;
    let workspace = session.config.workspace();
    writeln!(out, "folder_date\t{}", period)?;
    writeln!(out, "projects_root\t{}", workspace.projects_root.display())?;
    writeln!(out, "data_dir\t{}", workspace.data_dir(&period).display())?;
    writeln!(out, "output_dir\t{}", workspace.output_dir(&period).display())?;
    Ok(())
}

fn parse_dates<W: Write>(session: &Session, args: ParseDatesArgs, out: &mut W) -> Result<()> {
    let parser = if args.day_first {
        DateParser::new(DayOrder::DayFirst).with_na_values(&session.config.dates.na_values)
    } else {
        session.config.date_parser()
    };
    let step = ParseDatesStep {
        column: args.column,
        into: args.into,
        parser,
    };
    apply_step(&args.io, &step, out)
}

fn los<W: Write>(session: &Session, args: LosArgs, out: &mut W) -> Result<()> {
    let as_of = match args.as_of.as_deref() {
        Some(raw) => Some(los::resolve_as_of(
            raw,
            &session.period_or_default(args.period.as_deref())?,
            session.today,
            &session.config.date_parser(),
        )?),
        None => None,
    };

    let step = LengthOfStayStep {
        admit_column: args.admit,
        discharge_column: args.discharge,
        output_column: args.output_column,
        options: LosOptions {
            counting: if args.inclusive {
                LosCounting::Inclusive
            } else {
                LosCounting::Nights
            },
            as_of,
        },
        bands: if args.bands.is_empty() {
            None
        } else {
            Some(LosBands::new(args.bands))
        },
        parser: session.config.date_parser(),
    };
    apply_step(&args.io, &step, out)
}

fn fiscal_year<W: Write>(session: &Session, args: FiscalYearArgs, out: &mut W) -> Result<()> {
    let calendar = match args.start_month {
        Some(month) => FiscalCalendar::new(month, session.config.fiscal.label)?,
        None => session.config.fiscal_calendar()?,
    };
    let step = FiscalYearStep {
        column: args.column,
        calendar,
        with_quarter: !args.no_quarter,
        parser: session.config.date_parser(),
    };
    apply_step(&args.io, &step, out)
}

fn apply_step<W: Write>(io: &TableIo, step: &dyn TableStep, out: &mut W) -> Result<()> {
    let table = Table::from_csv_path(&io.input)?;
    tracing::debug!(
        "Applying '{}' to {} ({} rows)",
        step.name(),
        io.input.display(),
        table.len()
    );

    let outcome = step.apply(table)?;
    for warning in &outcome.warnings {
        tracing::warn!(
            "⚠️ row {} [{}] '{}': {}",
            warning.row,
            warning.column,
            warning.value,
            warning.message
        );
    }
    if !outcome.warnings.is_empty() {
        tracing::warn!("{} row(s) need attention", outcome.warnings.len());
    }

    write_table(outcome.table, io.output.as_deref(), io.overwrite, step.name(), out)
}

fn is_xlsx(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .map(|e| e.eq_ignore_ascii_case("xlsx"))
        .unwrap_or(false)
}

fn write_table<W: Write>(
    table: Table,
    output: Option<&Path>,
    overwrite: bool,
    sheet: &str,
    out: &mut W,
) -> Result<()> {
    match output {
        None => table.to_csv_writer(&mut *out)?,
        Some(path) if is_xlsx(path) => {
            let mut workbook = Workbook::new();
            workbook.add_sheet(sheet, table);
            let written = workbook.write_xlsx(path, overwrite)?;
            tracing::info!("📁 Output saved to: {}", written.display());
        }
        Some(path) => {
            let written = export::write_csv(path, &table, overwrite)?;
            tracing::info!("📁 Output saved to: {}", written.display());
        }
    }
    Ok(())
}

fn find<W: Write>(session: &Session, args: FindArgs, out: &mut W) -> Result<()> {
    let root = args
        .root
        .unwrap_or_else(|| session.config.workspace().data_root);
    let query = FileQuery {
        mode: if args.any { MatchMode::Any } else { MatchMode::All },
        max_depth: args.max_depth,
        include_hidden: args.hidden,
        ..FileQuery::new(args.keywords)
    }
    .with_extensions(&args.ext);

    let found = if args.latest {
        vec![discovery::latest_file(&root, &query)?]
    } else {
        discovery::find_files(&root, &query)?
    };

    if args.json {
        writeln!(out, "{}", serde_json::to_string_pretty(&found)?)?;
        return Ok(());
    }
    for file in &found {
        let modified = file
            .modified
            .map(|m| m.format("%Y-%m-%d %H:%M").to_string())
            .unwrap_or_else(|| "-".to_string());
        writeln!(out, "{}\t{}\t{}", modified, file.size, file.path.display())?;
    }
    if found.is_empty() {
        tracing::info!("No files matched {:?} under {}", query.keywords, root.display());
    }
    Ok(())
}

fn export_workbook<W: Write>(session: &Session, args: ExportArgs, out: &mut W) -> Result<()> {
    let output: PathBuf = match (&args.output, &args.stem) {
        (Some(path), _) => path.clone(),
        (None, Some(stem)) => {
            let period = session.period_or_default(args.period.as_deref())?;
            export::output_file_path(&session.config.workspace().output_root, &period, stem, "xlsx")
        }
        (None, None) => {
            return Err(KitError::ConfigError {
                message: "export needs --output or --stem".to_string(),
            })
        }
    };

    let mut workbook = Workbook::new();
    for (i, input) in args.inputs.iter().enumerate() {
        let table = Table::from_csv_path(input)?;
        let default_name = input
            .file_stem()
            .and_then(|s| s.to_str())
            .unwrap_or("Sheet")
            .to_string();
        let requested = args.sheets.get(i).cloned().unwrap_or(default_name);
        let name = workbook.add_sheet(&requested, table);
        if name != requested {
            tracing::info!("Sheet '{}' renamed to '{}'", requested, name);
        }
    }

    let written = workbook.write_xlsx(&output, args.overwrite)?;
    tracing::info!(
        "📁 Workbook saved to: {} ({} sheets)",
        written.display(),
        workbook.sheet_names().len()
    );
    writeln!(out, "{}", written.display())?;
    Ok(())
}

fn run_recipe<W: Write>(session: &Session, args: RunArgs, out: &mut W) -> Result<()> {
    tracing::info!("📁 Loading recipe from: {}", args.recipe.display());
    let recipe = RecipeConfig::from_file(&args.recipe)?;
    recipe.validate()?;

    let period = match (args.period.as_deref(), recipe.recipe.period) {
        (Some(token), _) => token.parse()?,
        (None, Some(period)) => period,
        (None, None) => session.config.reporting_period(session.today)?,
    };
    let ctx = RecipeContext {
        analyst: &session.config,
        period,
        today: session.today,
    };
    let engine = recipe.build_engine(&args.base_dir, &ctx)?;

    if args.dry_run {
        tracing::info!("🔍 DRY RUN MODE - No actual processing will occur");
        writeln!(out, "recipe\t{}", recipe.recipe.name)?;
        writeln!(out, "period\t{}", period)?;
        writeln!(out, "input\t{}", args.base_dir.join(recipe.input_path(&period)).display())?;
        writeln!(out, "steps\t{}", engine.step_names().join(", "))?;
        for target in recipe.output_targets(&period)? {
            writeln!(out, "output\t{}", args.base_dir.join(&target.path).display())?;
        }
        return Ok(());
    }

    let report = engine.run()?;
    tracing::info!(
        "✅ Recipe '{}' finished: {} rows, {} columns, {} warning(s)",
        recipe.recipe.name,
        report.rows,
        report.columns,
        report.warnings.len()
    );
    for path in &report.outputs {
        writeln!(out, "{}", path.display())?;
    }
    Ok(())
}
