//! Command-line front end for the schema editor core.
//!
//! # Responsibility
//! - Map subcommands onto core operations against one database file.
//! - Print structured results as JSON and errors on stderr.

use clap::{Parser, Subcommand};
use sqlite_editor_core::{
    export_csv, import_csv, init_logging, CancellationToken, ColumnFilter, ColumnType,
    EditorError, PageRequest, QueryExecutor, RowChange, RowEditor, SchemaMigrator,
    Session, SessionSettings, SortSpec, TableDescriptor,
};
use std::error::Error;
use std::fs::File;
use std::io::{self, BufReader, BufWriter};
use std::path::{Path, PathBuf};
use std::process::ExitCode;

type CliResult<T> = Result<T, Box<dyn Error>>;

#[derive(Parser, Debug)]
#[command(name = "sqlite-editor")]
#[command(about = "Inspect and migrate SQLite table schemas")]
#[command(version)]
struct Cli {
    /// Database file to open (created if missing).
    #[arg(long, env = "SQLITE_EDITOR_DB")]
    db: PathBuf,

    /// trace|debug|info|warn|error
    #[arg(long, env = "SQLITE_EDITOR_LOG_LEVEL", default_value = sqlite_editor_core::default_log_level())]
    log_level: String,

    /// Absolute directory for rotating log files; logging is off without it.
    #[arg(long, env = "SQLITE_EDITOR_LOG_DIR")]
    log_dir: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// List user tables
    Tables,
    /// Show a table's descriptor and stored DDL
    Schema { table: String },
    /// Show the DDL and migration plan for a descriptor file
    Preview {
        table: String,
        /// JSON array of field descriptors
        #[arg(long)]
        fields: PathBuf,
    },
    /// Apply a descriptor file to a table
    Apply {
        table: String,
        #[arg(long)]
        fields: PathBuf,
    },
    /// Run one SQL statement
    Query { sql: String },
    /// Print one page of rows
    Page {
        table: String,
        #[arg(long, default_value_t = 1)]
        page: usize,
        #[arg(long, default_value_t = 50)]
        page_size: usize,
        /// `column=text` substring filter; repeatable
        #[arg(long = "filter", value_parser = parse_filter)]
        filters: Vec<ColumnFilter>,
        #[arg(long)]
        sort: Option<String>,
        #[arg(long, requires = "sort")]
        desc: bool,
    },
    /// Apply a JSON array of row changes in one transaction
    Save {
        table: String,
        #[arg(long)]
        changes: PathBuf,
    },
    /// Write a table as CSV (stdout when no file is given)
    Export {
        table: String,
        #[arg(long)]
        out: Option<PathBuf>,
    },
    /// Append CSV rows to a table
    Import { table: String, file: PathBuf },
    /// List tables a field of the given type may reference
    FkTargets {
        table: String,
        #[arg(long = "type")]
        field_type: String,
    },
    /// Copy a table's data into a new table
    Backup { table: String, backup: String },
}

fn parse_filter(value: &str) -> Result<ColumnFilter, String> {
    let (column, pattern) = value
        .split_once('=')
        .ok_or_else(|| format!("expected column=text, got `{value}`"))?;
    Ok(ColumnFilter {
        column: column.trim().to_string(),
        pattern: pattern.to_string(),
    })
}

fn read_json<T: serde::de::DeserializeOwned>(path: &Path) -> CliResult<T> {
    let file = File::open(path)?;
    Ok(serde_json::from_reader(BufReader::new(file))?)
}

fn print_json(value: &impl serde::Serialize) -> CliResult<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

fn run(cli: Cli) -> CliResult<()> {
    if let Some(dir) = &cli.log_dir {
        init_logging(&cli.log_level, dir)?;
    }

    let mut session = Session::new(SessionSettings::default());
    session.open(&cli.db)?;

    match cli.command {
        Command::Tables => {
            for table in session.catalog()?.tables()? {
                println!("{table}");
            }
        }
        Command::Schema { table } => {
            let catalog = session.catalog()?;
            print_json(&catalog.load_table_descriptor(&table)?)?;
            println!("{}", catalog.table_sql(&table)?);
        }
        Command::Preview { table, fields } => {
            let desired: TableDescriptor = read_json(&fields)?;
            let plan = SchemaMigrator::new(&session)?.plan(&table, &desired)?;
            println!("{}", plan.create_sql);
            print_json(&plan)?;
        }
        Command::Apply { table, fields } => {
            let desired: TableDescriptor = read_json(&fields)?;
            let outcome = SchemaMigrator::new(&session)?.apply_changes(&table, &desired)?;
            for warning in &outcome.warnings {
                eprintln!("warning: {warning}");
            }
            print_json(&outcome)?;
        }
        Command::Query { sql } => {
            print_json(&QueryExecutor::new(&session)?.execute_with_retry(&sql)?)?;
        }
        Command::Page {
            table,
            page,
            page_size,
            filters,
            sort,
            desc,
        } => {
            let request = PageRequest {
                page,
                page_size,
                filters,
                sort: sort.map(|column| SortSpec {
                    column,
                    descending: desc,
                }),
            };
            print_json(&RowEditor::new(&session)?.page(&table, &request)?)?;
        }
        Command::Save { table, changes } => {
            let changes: Vec<RowChange> = read_json(&changes)?;
            let summary = RowEditor::new(&session)?.save_changes_with_progress(
                &table,
                &changes,
                &CancellationToken::new(),
                |done, total| eprint!("\rsaving {done}/{total}"),
            )?;
            eprintln!();
            print_json(&summary)?;
        }
        Command::Export { table, out } => {
            let rows = match out {
                Some(path) => export_csv(&session, &table, BufWriter::new(File::create(path)?))?,
                None => export_csv(&session, &table, io::stdout().lock())?,
            };
            eprintln!("exported {rows} rows");
        }
        Command::Import { table, file } => {
            let rows = import_csv(&session, &table, BufReader::new(File::open(file)?))?;
            eprintln!("imported {rows} rows");
        }
        Command::FkTargets { table, field_type } => {
            let targets = session
                .catalog()?
                .fk_targets(&table, &ColumnType::parse(&field_type))?;
            for target in targets {
                println!("{}.{} ({})", target.table, target.column, target.declared_type);
            }
        }
        Command::Backup { table, backup } => {
            session.backup_table(&table, &backup)?;
        }
    }

    session.close();
    Ok(())
}

/// Stable error code and exit status for a failed run.
///
/// Failures outside the core (argument files, logging setup) report
/// `unexpected` with status 1.
fn error_code(err: &(dyn Error + 'static)) -> (&'static str, u8) {
    let Some(err) = err.downcast_ref::<EditorError>() else {
        return ("unexpected", 1);
    };
    let status = match err {
        EditorError::Validation(_) => 2,
        EditorError::Busy { .. } => 3,
        EditorError::Constraint { .. } => 4,
        EditorError::Engine { .. } => 5,
        EditorError::Cancelled { .. } => 6,
        EditorError::Unexpected { .. } => 1,
    };
    (err.code(), status)
}

fn main() -> ExitCode {
    match run(Cli::parse()) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            let (code, status) = error_code(err.as_ref());
            eprintln!("error[{code}]: {err}");
            log::error!("event=cli_exit module=cli status=error error_code={code} error={err}");
            ExitCode::from(status)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::error_code;
    use sqlite_editor_core::{EditorError, ValidationError};
    use std::error::Error;

    #[test]
    fn editor_errors_map_to_their_code_and_status() {
        let busy: Box<dyn Error> = Box::new(EditorError::Busy {
            context: "query".to_string(),
            message: "database is locked".to_string(),
        });
        assert_eq!(error_code(busy.as_ref()), ("busy", 3));

        let invalid: Box<dyn Error> =
            Box::new(EditorError::Validation(ValidationError::EmptyQuery));
        assert_eq!(error_code(invalid.as_ref()), ("validation", 2));
    }

    #[test]
    fn foreign_errors_are_unexpected() {
        let io: Box<dyn Error> = Box::new(std::io::Error::other("missing file"));
        assert_eq!(error_code(io.as_ref()), ("unexpected", 1));
    }
}
