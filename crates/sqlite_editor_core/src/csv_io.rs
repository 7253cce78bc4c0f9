//! CSV export and import for one table.
//!
//! # Invariants
//! - Export writes a header in catalog column order, then every row.
//! - Import accepts a header that equals a leading run of the table's
//!   columns; nothing is inserted otherwise.
//! - Empty cells and missing trailing cells are imported as NULL, mirroring
//!   how export renders NULL.
//! - All imported rows commit together.

use crate::catalog::CatalogReader;
use crate::db::Session;
use crate::ddl::quote_identifier;
use crate::error::{EditorError, EditorResult, EngineResultExt};
use crate::model::field::ValidationError;
use crate::rows::render_cell;
use log::info;
use rusqlite::types::Value;
use rusqlite::{params_from_iter, Transaction, TransactionBehavior};
use std::io::{Read, Write};

const UTF8_BOM: char = '\u{feff}';

fn csv_error(table: &str, err: impl std::fmt::Display) -> EditorError {
    EditorError::unexpected(format!("csv for table `{table}`"), err.to_string())
}

/// Writes `table` as CSV; returns the number of data rows written.
pub fn export_csv<W: Write>(session: &Session, table: &str, writer: W) -> EditorResult<usize> {
    let conn = session.connection()?;
    let snapshot = session.catalog()?.table_info(table)?;
    if !snapshot.exists() {
        return Err(EditorError::Engine {
            context: format!("table `{table}`"),
            message: "no such table".to_string(),
        });
    }

    let mut out = csv::Writer::from_writer(writer);
    out.write_record(snapshot.column_names())
        .map_err(|err| csv_error(table, err))?;

    let mut stmt = conn
        .prepare(&format!("SELECT * FROM {};", quote_identifier(table)))
        .in_table(table)?;
    let width = snapshot.columns.len();
    let mut rows = stmt.query([]).in_table(table)?;
    let mut written = 0;
    while let Some(row) = rows.next().in_table(table)? {
        let mut record = Vec::with_capacity(width);
        for index in 0..width {
            record.push(render_cell(row.get_ref(index).in_table(table)?).unwrap_or_default());
        }
        out.write_record(&record)
            .map_err(|err| csv_error(table, err))?;
        written += 1;
    }
    out.flush().map_err(|err| csv_error(table, err))?;

    info!("event=csv_export module=csv status=ok table={table} rows={written}");
    Ok(written)
}

/// Appends CSV rows to `table`; returns the number of rows inserted.
///
/// # Errors
/// - `Validation(CsvHeaderMismatch)` when the header is not a prefix of the
///   table's columns.
/// - `Constraint` when a row is rejected; no row is kept.
pub fn import_csv<R: Read>(session: &Session, table: &str, reader: R) -> EditorResult<usize> {
    let conn = session.connection()?;
    let catalog: CatalogReader<'_> = session.catalog()?;
    let columns = catalog.table_info(table)?.column_names();

    let mut input = csv::ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .from_reader(reader);
    let header = input
        .headers()
        .map_err(|err| csv_error(table, err))?
        .iter()
        .enumerate()
        .map(|(index, name)| {
            let name = if index == 0 {
                name.trim_start_matches(UTF8_BOM)
            } else {
                name
            };
            name.trim().to_string()
        })
        .collect::<Vec<_>>();

    let is_prefix = !header.is_empty()
        && header.len() <= columns.len()
        && header.iter().zip(&columns).all(|(left, right)| left == right);
    if !is_prefix {
        return Err(ValidationError::CsvHeaderMismatch {
            table: table.to_string(),
            header,
            columns,
        }
        .into());
    }

    let width = header.len();
    let sql = format!(
        "INSERT INTO {} ({}) VALUES ({});",
        quote_identifier(table),
        header
            .iter()
            .map(|name| quote_identifier(name))
            .collect::<Vec<_>>()
            .join(", "),
        vec!["?"; width].join(", ")
    );

    let tx = Transaction::new_unchecked(conn, TransactionBehavior::Immediate).in_table(table)?;
    let mut inserted = 0;
    {
        let mut stmt = tx.prepare(&sql).in_table(table)?;
        for record in input.records() {
            let record = record.map_err(|err| csv_error(table, err))?;
            if record.len() > width {
                return Err(ValidationError::ValueCountMismatch {
                    table: table.to_string(),
                    expected: width,
                    actual: record.len(),
                }
                .into());
            }
            let values = (0..width)
                .map(|index| match record.get(index) {
                    Some(cell) if !cell.is_empty() => Value::Text(cell.to_string()),
                    _ => Value::Null,
                })
                .collect::<Vec<_>>();
            stmt.execute(params_from_iter(values.iter()))
                .in_table(table)?;
            inserted += 1;
        }
    }
    tx.commit().in_table(table)?;

    info!("event=csv_import module=csv status=ok table={table} rows={inserted}");
    Ok(inserted)
}
