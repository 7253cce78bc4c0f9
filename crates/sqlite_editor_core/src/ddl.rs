//! Canonical `CREATE TABLE` synthesis.
//!
//! # Responsibility
//! - Render a `TableDescriptor` as the exact DDL text shown in previews and
//!   executed on apply.
//! - Render `ADD COLUMN` clauses for the additive migration path.
//!
//! # Invariants
//! - Output is deterministic for a given field order.
//! - An empty descriptor or table name yields no text.
//!
//! Layout, one clause per line:
//!
//! ```text
//! CREATE TABLE "t" (
//! 	"id"	INTEGER NOT NULL,
//! 	"name"	VARCHAR(50) UNIQUE DEFAULT 'x' CHECK (length(name) > 0),
//! 	PRIMARY KEY("id" AUTOINCREMENT),
//! 	FOREIGN KEY("owner") REFERENCES "users"("id") ON DELETE CASCADE
//! );
//! ```

use crate::model::field::{FieldDescriptor, FkAction, ForeignKeyRef, TableDescriptor};

/// Quotes an identifier with double quotes, doubling embedded quotes.
pub fn quote_identifier(name: &str) -> String {
    format!("\"{}\"", name.replace('"', "\"\""))
}

/// Renders the canonical `CREATE TABLE` statement.
///
/// Returns `None` when there is nothing to preview or apply.
pub fn synthesize_create_table(table: &str, descriptor: &TableDescriptor) -> Option<String> {
    if table.trim().is_empty() || descriptor.is_empty() {
        return None;
    }

    let mut clauses = descriptor
        .fields()
        .iter()
        .map(column_clause)
        .collect::<Vec<_>>();
    if let Some(primary_key) = primary_key_clause(descriptor) {
        clauses.push(primary_key);
    }
    clauses.extend(descriptor.fields().iter().filter_map(|field| {
        field
            .foreign_key
            .as_ref()
            .map(|reference| foreign_key_clause(field, reference))
    }));

    Some(format!(
        "CREATE TABLE {} (\n{}\n);",
        quote_identifier(table),
        clauses.join(",\n")
    ))
}

fn column_clause(field: &FieldDescriptor) -> String {
    let mut clause = format!(
        "\t{}\t{}",
        quote_identifier(&field.name),
        field.field_type.sql()
    );
    if field.not_null {
        clause.push_str(" NOT NULL");
    }
    if field.effective_unique() {
        clause.push_str(" UNIQUE");
    }
    if let Some(default) = field.default_text() {
        clause.push_str(" DEFAULT ");
        clause.push_str(default);
    }
    if let Some(check) = field.check_text() {
        clause.push_str(&format!(" CHECK ({check})"));
    }
    clause
}

fn primary_key_clause(descriptor: &TableDescriptor) -> Option<String> {
    let columns = descriptor
        .primary_keys()
        .map(|field| {
            if field.auto_increment {
                format!("{} AUTOINCREMENT", quote_identifier(&field.name))
            } else {
                quote_identifier(&field.name)
            }
        })
        .collect::<Vec<_>>();
    if columns.is_empty() {
        return None;
    }
    Some(format!("\tPRIMARY KEY({})", columns.join(",")))
}

fn foreign_key_clause(field: &FieldDescriptor, reference: &ForeignKeyRef) -> String {
    let mut clause = format!(
        "\tFOREIGN KEY({}) REFERENCES {}({})",
        quote_identifier(&field.name),
        quote_identifier(&reference.target_table),
        quote_identifier(&reference.target_column)
    );
    if reference.on_delete != FkAction::Restrict {
        clause.push_str(" ON DELETE ");
        clause.push_str(reference.on_delete.as_sql());
    }
    if reference.on_update != FkAction::Restrict {
        clause.push_str(" ON UPDATE ");
        clause.push_str(reference.on_update.as_sql());
    }
    clause
}

/// Column definition used by `ALTER TABLE ... ADD COLUMN`.
///
/// `NOT NULL` is only emitted together with a default: the engine refuses a
/// NOT NULL column without one on a non-empty table. The second value is
/// `true` when the constraint was dropped for that reason.
pub fn add_column_definition(field: &FieldDescriptor) -> (String, bool) {
    let mut definition = format!(
        "{} {}",
        quote_identifier(&field.name),
        field.field_type.sql()
    );
    let default = field.default_text();
    let relaxed = field.not_null && default.is_none();
    if field.not_null && !relaxed {
        definition.push_str(" NOT NULL");
    }
    if let Some(default) = default {
        definition.push_str(" DEFAULT ");
        definition.push_str(default);
    }
    (definition, relaxed)
}

/// Recovers a column's `CHECK (...)` expression from canonical DDL.
///
/// Only column clauses in the layout produced by [`synthesize_create_table`]
/// are recognised; DDL written by other tools yields `None`.
pub(crate) fn extract_check_expression(create_sql: &str, column: &str) -> Option<String> {
    let prefix = format!("\t{}\t", quote_identifier(column));
    let line = create_sql.lines().find(|line| line.starts_with(&prefix))?;
    let start = line.find(" CHECK (")? + " CHECK (".len();

    let mut depth = 1usize;
    let mut in_string = false;
    for (offset, ch) in line[start..].char_indices() {
        match ch {
            '\'' => in_string = !in_string,
            '(' if !in_string => depth += 1,
            ')' if !in_string => {
                depth -= 1;
                if depth == 0 {
                    return Some(line[start..start + offset].to_string());
                }
            }
            _ => {}
        }
    }
    None
}
