//! Field descriptor model for table schema editing.
//!
//! # Responsibility
//! - Describe one table's desired column set, independent of any UI.
//! - Validate descriptor invariants before anything reaches the engine.
//!
//! # Invariants
//! - Field names are non-empty and unique within one descriptor.
//! - At most one auto-increment field, typed `INTEGER`, and it is the only
//!   primary-key column.
//! - `unique` is ignored when `primary_key` is set.

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::error::Error;
use std::fmt::{Display, Formatter};

static DECLARED_TYPE_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^([A-Za-z]+)\s*(?:\(\s*(\d+)\s*\))?$").expect("valid declared type regex")
});

/// Column type kinds offered by the schema editor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum TypeKind {
    Integer,
    Text,
    Real,
    Blob,
    Numeric,
    Date,
    Boolean,
    Char,
    Varchar,
}

impl TypeKind {
    pub const ALL: [TypeKind; 9] = [
        TypeKind::Integer,
        TypeKind::Text,
        TypeKind::Real,
        TypeKind::Blob,
        TypeKind::Numeric,
        TypeKind::Date,
        TypeKind::Boolean,
        TypeKind::Char,
        TypeKind::Varchar,
    ];

    pub fn as_sql(self) -> &'static str {
        match self {
            Self::Integer => "INTEGER",
            Self::Text => "TEXT",
            Self::Real => "REAL",
            Self::Blob => "BLOB",
            Self::Numeric => "NUMERIC",
            Self::Date => "DATE",
            Self::Boolean => "BOOLEAN",
            Self::Char => "CHAR",
            Self::Varchar => "VARCHAR",
        }
    }

    /// Case-insensitive lookup by SQL keyword.
    pub fn parse(value: &str) -> Option<Self> {
        let upper = value.trim().to_ascii_uppercase();
        Self::ALL
            .into_iter()
            .find(|kind| kind.as_sql() == upper.as_str())
    }

    /// Whether a `(length)` suffix is meaningful for this kind.
    pub fn takes_length(self) -> bool {
        matches!(self, Self::Char | Self::Varchar)
    }
}

/// Declared type of one column.
///
/// `Other` keeps declared types read from a catalog verbatim when they fall
/// outside [`TypeKind`] (e.g. `DATETIME`, `DECIMAL(10,2)` or an untyped
/// column). An empty `Other` means "no type assigned".
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum ColumnType {
    Known {
        kind: TypeKind,
        length: Option<u32>,
    },
    Other(String),
}

impl ColumnType {
    pub fn new(kind: TypeKind) -> Self {
        Self::Known { kind, length: None }
    }

    /// Builds a length-parameterized type. The length is dropped for kinds
    /// that do not take one.
    pub fn with_length(kind: TypeKind, length: u32) -> Self {
        let length = (kind.takes_length() && length > 0).then_some(length);
        Self::Known { kind, length }
    }

    /// Placeholder for a field whose type has not been chosen yet.
    pub fn unassigned() -> Self {
        Self::Other(String::new())
    }

    /// Parses a declared type as stored by the engine.
    ///
    /// Never fails: anything that is not an exact kind (plus a length for
    /// CHAR/VARCHAR) is kept verbatim as `Other`.
    pub fn parse(declared: &str) -> Self {
        let trimmed = declared.trim();
        let Some(captures) = DECLARED_TYPE_RE.captures(trimmed) else {
            return Self::Other(trimmed.to_string());
        };
        let Some(kind) = TypeKind::parse(&captures[1]) else {
            return Self::Other(trimmed.to_string());
        };

        match captures.get(2) {
            None => Self::Known { kind, length: None },
            Some(length) if kind.takes_length() => match length.as_str().parse::<u32>() {
                Ok(value) if value > 0 => Self::Known {
                    kind,
                    length: Some(value),
                },
                _ => Self::Other(trimmed.to_string()),
            },
            Some(_) => Self::Other(trimmed.to_string()),
        }
    }

    /// SQL text used in column clauses, e.g. `VARCHAR(50)`.
    pub fn sql(&self) -> String {
        match self {
            Self::Known {
                kind,
                length: Some(length),
            } if kind.takes_length() => format!("{}({length})", kind.as_sql()),
            Self::Known { kind, .. } => kind.as_sql().to_string(),
            Self::Other(text) => text.clone(),
        }
    }

    /// Type with any `(...)` parameter stripped, upper-cased.
    pub fn base_type(&self) -> String {
        base_type_of(&self.sql())
    }

    pub fn kind(&self) -> Option<TypeKind> {
        match self {
            Self::Known { kind, .. } => Some(*kind),
            Self::Other(_) => None,
        }
    }

    pub fn length(&self) -> Option<u32> {
        match self {
            Self::Known { length, .. } => *length,
            Self::Other(_) => None,
        }
    }

    pub fn is_assigned(&self) -> bool {
        !self.sql().trim().is_empty()
    }

    /// Whether this type would be stored as the given declared type.
    pub fn matches_declared(&self, declared: &str) -> bool {
        normalize_type_text(&self.sql()) == normalize_type_text(declared)
    }
}

impl Display for ColumnType {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.sql())
    }
}

impl From<TypeKind> for ColumnType {
    fn from(value: TypeKind) -> Self {
        Self::new(value)
    }
}

impl TryFrom<String> for ColumnType {
    type Error = std::convert::Infallible;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Ok(Self::parse(&value))
    }
}

impl From<ColumnType> for String {
    fn from(value: ColumnType) -> Self {
        value.sql()
    }
}

/// Returns `declared` with any `(...)` suffix removed, upper-cased.
pub fn base_type_of(declared: &str) -> String {
    let base = match declared.find('(') {
        Some(index) => &declared[..index],
        None => declared,
    };
    base.trim().to_ascii_uppercase()
}

fn normalize_type_text(value: &str) -> String {
    value
        .chars()
        .filter(|ch| !ch.is_whitespace())
        .collect::<String>()
        .to_ascii_uppercase()
}

/// Referential action for `ON DELETE` / `ON UPDATE`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum FkAction {
    #[serde(rename = "NO ACTION")]
    NoAction,
    #[serde(rename = "CASCADE")]
    Cascade,
    #[serde(rename = "SET NULL")]
    SetNull,
    #[serde(rename = "SET DEFAULT")]
    SetDefault,
    /// Editor default; rendered by omitting the sub-clause.
    #[default]
    #[serde(rename = "RESTRICT")]
    Restrict,
}

impl FkAction {
    pub fn as_sql(self) -> &'static str {
        match self {
            Self::NoAction => "NO ACTION",
            Self::Cascade => "CASCADE",
            Self::SetNull => "SET NULL",
            Self::SetDefault => "SET DEFAULT",
            Self::Restrict => "RESTRICT",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        let normalized = value.split_whitespace().collect::<Vec<_>>().join(" ");
        match normalized.to_ascii_uppercase().as_str() {
            "NO ACTION" => Some(Self::NoAction),
            "CASCADE" => Some(Self::Cascade),
            "SET NULL" => Some(Self::SetNull),
            "SET DEFAULT" => Some(Self::SetDefault),
            "RESTRICT" => Some(Self::Restrict),
            _ => None,
        }
    }

    /// Action the engine records once the generated DDL is executed.
    ///
    /// `Restrict` is never written out, so the engine stores `NO ACTION`.
    pub fn effective(self) -> Self {
        match self {
            Self::Restrict => Self::NoAction,
            other => other,
        }
    }
}

impl Display for FkAction {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_sql())
    }
}

/// Foreign-key reference carried by one field.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ForeignKeyRef {
    pub target_table: String,
    pub target_column: String,
    #[serde(default)]
    pub on_delete: FkAction,
    #[serde(default)]
    pub on_update: FkAction,
}

impl ForeignKeyRef {
    pub fn new(target_table: impl Into<String>, target_column: impl Into<String>) -> Self {
        Self {
            target_table: target_table.into(),
            target_column: target_column.into(),
            on_delete: FkAction::Restrict,
            on_update: FkAction::Restrict,
        }
    }

    /// Compares references the way the engine would store them.
    pub fn same_effect(&self, other: &ForeignKeyRef) -> bool {
        self.target_table.eq_ignore_ascii_case(&other.target_table)
            && self.target_column.eq_ignore_ascii_case(&other.target_column)
            && self.on_delete.effective() == other.on_delete.effective()
            && self.on_update.effective() == other.on_update.effective()
    }
}

/// One declared column.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldDescriptor {
    pub name: String,
    #[serde(rename = "type")]
    pub field_type: ColumnType,
    #[serde(default)]
    pub not_null: bool,
    #[serde(default)]
    pub primary_key: bool,
    #[serde(default)]
    pub auto_increment: bool,
    #[serde(default)]
    pub unique: bool,
    #[serde(default)]
    pub default_value: Option<String>,
    #[serde(default)]
    pub check_expression: Option<String>,
    #[serde(default)]
    pub foreign_key: Option<ForeignKeyRef>,
}

impl FieldDescriptor {
    pub fn new(name: impl Into<String>, field_type: impl Into<ColumnType>) -> Self {
        Self {
            name: name.into(),
            field_type: field_type.into(),
            not_null: false,
            primary_key: false,
            auto_increment: false,
            unique: false,
            default_value: None,
            check_expression: None,
            foreign_key: None,
        }
    }

    pub fn not_null(mut self) -> Self {
        self.not_null = true;
        self
    }

    pub fn primary_key(mut self) -> Self {
        self.primary_key = true;
        self
    }

    /// Marks the field auto-increment, which implies primary key.
    pub fn auto_increment(mut self) -> Self {
        self.auto_increment = true;
        self.primary_key = true;
        self
    }

    pub fn unique(mut self) -> Self {
        self.unique = true;
        self
    }

    pub fn default_value(mut self, value: impl Into<String>) -> Self {
        self.default_value = Some(value.into());
        self
    }

    pub fn check(mut self, expression: impl Into<String>) -> Self {
        self.check_expression = Some(expression.into());
        self
    }

    pub fn references(mut self, reference: ForeignKeyRef) -> Self {
        self.foreign_key = Some(reference);
        self
    }

    /// Default literal, if a non-blank one is set.
    pub fn default_text(&self) -> Option<&str> {
        non_blank(self.default_value.as_deref())
    }

    /// Check expression, if a non-blank one is set.
    pub fn check_text(&self) -> Option<&str> {
        non_blank(self.check_expression.as_deref())
    }

    /// `UNIQUE` as it would be rendered; redundant on primary keys.
    pub fn effective_unique(&self) -> bool {
        self.unique && !self.primary_key
    }

    /// Whether this field carries constraints `ADD COLUMN` cannot express.
    pub fn needs_table_constraints(&self) -> bool {
        self.primary_key
            || self.auto_increment
            || self.effective_unique()
            || self.check_text().is_some()
            || self.foreign_key.is_some()
    }
}

fn non_blank(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|text| !text.is_empty())
}

/// Ordered column set of one table.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TableDescriptor {
    fields: Vec<FieldDescriptor>,
}

impl TableDescriptor {
    pub fn new() -> Self {
        Self::default()
    }

    /// Wraps fields without validating them; see [`TableDescriptor::validate`].
    pub fn from_fields(fields: Vec<FieldDescriptor>) -> Self {
        Self { fields }
    }

    pub fn fields(&self) -> &[FieldDescriptor] {
        &self.fields
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    pub fn field(&self, name: &str) -> Option<&FieldDescriptor> {
        self.fields.iter().find(|field| field.name == name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.field(name).is_some()
    }

    pub fn names(&self) -> Vec<&str> {
        self.fields.iter().map(|field| field.name.as_str()).collect()
    }

    pub fn primary_keys(&self) -> impl Iterator<Item = &FieldDescriptor> {
        self.fields.iter().filter(|field| field.primary_key)
    }

    /// Appends a field after checking it against the current set.
    pub fn add_field(&mut self, field: FieldDescriptor) -> Result<(), ValidationError> {
        check_field_shape(&field)?;
        if self.contains(&field.name) {
            return Err(ValidationError::DuplicateFieldName(field.name));
        }
        if field.auto_increment {
            if let Some(existing) = self.fields.iter().find(|f| f.auto_increment) {
                return Err(ValidationError::MultipleAutoIncrement {
                    first: existing.name.clone(),
                    second: field.name,
                });
            }
        }
        self.fields.push(field);
        Ok(())
    }

    /// Replaces the field named `old_name` in place, keeping its position.
    pub fn modify_field(
        &mut self,
        old_name: &str,
        field: FieldDescriptor,
    ) -> Result<(), ValidationError> {
        let index = self
            .fields
            .iter()
            .position(|f| f.name == old_name)
            .ok_or_else(|| ValidationError::FieldNotFound(old_name.to_string()))?;
        check_field_shape(&field)?;

        let others = self
            .fields
            .iter()
            .enumerate()
            .filter(|(position, _)| *position != index)
            .map(|(_, f)| f);
        for other in others {
            if other.name == field.name {
                return Err(ValidationError::DuplicateFieldName(field.name));
            }
            if field.auto_increment && other.auto_increment {
                return Err(ValidationError::MultipleAutoIncrement {
                    first: other.name.clone(),
                    second: field.name,
                });
            }
        }

        self.fields[index] = field;
        Ok(())
    }

    /// Removes and returns the named field.
    pub fn remove_field(&mut self, name: &str) -> Result<FieldDescriptor, ValidationError> {
        let index = self
            .fields
            .iter()
            .position(|f| f.name == name)
            .ok_or_else(|| ValidationError::FieldNotFound(name.to_string()))?;
        Ok(self.fields.remove(index))
    }

    /// Validates the whole descriptor.
    ///
    /// # Errors
    /// - Returns the first violated invariant, naming the offending field.
    pub fn validate(&self) -> Result<(), ValidationError> {
        let mut seen = HashSet::new();
        let mut auto_field: Option<&str> = None;

        for field in &self.fields {
            check_field_shape(field)?;
            if !seen.insert(field.name.as_str()) {
                return Err(ValidationError::DuplicateFieldName(field.name.clone()));
            }
            if field.auto_increment {
                if let Some(first) = auto_field {
                    return Err(ValidationError::MultipleAutoIncrement {
                        first: first.to_string(),
                        second: field.name.clone(),
                    });
                }
                auto_field = Some(field.name.as_str());
            }
        }

        if let Some(name) = auto_field {
            if self.primary_keys().count() > 1 {
                return Err(ValidationError::AutoIncrementCompositeKey(name.to_string()));
            }
        }
        Ok(())
    }
}

fn check_field_shape(field: &FieldDescriptor) -> Result<(), ValidationError> {
    validate_identifier(IdentifierKind::Field, &field.name)?;
    if !field.field_type.is_assigned() {
        return Err(ValidationError::MissingType(field.name.clone()));
    }
    if field.auto_increment {
        if field.field_type.base_type() != TypeKind::Integer.as_sql() {
            return Err(ValidationError::AutoIncrementRequiresInteger(
                field.name.clone(),
            ));
        }
        if !field.primary_key {
            return Err(ValidationError::AutoIncrementRequiresPrimaryKey(
                field.name.clone(),
            ));
        }
    }
    Ok(())
}

/// What an identifier names, for error reporting.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IdentifierKind {
    Table,
    Field,
}

impl Display for IdentifierKind {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Table => f.write_str("table"),
            Self::Field => f.write_str("field"),
        }
    }
}

/// Rejects blank identifiers and characters that cannot be safely quoted.
pub fn validate_identifier(kind: IdentifierKind, name: &str) -> Result<(), ValidationError> {
    if name.trim().is_empty() {
        return Err(match kind {
            IdentifierKind::Table => ValidationError::EmptyTableName,
            IdentifierKind::Field => ValidationError::EmptyFieldName,
        });
    }
    if name != name.trim() || name.contains('"') || name.chars().any(char::is_control) {
        return Err(ValidationError::InvalidIdentifier {
            kind,
            name: name.to_string(),
        });
    }
    Ok(())
}

/// Structural problems in caller-supplied input, caught before the engine.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    EmptyTableName,
    EmptyFieldName,
    InvalidIdentifier {
        kind: IdentifierKind,
        name: String,
    },
    DuplicateFieldName(String),
    MissingType(String),
    MultipleAutoIncrement {
        first: String,
        second: String,
    },
    AutoIncrementRequiresInteger(String),
    AutoIncrementRequiresPrimaryKey(String),
    AutoIncrementCompositeKey(String),
    FieldNotFound(String),
    NoFields(String),
    TempTableExists {
        table: String,
        temp_table: String,
    },
    UnknownColumn {
        table: String,
        column: String,
    },
    ValueCountMismatch {
        table: String,
        expected: usize,
        actual: usize,
    },
    EmptyQuery,
    IncompleteStatement,
    CsvHeaderMismatch {
        table: String,
        header: Vec<String>,
        columns: Vec<String>,
    },
}

impl Display for ValidationError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::EmptyTableName => write!(f, "table name cannot be empty"),
            Self::EmptyFieldName => write!(f, "field name cannot be empty"),
            Self::InvalidIdentifier { kind, name } => {
                write!(f, "invalid {kind} name `{name}`")
            }
            Self::DuplicateFieldName(name) => {
                write!(f, "field `{name}` already exists in this table")
            }
            Self::MissingType(name) => write!(f, "field `{name}` has no datatype assigned"),
            Self::MultipleAutoIncrement { first, second } => write!(
                f,
                "only one auto-increment field is allowed per table (`{first}`, `{second}`)"
            ),
            Self::AutoIncrementRequiresInteger(name) => {
                write!(f, "auto-increment field `{name}` requires INTEGER type")
            }
            Self::AutoIncrementRequiresPrimaryKey(name) => {
                write!(f, "auto-increment field `{name}` must be the primary key")
            }
            Self::AutoIncrementCompositeKey(name) => write!(
                f,
                "auto-increment field `{name}` must be the only primary-key column"
            ),
            Self::FieldNotFound(name) => write!(f, "field `{name}` not found"),
            Self::NoFields(table) => write!(f, "table `{table}` has no fields"),
            Self::TempTableExists { table, temp_table } => write!(
                f,
                "cannot rebuild `{table}`: table `{temp_table}` already exists"
            ),
            Self::UnknownColumn { table, column } => {
                write!(f, "table `{table}` has no column `{column}`")
            }
            Self::ValueCountMismatch {
                table,
                expected,
                actual,
            } => write!(
                f,
                "table `{table}` expects {expected} values per row, got {actual}"
            ),
            Self::EmptyQuery => write!(f, "query text is empty"),
            Self::IncompleteStatement => write!(f, "incomplete SQL statement"),
            Self::CsvHeaderMismatch {
                table,
                header,
                columns,
            } => write!(
                f,
                "CSV header [{}] does not match the leading columns of `{table}` [{}]",
                header.join(", "),
                columns.join(", ")
            ),
        }
    }
}

impl Error for ValidationError {}

#[cfg(test)]
mod tests {
    use super::{
        base_type_of, ColumnType, FieldDescriptor, FkAction, TableDescriptor, TypeKind,
        ValidationError,
    };

    #[test]
    fn parse_keeps_length_only_for_char_types() {
        assert_eq!(
            ColumnType::parse("varchar(50)"),
            ColumnType::Known {
                kind: TypeKind::Varchar,
                length: Some(50)
            }
        );
        assert_eq!(ColumnType::parse("INTEGER"), ColumnType::new(TypeKind::Integer));
        assert_eq!(
            ColumnType::parse("INTEGER(10)"),
            ColumnType::Other("INTEGER(10)".to_string())
        );
        assert_eq!(
            ColumnType::parse("DATETIME"),
            ColumnType::Other("DATETIME".to_string())
        );
    }

    #[test]
    fn sql_renders_length_suffix() {
        assert_eq!(ColumnType::with_length(TypeKind::Char, 8).sql(), "CHAR(8)");
        assert_eq!(ColumnType::with_length(TypeKind::Text, 8).sql(), "TEXT");
    }

    #[test]
    fn base_type_strips_parameters() {
        assert_eq!(base_type_of("VARCHAR(50)"), "VARCHAR");
        assert_eq!(base_type_of(" decimal (10,2)"), "DECIMAL");
        assert_eq!(ColumnType::with_length(TypeKind::Char, 3).base_type(), "CHAR");
    }

    #[test]
    fn restrict_is_stored_as_no_action() {
        assert_eq!(FkAction::Restrict.effective(), FkAction::NoAction);
        assert_eq!(FkAction::parse("set  null"), Some(FkAction::SetNull));
        assert_eq!(FkAction::parse("bogus"), None);
    }

    #[test]
    fn add_field_rejects_duplicates_and_second_auto_increment() {
        let mut table = TableDescriptor::new();
        table
            .add_field(FieldDescriptor::new("id", TypeKind::Integer).auto_increment())
            .unwrap();

        let duplicate = table
            .add_field(FieldDescriptor::new("id", TypeKind::Text))
            .unwrap_err();
        assert_eq!(duplicate, ValidationError::DuplicateFieldName("id".into()));

        let second = table
            .add_field(FieldDescriptor::new("other", TypeKind::Integer).auto_increment())
            .unwrap_err();
        assert!(matches!(second, ValidationError::MultipleAutoIncrement { .. }));
    }

    #[test]
    fn auto_increment_requires_integer_type() {
        let mut table = TableDescriptor::new();
        let err = table
            .add_field(FieldDescriptor::new("id", TypeKind::Text).auto_increment())
            .unwrap_err();
        assert_eq!(err, ValidationError::AutoIncrementRequiresInteger("id".into()));
    }

    #[test]
    fn modify_field_keeps_position_and_allows_same_name() {
        let mut table = TableDescriptor::from_fields(vec![
            FieldDescriptor::new("a", TypeKind::Integer),
            FieldDescriptor::new("b", TypeKind::Text),
        ]);
        table
            .modify_field("a", FieldDescriptor::new("a", TypeKind::Real).not_null())
            .unwrap();
        table
            .modify_field("b", FieldDescriptor::new("renamed", TypeKind::Text))
            .unwrap();

        assert_eq!(table.names(), vec!["a", "renamed"]);
        assert!(table.fields()[0].not_null);

        let clash = table
            .modify_field("renamed", FieldDescriptor::new("a", TypeKind::Text))
            .unwrap_err();
        assert_eq!(clash, ValidationError::DuplicateFieldName("a".into()));
    }

    #[test]
    fn validate_reports_missing_type_by_field_name() {
        let table = TableDescriptor::from_fields(vec![FieldDescriptor::new(
            "loose",
            ColumnType::unassigned(),
        )]);
        assert_eq!(
            table.validate().unwrap_err(),
            ValidationError::MissingType("loose".into())
        );
    }

    #[test]
    fn validate_rejects_auto_increment_in_composite_key() {
        let table = TableDescriptor::from_fields(vec![
            FieldDescriptor::new("id", TypeKind::Integer).auto_increment(),
            FieldDescriptor::new("part", TypeKind::Integer).primary_key(),
        ]);
        assert_eq!(
            table.validate().unwrap_err(),
            ValidationError::AutoIncrementCompositeKey("id".into())
        );
    }
}
