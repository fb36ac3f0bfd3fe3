//! Schema definitions and SQL text generation.
//!
//! Everything here is pure: the same inputs always produce the same text.
//! Table and column names are interpolated verbatim, so they must come from
//! code, never from untrusted input. Untrusted data only travels as bound
//! parameters.

use std::fmt;

use crate::error::{DatabaseError, Result};
use crate::placeholders::build_placeholders;
use crate::sqlite::{Command, Transaction};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DataType {
    Integer,
    Text,
    Real,
    Blob,
}

impl fmt::Display for DataType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            DataType::Integer => "INTEGER",
            DataType::Text => "TEXT",
            DataType::Real => "DOUBLE",
            DataType::Blob => "BLOB",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColumnConstraint {
    PrimaryKey,
    NotNull,
    Unique,
}

#[derive(Debug, Clone, PartialEq)]
pub enum DefaultValue {
    Integer(i64),
    Text(String),
    Real(f64),
    Null,
    CurrentTimestamp,
}

impl fmt::Display for DefaultValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DefaultValue::Integer(value) => write!(f, "{value}"),
            DefaultValue::Text(value) => write!(f, "'{}'", value.replace('\'', "''")),
            DefaultValue::Real(value) => write!(f, "{value}"),
            DefaultValue::Null => f.write_str("NULL"),
            DefaultValue::CurrentTimestamp => f.write_str("CURRENT_TIMESTAMP"),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ColumnDefinition {
    pub name: String,
    pub data_type: DataType,
    pub constraints: Vec<ColumnConstraint>,
    pub default_value: Option<DefaultValue>,
}

impl ColumnDefinition {
    pub fn new(name: &str, data_type: DataType) -> Self {
        Self {
            name: name.to_string(),
            data_type,
            constraints: Vec::new(),
            default_value: None,
        }
    }

    pub fn not_null(mut self) -> Self {
        self.constraints.push(ColumnConstraint::NotNull);
        self
    }

    pub fn with_constraint(mut self, constraint: ColumnConstraint) -> Self {
        self.constraints.push(constraint);
        self
    }

    pub fn with_default(mut self, value: DefaultValue) -> Self {
        self.default_value = Some(value);
        self
    }
}

impl fmt::Display for ColumnDefinition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.name, self.data_type)?;
        for constraint in &self.constraints {
            match constraint {
                ColumnConstraint::PrimaryKey => f.write_str(" PRIMARY KEY")?,
                ColumnConstraint::NotNull => f.write_str(" NOT NULL")?,
                ColumnConstraint::Unique => f.write_str(" UNIQUE")?,
            }
        }
        if let Some(default_value) = &self.default_value {
            write!(f, " DEFAULT {default_value}")?;
        }
        Ok(())
    }
}

/// Conflict resolution policy attached to a uniqueness constraint
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConflictClause {
    Rollback,
    Abort,
    Fail,
    Ignore,
    Replace,
}

impl fmt::Display for ConflictClause {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ConflictClause::Rollback => "ROLLBACK",
            ConflictClause::Abort => "ABORT",
            ConflictClause::Fail => "FAIL",
            ConflictClause::Ignore => "IGNORE",
            ConflictClause::Replace => "REPLACE",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct UniqueConstraint {
    pub columns: Vec<String>,
    pub on_conflict: Option<ConflictClause>,
}

impl fmt::Display for UniqueConstraint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "UNIQUE({})", self.columns.join(", "))?;
        if let Some(on_conflict) = self.on_conflict {
            write!(f, " ON CONFLICT {on_conflict}")?;
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ForeignKeyAction {
    NoAction,
    Cascade,
    SetNull,
    SetDefault,
    Restrict,
}

impl fmt::Display for ForeignKeyAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ForeignKeyAction::NoAction => "NO ACTION",
            ForeignKeyAction::Cascade => "CASCADE",
            ForeignKeyAction::SetNull => "SET NULL",
            ForeignKeyAction::SetDefault => "SET DEFAULT",
            ForeignKeyAction::Restrict => "RESTRICT",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ForeignKey {
    /// Constraint name, rendered as `CONSTRAINT <name>` when present
    pub name: Option<String>,
    pub column: String,
    pub foreign_table: String,
    pub foreign_column: String,
    pub on_delete: ForeignKeyAction,
    pub on_update: ForeignKeyAction,
}

impl ForeignKey {
    pub fn new(column: &str, foreign_table: &str, foreign_column: &str) -> Self {
        Self {
            name: None,
            column: column.to_string(),
            foreign_table: foreign_table.to_string(),
            foreign_column: foreign_column.to_string(),
            on_delete: ForeignKeyAction::NoAction,
            on_update: ForeignKeyAction::NoAction,
        }
    }

    pub fn named(mut self, name: &str) -> Self {
        self.name = Some(name.to_string());
        self
    }

    pub fn on_delete(mut self, action: ForeignKeyAction) -> Self {
        self.on_delete = action;
        self
    }

    pub fn on_update(mut self, action: ForeignKeyAction) -> Self {
        self.on_update = action;
        self
    }
}

impl fmt::Display for ForeignKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(name) = &self.name {
            write!(f, "CONSTRAINT {name} ")?;
        }
        write!(
            f,
            "FOREIGN KEY ({}) REFERENCES {} ({})",
            self.column, self.foreign_table, self.foreign_column
        )?;
        // NO ACTION is SQLite's default and is left implicit
        if self.on_delete != ForeignKeyAction::NoAction {
            write!(f, " ON DELETE {}", self.on_delete)?;
        }
        if self.on_update != ForeignKeyAction::NoAction {
            write!(f, " ON UPDATE {}", self.on_update)?;
        }
        Ok(())
    }
}

/// Full column and constraint layout of one table version
#[derive(Debug, Clone, PartialEq)]
pub struct TableDefinition {
    pub name: String,
    pub columns: Vec<ColumnDefinition>,
    pub primary_key: Vec<String>,
    pub unique: Option<UniqueConstraint>,
    pub foreign_keys: Vec<ForeignKey>,
}

impl TableDefinition {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            columns: Vec::new(),
            primary_key: Vec::new(),
            unique: None,
            foreign_keys: Vec::new(),
        }
    }

    pub fn add_column(mut self, column: ColumnDefinition) -> Self {
        self.columns.push(column);
        self
    }

    pub fn with_primary_key(mut self, columns: &[&str]) -> Self {
        self.primary_key = columns.iter().map(|c| c.to_string()).collect();
        self
    }

    pub fn with_unique(mut self, columns: &[&str], on_conflict: Option<ConflictClause>) -> Self {
        self.unique = Some(UniqueConstraint {
            columns: columns.iter().map(|c| c.to_string()).collect(),
            on_conflict,
        });
        self
    }

    pub fn add_foreign_key(mut self, foreign_key: ForeignKey) -> Self {
        self.foreign_keys.push(foreign_key);
        self
    }

    fn definitions(&self) -> String {
        let mut defs: Vec<String> = self.columns.iter().map(|c| c.to_string()).collect();
        if !self.primary_key.is_empty() {
            defs.push(format!("PRIMARY KEY ({})", self.primary_key.join(", ")));
        }
        if let Some(unique) = &self.unique {
            defs.push(unique.to_string());
        }
        defs.extend(self.foreign_keys.iter().map(|fk| fk.to_string()));
        defs.join(", ")
    }
}

pub fn create_table_sql(table: &TableDefinition) -> String {
    format!("CREATE TABLE {} ({})", table.name, table.definitions())
}

pub fn create_table_if_not_exists_sql(table: &TableDefinition) -> String {
    format!(
        "CREATE TABLE IF NOT EXISTS {} ({})",
        table.name,
        table.definitions()
    )
}

pub fn index_name(table_name: &str, column: &str) -> String {
    format!("{table_name}_{column}_index")
}

pub fn create_index_sql(table_name: &str, column: &str) -> String {
    format!(
        "CREATE INDEX {} ON {table_name} ({column})",
        index_name(table_name, column)
    )
}

pub fn drop_table_sql(table_name: &str) -> String {
    format!("DROP TABLE IF EXISTS {table_name}")
}

pub fn delete_all_sql(table_name: &str) -> String {
    format!("DELETE FROM {table_name}")
}

pub fn rename_table_sql(from: &str, to: &str) -> String {
    format!("ALTER TABLE {from} RENAME TO {to}")
}

pub fn add_column_sql(table_name: &str, column: &ColumnDefinition) -> String {
    format!("ALTER TABLE {table_name} ADD COLUMN {column}")
}

/// Build an `INSERT OR REPLACE` statement for the rows already bound on
/// `command`.
///
/// The command must carry exactly `rows * columns.len()` parameters.
pub fn insert_or_replace_sql(
    command: &Command,
    table_name: &str,
    columns: &[&str],
    rows: usize,
) -> Result<String> {
    let expected = rows * columns.len();
    let bound = command.params.len();
    debug_assert_eq!(bound, expected, "bound parameters must match row shape");
    if bound != expected {
        return Err(DatabaseError::ShapeMismatch { bound, expected });
    }

    Ok(format!(
        "INSERT OR REPLACE INTO {table_name} ({}) VALUES {}",
        columns.join(", "),
        build_placeholders(columns.len(), rows)?
    ))
}

pub fn drop_table(transaction: &mut Transaction, table_name: &str) {
    transaction.push(Command::execute(drop_table_sql(table_name)));
}

pub fn delete_all(transaction: &mut Transaction, table_name: &str) {
    transaction.push(Command::execute(delete_all_sql(table_name)));
}

pub fn create_index(transaction: &mut Transaction, table_name: &str, column: &str) {
    transaction.push(Command::execute(create_index_sql(table_name, column)));
}

pub fn rename_table(transaction: &mut Transaction, from: &str, to: &str) {
    transaction.push(Command::execute(rename_table_sql(from, to)));
}
