use rusqlite::types::{ToSql, ToSqlOutput};
use serde::{Deserialize, Serialize};

use crate::error::{DatabaseError, Result};

/// Core value types bound into SQLite commands
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Value {
    Null,
    Integer(i64),
    Real(f64),
    Text(String),
    Boolean(bool),
}

impl From<&str> for Value {
    fn from(value: &str) -> Self {
        Value::Text(value.to_string())
    }
}

impl From<String> for Value {
    fn from(value: String) -> Self {
        Value::Text(value)
    }
}

impl From<i32> for Value {
    fn from(value: i32) -> Self {
        Value::Integer(i64::from(value))
    }
}

impl From<i64> for Value {
    fn from(value: i64) -> Self {
        Value::Integer(value)
    }
}

impl From<f64> for Value {
    fn from(value: f64) -> Self {
        Value::Real(value)
    }
}

impl From<bool> for Value {
    fn from(value: bool) -> Self {
        Value::Boolean(value)
    }
}

impl ToSql for Value {
    fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
        match self {
            Value::Null => rusqlite::types::Null.to_sql(),
            Value::Integer(value) => value.to_sql(),
            Value::Real(value) => value.to_sql(),
            Value::Text(value) => value.to_sql(),
            Value::Boolean(value) => value.to_sql(),
        }
    }
}

/// Positional parameter bindings for a command, in placeholder order
#[derive(Debug, Default, Clone, PartialEq, Serialize, Deserialize)]
pub struct Params {
    pub values: Vec<Value>,
}

impl Params {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

/// How the execution client should run a command
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CommandType {
    /// Schema changes and table maintenance
    Execute,
    /// Data changes that return no rows
    Run,
}

/// One SQL statement with its bound parameters
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Command {
    pub command_type: CommandType,
    pub statement: String,
    pub params: Params,
}

impl Command {
    pub fn new(command_type: CommandType) -> Self {
        Self {
            command_type,
            statement: String::new(),
            params: Params::new(),
        }
    }

    pub fn execute(statement: impl Into<String>) -> Self {
        Self {
            statement: statement.into(),
            ..Self::new(CommandType::Execute)
        }
    }

    pub fn run(statement: impl Into<String>) -> Self {
        Self {
            statement: statement.into(),
            ..Self::new(CommandType::Run)
        }
    }
}

/// An ordered batch of commands applied all-or-nothing.
///
/// Tables only append to a transaction; dispatching it to an
/// [`ExecutionClient`](crate::client::ExecutionClient) consumes it.
#[derive(Debug, Default, Clone, PartialEq, Serialize, Deserialize)]
pub struct Transaction {
    pub commands: Vec<Command>,
    /// Schema version this transaction migrates to, if any
    pub version: Option<u32>,
}

impl Transaction {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, command: Command) {
        tracing::debug!(
            command_type = ?command.command_type,
            params = command.params.len(),
            statement = %command.statement,
            "appending command to transaction"
        );
        self.commands.push(command);
    }

    pub fn len(&self) -> usize {
        self.commands.len()
    }

    pub fn is_empty(&self) -> bool {
        self.commands.is_empty()
    }
}

/// Bind `value` at the zero-based position `index`.
///
/// Positions must be assigned contiguously in the order the placeholders
/// appear in the statement text.
pub fn bind(command: &mut Command, index: usize, value: impl Into<Value>) -> Result<()> {
    let expected = command.params.len();
    debug_assert_eq!(index, expected, "bindings must be contiguous");
    if index != expected {
        return Err(DatabaseError::BindingOutOfOrder {
            expected,
            actual: index,
        });
    }

    command.params.values.push(value.into());
    Ok(())
}

pub fn bind_string(command: &mut Command, index: usize, value: &str) -> Result<()> {
    bind(command, index, value)
}

pub fn bind_int(command: &mut Command, index: usize, value: i32) -> Result<()> {
    bind(command, index, value)
}

pub fn bind_int64(command: &mut Command, index: usize, value: i64) -> Result<()> {
    bind(command, index, value)
}

pub fn bind_double(command: &mut Command, index: usize, value: f64) -> Result<()> {
    bind(command, index, value)
}

pub fn bind_bool(command: &mut Command, index: usize, value: bool) -> Result<()> {
    bind(command, index, value)
}

pub fn bind_null(command: &mut Command, index: usize) -> Result<()> {
    bind(command, index, Value::Null)
}
