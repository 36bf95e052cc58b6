//! Value and result set types for castlist.
//!
//! Defines the structures used to represent bound parameters and query
//! results independently of the database backend.

use crate::error::{CastlistError, Result};
use serde::{Serialize, Serializer};
use std::fmt;
use std::time::Duration;

/// The complete, immutable output of one query execution.
///
/// Row count and column arity are fixed at construction. Equality compares
/// columns and rows only, so two executions of the same query against an
/// unchanged database compare equal regardless of timing.
#[derive(Debug, Clone, Default, Serialize)]
pub struct ResultSet {
    columns: Vec<ColumnInfo>,
    rows: Vec<Row>,
    row_count: usize,
    #[serde(rename = "execution_time_ms", serialize_with = "serialize_millis")]
    execution_time: Duration,
}

impl ResultSet {
    /// Creates a result set, checking that every row matches the column arity.
    ///
    /// Columns holding both integers and floats are widened to floats so each
    /// column carries a single numeric type across all rows.
    pub fn new(columns: Vec<ColumnInfo>, mut rows: Vec<Row>) -> Result<Self> {
        if let Some((index, row)) = rows
            .iter()
            .enumerate()
            .find(|(_, row)| row.len() != columns.len())
        {
            return Err(CastlistError::internal(format!(
                "row {index} has {} values but the result has {} columns",
                row.len(),
                columns.len()
            )));
        }

        widen_mixed_numeric_columns(columns.len(), &mut rows);

        let row_count = rows.len();
        Ok(Self {
            columns,
            rows,
            row_count,
            execution_time: Duration::ZERO,
        })
    }

    /// Creates an empty result set that still carries column metadata.
    pub fn empty(columns: Vec<ColumnInfo>) -> Self {
        Self {
            columns,
            ..Self::default()
        }
    }

    /// Sets the execution time.
    pub fn with_execution_time(mut self, duration: Duration) -> Self {
        self.execution_time = duration;
        self
    }

    /// Column metadata, in projection order.
    pub fn columns(&self) -> &[ColumnInfo] {
        &self.columns
    }

    /// Rows, in the order the database returned them.
    pub fn rows(&self) -> &[Row] {
        &self.rows
    }

    /// Number of rows.
    pub fn row_count(&self) -> usize {
        self.row_count
    }

    /// Number of columns.
    pub fn column_count(&self) -> usize {
        self.columns.len()
    }

    /// Time the database round trip took.
    pub fn execution_time(&self) -> Duration {
        self.execution_time
    }

    /// Returns true if the result set has no rows.
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Returns the position of the named column, if present.
    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c.name == name)
    }

    /// Returns all values of the named column.
    pub fn column_values(&self, name: &str) -> Option<Vec<&Value>> {
        let index = self.column_index(name)?;
        Some(self.rows.iter().map(|row| &row[index]).collect())
    }

    /// Consumes the result set, returning its rows.
    pub fn into_rows(self) -> Vec<Row> {
        self.rows
    }
}

impl PartialEq for ResultSet {
    fn eq(&self, other: &Self) -> bool {
        self.columns == other.columns && self.rows == other.rows
    }
}

fn widen_mixed_numeric_columns(column_count: usize, rows: &mut [Row]) {
    for index in 0..column_count {
        let has_int = rows.iter().any(|r| matches!(r[index], Value::Int(_)));
        let has_float = rows.iter().any(|r| matches!(r[index], Value::Float(_)));
        if has_int && has_float {
            for row in rows.iter_mut() {
                if let Value::Int(i) = row[index] {
                    row[index] = Value::Float(i as f64);
                }
            }
        }
    }
}

fn serialize_millis<S>(duration: &Duration, serializer: S) -> std::result::Result<S::Ok, S::Error>
where
    S: Serializer,
{
    (duration.as_secs_f64() * 1000.0).serialize(serializer)
}

/// Metadata about a column in a result set.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ColumnInfo {
    /// Column name.
    pub name: String,

    /// Column data type as reported by the backend.
    pub data_type: String,
}

impl ColumnInfo {
    /// Creates a new column info with the given name and type.
    pub fn new(name: impl Into<String>, data_type: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            data_type: data_type.into(),
        }
    }
}

/// A row of data from a query result.
pub type Row = Vec<Value>;

/// A typed scalar, used both for bound parameters and decoded results.
#[derive(Debug, Clone, Default, PartialEq)]
pub enum Value {
    /// NULL value.
    #[default]
    Null,

    /// Boolean value.
    Bool(bool),

    /// Signed integer (up to i64).
    Int(i64),

    /// Floating point number.
    Float(f64),

    /// Text value.
    String(String),
}

impl Value {
    /// Returns true if this value is NULL.
    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    /// Returns the name of the value's type, for error messages.
    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Null => "null",
            Value::Bool(_) => "boolean",
            Value::Int(_) => "integer",
            Value::Float(_) => "float",
            Value::String(_) => "string",
        }
    }

    /// Returns the integer value, if this is an integer.
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Value::Int(i) => Some(*i),
            _ => None,
        }
    }

    /// Returns the text value, if this is a string.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(s) => Some(s),
            _ => None,
        }
    }

    /// Converts the value to its display representation.
    pub fn to_display_string(&self) -> String {
        match self {
            Value::Null => "NULL".to_string(),
            Value::Bool(b) => b.to_string(),
            Value::Int(i) => i.to_string(),
            Value::Float(f) => f.to_string(),
            Value::String(s) => s.clone(),
        }
    }

    /// Parses a command-line literal into a value.
    ///
    /// `null`, `true` and `false` are recognised case-insensitively, then
    /// integers and floats; anything else is a string. Wrapping the literal
    /// in single quotes always yields a string.
    pub fn parse_literal(input: &str) -> Self {
        if input.len() >= 2 && input.starts_with('\'') && input.ends_with('\'') {
            return Value::String(input[1..input.len() - 1].to_string());
        }
        match input.to_lowercase().as_str() {
            "null" => return Value::Null,
            "true" => return Value::Bool(true),
            "false" => return Value::Bool(false),
            _ => {}
        }
        if let Ok(i) = input.parse::<i64>() {
            return Value::Int(i);
        }
        if let Ok(f) = input.parse::<f64>() {
            if f.is_finite() {
                return Value::Float(f);
            }
        }
        Value::String(input.to_string())
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_display_string())
    }
}

impl Serialize for Value {
    fn serialize<S>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        match self {
            Value::Null => serializer.serialize_none(),
            Value::Bool(b) => serializer.serialize_bool(*b),
            Value::Int(i) => serializer.serialize_i64(*i),
            Value::Float(f) => serializer.serialize_f64(*f),
            Value::String(s) => serializer.serialize_str(s),
        }
    }
}

// Conversion implementations for common types
impl From<bool> for Value {
    fn from(v: bool) -> Self {
        Value::Bool(v)
    }
}

impl From<i32> for Value {
    fn from(v: i32) -> Self {
        Value::Int(v as i64)
    }
}

impl From<i64> for Value {
    fn from(v: i64) -> Self {
        Value::Int(v)
    }
}

impl From<f64> for Value {
    fn from(v: f64) -> Self {
        Value::Float(v)
    }
}

impl From<String> for Value {
    fn from(v: String) -> Self {
        Value::String(v)
    }
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Value::String(v.to_string())
    }
}

impl<T> From<Option<T>> for Value
where
    T: Into<Value>,
{
    fn from(v: Option<T>) -> Self {
        match v {
            Some(val) => val.into(),
            None => Value::Null,
        }
    }
}
