//! Error types for castlist.
//!
//! Defines the error enum returned by every fallible operation in the crate.

use thiserror::Error;

/// Main error type for castlist operations.
#[derive(Error, Debug)]
pub enum CastlistError {
    /// Database unreachable, authentication failed, pool exhausted, etc.
    #[error("Connection error: {0}")]
    Connection(String),

    /// Malformed query text (including empty templates and mixed placeholder styles).
    #[error("Syntax error: {0}")]
    Syntax(String),

    /// A bound parameter is incompatible with its placeholder.
    #[error("Type mismatch: {0}")]
    TypeMismatch(String),

    /// The number of bound parameters does not match the template.
    #[error("Parameter arity error: query expects {expected} parameter(s), {actual} supplied")]
    ParameterArity { expected: usize, actual: usize },

    /// Named parameters that do not fit the template (unknown or repeated names).
    #[error("Parameter binding error: {0}")]
    Binding(String),

    /// The statement would modify persisted state.
    #[error("Statement is not read-only: {0}")]
    NotReadOnly(String),

    /// The configured query timeout elapsed.
    #[error("Query timed out after {0} seconds")]
    Timeout(u64),

    /// Any other error reported by the database (unknown table, unknown column, ...).
    #[error("Query error: {0}")]
    Query(String),

    /// Configuration errors (invalid config file, bad connection string, etc.)
    #[error("Configuration error: {0}")]
    Config(String),

    /// Internal errors (broken invariants, bugs).
    #[error("Internal error: {0}")]
    Internal(String),
}

impl CastlistError {
    /// Creates a connection error with the given message.
    pub fn connection(msg: impl Into<String>) -> Self {
        Self::Connection(msg.into())
    }

    /// Creates a syntax error with the given message.
    pub fn syntax(msg: impl Into<String>) -> Self {
        Self::Syntax(msg.into())
    }

    /// Creates a type mismatch error with the given message.
    pub fn type_mismatch(msg: impl Into<String>) -> Self {
        Self::TypeMismatch(msg.into())
    }

    /// Creates a parameter arity error.
    pub fn arity(expected: usize, actual: usize) -> Self {
        Self::ParameterArity { expected, actual }
    }

    /// Creates a parameter binding error with the given message.
    pub fn binding(msg: impl Into<String>) -> Self {
        Self::Binding(msg.into())
    }

    /// Creates a not-read-only error with the given message.
    pub fn not_read_only(msg: impl Into<String>) -> Self {
        Self::NotReadOnly(msg.into())
    }

    /// Creates a query error with the given message.
    pub fn query(msg: impl Into<String>) -> Self {
        Self::Query(msg.into())
    }

    /// Creates a configuration error with the given message.
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// Creates an internal error with the given message.
    pub fn internal(msg: impl Into<String>) -> Self {
        Self::Internal(msg.into())
    }

    /// Returns the error category as a string for display purposes.
    pub fn category(&self) -> &'static str {
        match self {
            Self::Connection(_) => "Connection Error",
            Self::Syntax(_) => "Syntax Error",
            Self::TypeMismatch(_) => "Type Mismatch Error",
            Self::ParameterArity { .. } => "Parameter Arity Error",
            Self::Binding(_) => "Parameter Binding Error",
            Self::NotReadOnly(_) => "Read-Only Violation",
            Self::Timeout(_) => "Timeout Error",
            Self::Query(_) => "Query Error",
            Self::Config(_) => "Configuration Error",
            Self::Internal(_) => "Internal Error",
        }
    }

    /// Returns true if retrying the same request may succeed.
    pub fn is_transient(&self) -> bool {
        matches!(self, Self::Connection(_) | Self::Timeout(_))
    }
}

/// Result type alias using CastlistError.
pub type Result<T> = std::result::Result<T, CastlistError>;
