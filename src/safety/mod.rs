//! Query safety classification module.
//!
//! Parses rendered SQL with the backend's dialect and decides whether it is a
//! single read-only statement. Only read-only statements are executed.

mod parser;

pub use parser::{classify_sql, SqlClassifier};

use std::fmt;

/// The type of SQL statement detected.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StatementType {
    Select,
    Insert,
    Update,
    Delete,
    Drop,
    Truncate,
    Alter,
    Create,
    Grant,
    Revoke,
    Explain,
    Show,
    Merge,
    /// SELECT ... INTO, which creates a table from the result.
    SelectInto,
    /// More than one statement in a single query text.
    Multiple(usize),
    /// Statement type could not be determined.
    Unknown,
}

impl fmt::Display for StatementType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Select => write!(f, "SELECT"),
            Self::Insert => write!(f, "INSERT"),
            Self::Update => write!(f, "UPDATE"),
            Self::Delete => write!(f, "DELETE"),
            Self::Drop => write!(f, "DROP"),
            Self::Truncate => write!(f, "TRUNCATE"),
            Self::Alter => write!(f, "ALTER"),
            Self::Create => write!(f, "CREATE"),
            Self::Grant => write!(f, "GRANT"),
            Self::Revoke => write!(f, "REVOKE"),
            Self::Explain => write!(f, "EXPLAIN"),
            Self::Show => write!(f, "SHOW"),
            Self::Merge => write!(f, "MERGE"),
            Self::SelectInto => write!(f, "SELECT INTO"),
            Self::Multiple(count) => write!(f, "{} statements", count),
            Self::Unknown => write!(f, "Unknown"),
        }
    }
}

/// Result of classifying a SQL query.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Classification {
    /// True if running the statement cannot change persisted state.
    pub read_only: bool,
    /// The outermost statement type, or the offending one when not read-only.
    pub statement_type: StatementType,
}

impl Classification {
    /// A read-only statement of the given type.
    pub fn read_only(statement_type: StatementType) -> Self {
        Self {
            read_only: true,
            statement_type,
        }
    }

    /// A statement that would change persisted state.
    pub fn mutating(statement_type: StatementType) -> Self {
        Self {
            read_only: false,
            statement_type,
        }
    }

    /// Combines two classifications; a mutating one always wins.
    pub(crate) fn or(self, other: Self) -> Self {
        if self.read_only && !other.read_only {
            other
        } else {
            self
        }
    }
}
