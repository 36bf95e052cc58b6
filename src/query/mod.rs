//! Query execution for castlist.
//!
//! This module isolates parameter validation, safety checking and the
//! database round trip behind a single `execute` call.

pub mod executor;

pub use executor::QueryExecutor;
