//! castlist - parameterized, read-only queries over a movie database.
//!
//! This library exposes the core modules for the binary and the integration tests.

pub mod cli;
pub mod config;
pub mod db;
pub mod error;
pub mod exercises;
pub mod logging;
pub mod output;
pub mod query;
pub mod safety;
