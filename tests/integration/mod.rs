//! Integration tests for castlist.

pub mod cli_test;
pub mod common;
pub mod exercises_test;
pub mod query_test;
