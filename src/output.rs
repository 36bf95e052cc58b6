//! Output formatting for the command-line interface.
//!
//! Renders result sets and the exercise catalog as aligned text or JSON.

use crate::db::{ResultSet, Value};
use crate::error::{CastlistError, Result};
use crate::exercises::Exercise;
use serde::Serialize;

/// Output format for query results.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OutputFormat {
    /// Aligned text table followed by a row count.
    #[default]
    Text,
    /// A single JSON document.
    Json,
}

impl std::str::FromStr for OutputFormat {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "text" => Ok(Self::Text),
            "json" => Ok(Self::Json),
            _ => Err(format!("Invalid output format: {s}. Expected: text or json")),
        }
    }
}

/// Catalog entry as it appears in JSON output.
#[derive(Debug, Serialize)]
struct JsonExercise<'a> {
    name: &'a str,
    description: &'a str,
    args: Vec<JsonArg<'a>>,
}

#[derive(Debug, Serialize)]
struct JsonArg<'a> {
    name: &'a str,
    default: &'a str,
}

/// Formats command output.
pub struct ResultFormatter {
    format: OutputFormat,
}

impl ResultFormatter {
    /// Creates a new output formatter.
    pub fn new(format: OutputFormat) -> Self {
        Self { format }
    }

    /// Formats a result set according to the configured format.
    pub fn format(&self, result: &ResultSet) -> Result<String> {
        match self.format {
            OutputFormat::Text => Ok(format_text(result)),
            OutputFormat::Json => to_json(result),
        }
    }

    /// Formats the exercise catalog according to the configured format.
    pub fn format_catalog(&self, exercises: &[Exercise]) -> Result<String> {
        match self.format {
            OutputFormat::Text => Ok(format_catalog_text(exercises)),
            OutputFormat::Json => {
                let entries: Vec<JsonExercise> = exercises
                    .iter()
                    .map(|exercise| JsonExercise {
                        name: exercise.name,
                        description: exercise.description,
                        args: exercise
                            .args
                            .iter()
                            .map(|arg| JsonArg {
                                name: arg.name,
                                default: arg.default,
                            })
                            .collect(),
                    })
                    .collect();
                to_json(&entries)
            }
        }
    }
}

fn to_json<T: Serialize>(value: &T) -> Result<String> {
    serde_json::to_string_pretty(value)
        .map(|mut json| {
            json.push('\n');
            json
        })
        .map_err(|e| CastlistError::internal(format!("Failed to serialize output: {e}")))
}

/// Renders a result set as an aligned table followed by `(N rows)`.
///
/// Numbers are right-aligned, everything else left-aligned.
pub fn format_text(result: &ResultSet) -> String {
    let headers: Vec<&str> = result.columns().iter().map(|c| c.name.as_str()).collect();
    let cells: Vec<Vec<String>> = result
        .rows()
        .iter()
        .map(|row| row.iter().map(Value::to_display_string).collect())
        .collect();

    let mut widths: Vec<usize> = headers.iter().map(|h| h.chars().count()).collect();
    for row in &cells {
        for (width, cell) in widths.iter_mut().zip(row) {
            *width = (*width).max(cell.chars().count());
        }
    }

    let numeric: Vec<bool> = (0..headers.len())
        .map(|i| {
            result
                .rows()
                .iter()
                .any(|row| matches!(row[i], Value::Int(_) | Value::Float(_)))
        })
        .collect();

    let mut out = String::new();
    if !headers.is_empty() {
        let header_line = headers
            .iter()
            .zip(&widths)
            .map(|(h, w)| pad(h, *w, false))
            .collect::<Vec<_>>()
            .join(" | ");
        out.push_str(header_line.trim_end());
        out.push('\n');

        let separator = widths
            .iter()
            .map(|w| "-".repeat(*w))
            .collect::<Vec<_>>()
            .join("-+-");
        out.push_str(&separator);
        out.push('\n');

        for row in &cells {
            let line = row
                .iter()
                .enumerate()
                .map(|(i, cell)| pad(cell, widths[i], numeric[i]))
                .collect::<Vec<_>>()
                .join(" | ");
            out.push_str(line.trim_end());
            out.push('\n');
        }
    }

    let count = result.row_count();
    out.push_str(&format!(
        "({} {})\n",
        count,
        if count == 1 { "row" } else { "rows" }
    ));
    out
}

fn pad(text: &str, width: usize, right_align: bool) -> String {
    if right_align {
        format!("{:>width$}", text, width = width)
    } else {
        format!("{:<width$}", text, width = width)
    }
}

fn format_catalog_text(exercises: &[Exercise]) -> String {
    let name_width = exercises.iter().map(|e| e.name.len()).max().unwrap_or(0);
    exercises
        .iter()
        .map(|exercise| {
            format!(
                "{:<width$}  {}\n{:<width$}  [{}]\n",
                exercise.name,
                exercise.description,
                "",
                exercise.usage(),
                width = name_width
            )
        })
        .collect()
}
