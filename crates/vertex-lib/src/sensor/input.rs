//! Loading sensor windows from user-supplied JSON or CSV

use super::SENSOR_FEATURES;
use crate::error::{Error, Result};
use crate::models::{InputTensor, NUM_FEATURES, NUM_TIMESTEPS};
use serde_json::Value;
use std::path::Path;
use tracing::debug;

/// Read and parse an input file
pub fn load_input(path: impl AsRef<Path>) -> Result<InputTensor> {
    let path = path.as_ref();
    let content = std::fs::read_to_string(path).map_err(|e| {
        Error::InvalidInput(format!("failed to read {}: {}", path.display(), e))
    })?;
    parse_input(&content)
}

/// Parse a single sensor window
///
/// JSON input may be the bare matrix `[[...], ...]`, the request form
/// `{"instances": [[[...], ...]]}` (first instance is used) or the matrix
/// wrapped once more `[[[...], ...]]`. Anything that is not a JSON array or
/// object is read as CSV.
pub fn parse_input(text: &str) -> Result<InputTensor> {
    match serde_json::from_str::<Value>(text) {
        Ok(value @ (Value::Array(_) | Value::Object(_))) => parse_json(&value),
        _ => parse_csv(text),
    }
}

fn parse_json(value: &Value) -> Result<InputTensor> {
    if let Some(rows) = as_matrix(value) {
        return InputTensor::from_rows(rows);
    }

    if let Some(first) = value
        .get("instances")
        .and_then(Value::as_array)
        .and_then(|instances| instances.first())
    {
        if let Some(rows) = as_matrix(first) {
            return InputTensor::from_rows(rows);
        }
    }

    if let Some([only]) = value.as_array().map(Vec::as_slice) {
        if let Some(rows) = as_matrix(only) {
            return InputTensor::from_rows(rows);
        }
    }

    Err(Error::InvalidInput(format!(
        "JSON does not match a supported layout; expected [[sample], ...] or \
         {{\"instances\": [[[sample], ...]]}} with {} samples of {} features",
        NUM_TIMESTEPS, NUM_FEATURES
    )))
}

/// A JSON array of arrays of numbers
fn as_matrix(value: &Value) -> Option<Vec<Vec<f64>>> {
    value
        .as_array()?
        .iter()
        .map(|row| row.as_array()?.iter().map(Value::as_f64).collect::<Option<Vec<f64>>>())
        .collect()
}

fn parse_csv(text: &str) -> Result<InputTensor> {
    let mut lines = text
        .lines()
        .enumerate()
        .map(|(i, line)| (i + 1, line.trim()))
        .filter(|(_, line)| !line.is_empty() && !line.starts_with('#'))
        .peekable();

    let has_header = lines
        .peek()
        .and_then(|(_, line)| line.split(',').next())
        .map(|first| is_header_field(first.trim()))
        .unwrap_or(false);
    if has_header {
        lines.next();
        debug!("Skipping CSV header row");
    }

    let rows = lines
        .map(|(line_no, line)| {
            line.split(',')
                .map(|field| {
                    let field = field.trim();
                    field.parse::<f64>().map_err(|_| {
                        Error::InvalidInput(format!(
                            "line {}: '{}' is not a number",
                            line_no, field
                        ))
                    })
                })
                .collect::<Result<Vec<f64>>>()
        })
        .collect::<Result<Vec<_>>>()?;

    debug!(samples = rows.len(), "Parsed CSV input");
    InputTensor::from_rows(rows)
}

/// Column names start with a letter; anything else is read as data
fn is_header_field(field: &str) -> bool {
    let field = field.trim_start_matches('"');
    field.starts_with(|c: char| c.is_ascii_alphabetic() || c == '_')
        && field.parse::<f64>().is_err()
}

/// CSV template listing the feature order, with zeroed samples
pub fn input_template() -> String {
    let mut out = String::new();
    out.push_str(&format!(
        "# Sensor window template: {} samples x {} features\n",
        NUM_TIMESTEPS, NUM_FEATURES
    ));
    out.push_str("# Replace the 0.0 values with sensor readings.\n#\n");
    for feature in &SENSOR_FEATURES {
        out.push_str(&format!(
            "# {:<12} {:>7} to {:<7} {}\n",
            feature.name, feature.min, feature.max, feature.unit
        ));
    }
    out.push('\n');

    let header: Vec<&str> = SENSOR_FEATURES.iter().map(|f| f.name).collect();
    out.push_str(&header.join(","));
    out.push('\n');

    let row = vec!["0.0"; NUM_FEATURES].join(",");
    for _ in 0..NUM_TIMESTEPS {
        out.push_str(&row);
        out.push('\n');
    }
    out
}
