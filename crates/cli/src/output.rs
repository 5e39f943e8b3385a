//! Output formatting utilities

use anyhow::Result;
use clap::ValueEnum;
use colored::Colorize;
use serde::Serialize;
use tabled::{settings::Style, Table, Tabled};

/// Output format for CLI commands
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    /// Human-readable narration (default)
    #[default]
    Table,
    /// JSON report
    Json,
}

/// Row for the class probability table
#[derive(Tabled)]
pub struct ProbabilityRow {
    #[tabled(rename = "Class")]
    pub class: usize,
    #[tabled(rename = "Probability")]
    pub probability: String,
}

/// Print a rounded table, or a note when there is nothing to show
pub fn print_table<T: Tabled>(rows: Vec<T>) {
    if rows.is_empty() {
        println!("{}", "No items found".yellow());
        return;
    }
    println!("{}", Table::new(rows).with(Style::rounded()));
}

/// Pretty-print any serializable value as JSON
pub fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

/// Print a section banner
pub fn print_banner(title: &str) {
    println!("{}", "=".repeat(70));
    println!("{}", title.bold());
    println!("{}", "=".repeat(70));
}

/// Print an indented detail line under a step
pub fn print_detail(label: &str, value: impl std::fmt::Display) {
    println!("   {}: {}", label, value);
}

/// Print a success message
pub fn print_success(message: &str) {
    println!("{} {}", "✓".green().bold(), message);
}

/// Print an error message
pub fn print_error(message: &str) {
    eprintln!("{} {}", "✗".red().bold(), message);
}

/// Print a warning message
pub fn print_warning(message: &str) {
    println!("{} {}", "⚠".yellow().bold(), message);
}

/// Print an info message
pub fn print_info(message: &str) {
    println!("{} {}", "ℹ".blue().bold(), message);
}

/// Format a probability as value and percentage, e.g. `0.7000 (70.00%)`
pub fn format_confidence(confidence: f64) -> String {
    format!("{:.4} ({:.2}%)", confidence, confidence * 100.0)
}

/// Color confidence based on value
pub fn color_confidence(confidence: f64) -> String {
    let formatted = format_confidence(confidence);
    if confidence >= 0.8 {
        formatted.green().to_string()
    } else if confidence >= 0.6 {
        formatted.yellow().to_string()
    } else {
        formatted.red().to_string()
    }
}

/// Format a duration in milliseconds as human-readable string
pub fn format_duration(millis: u64) -> String {
    if millis >= 1000 {
        format!("{:.2}s", millis as f64 / 1000.0)
    } else {
        format!("{}ms", millis)
    }
}
