//! Input template command

use anyhow::{Context, Result};
use std::path::Path;
use vertex_lib::sensor::input_template;

use crate::output::print_success;

/// Print the CSV input template, or write it to a file
pub fn write_template(output: Option<&Path>) -> Result<()> {
    let template = input_template();
    match output {
        Some(path) => {
            std::fs::write(path, template)
                .with_context(|| format!("Failed to write template to {}", path.display()))?;
            print_success(&format!("Template written to {}", path.display()));
        }
        None => print!("{}", template),
    }
    Ok(())
}
