//! Configuration status command

use anyhow::Result;
use colored::Colorize;
use serde::Serialize;
use tabled::Tabled;

use crate::config::{Settings, REQUIRED_SETTINGS};
use crate::output::{print_error, print_info, print_json, print_success, print_table, OutputFormat};

/// Row for the settings table
#[derive(Tabled)]
struct SettingRow {
    #[tabled(rename = "Setting")]
    key: String,
    #[tabled(rename = "Value")]
    value: String,
    #[tabled(rename = "Required")]
    required: String,
}

#[derive(Serialize)]
struct ConfigStatus<'a> {
    settings: &'a Settings,
    credentials_found: bool,
    user_config: Option<String>,
    required: [&'static str; 4],
}

const DISPLAYED_SETTINGS: [&str; 7] = [
    "project_id",
    "location",
    "endpoint_id",
    "credentials_path",
    "api_endpoint",
    "timeout_secs",
    "scopes",
];

/// Show the resolved configuration and whether the key file is present
pub fn show_config(settings: &Settings, format: OutputFormat) -> Result<()> {
    let credentials_found = settings.credentials_path.is_file();
    let user_config = Settings::user_config_path().map(|p| p.display().to_string());

    match format {
        OutputFormat::Json => print_json(&ConfigStatus {
            settings,
            credentials_found,
            user_config,
            required: REQUIRED_SETTINGS,
        })?,
        OutputFormat::Table => {
            println!("{}", "Talaria Configuration".bold());
            println!("{}", "=".repeat(60));

            let rows = DISPLAYED_SETTINGS
                .iter()
                .map(|key| SettingRow {
                    key: key.to_string(),
                    value: settings
                        .display_value(key)
                        .unwrap_or_else(|| "(default)".dimmed().to_string()),
                    required: match REQUIRED_SETTINGS.contains(key) {
                        true => "yes".to_string(),
                        false => "no".to_string(),
                    },
                })
                .collect();
            print_table::<SettingRow>(rows);
            println!();

            let path = settings.credentials_path.display();
            if credentials_found {
                print_success(&format!("Service account key found at {}", path));
            } else {
                print_error(&format!("Service account key not found at {}", path));
            }
            if let Some(user_config) = user_config {
                print_info(&format!("User config file: {}", user_config));
            }
            print_info("Environment overrides use the TALARIA_ prefix, e.g. TALARIA_ENDPOINT_ID");
        }
    }

    Ok(())
}
