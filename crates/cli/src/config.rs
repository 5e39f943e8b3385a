//! Configuration management for the CLI
//!
//! Settings are layered lowest to highest: built-in defaults, the user
//! config file, `./talaria.toml` (or the file given with `--config`),
//! then `TALARIA_*` environment variables. Command-line flags are applied
//! on top by the individual commands.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::debug;
use vertex_lib::{ClientConfig, CLOUD_PLATFORM_SCOPE};

pub const DEFAULT_PROJECT_ID: &str = "project-talaria-474215";
pub const DEFAULT_LOCATION: &str = "asia-south1";
pub const DEFAULT_ENDPOINT_ID: &str = "9135793736679161856";
pub const DEFAULT_CREDENTIALS_PATH: &str = "service-account-key.json";
pub const DEFAULT_TIMEOUT_SECS: u64 = 60;

/// Settings every run needs
pub const REQUIRED_SETTINGS: [&str; 4] =
    ["project_id", "location", "endpoint_id", "credentials_path"];

const ENV_PREFIX: &str = "TALARIA";
const LOCAL_CONFIG_FILE: &str = "talaria.toml";

/// Resolved CLI settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Settings {
    pub project_id: String,
    pub location: String,
    pub endpoint_id: String,
    pub credentials_path: PathBuf,
    /// Overrides the regional API host, mainly for testing
    #[serde(default)]
    pub api_endpoint: Option<String>,
    pub timeout_secs: u64,
    pub scopes: Vec<String>,
}

impl Settings {
    /// Load settings from every layer
    ///
    /// An explicit file replaces `./talaria.toml` and must exist.
    pub fn load(explicit: Option<&Path>) -> Result<Self> {
        let mut builder = config::Config::builder()
            .set_default("project_id", DEFAULT_PROJECT_ID)?
            .set_default("location", DEFAULT_LOCATION)?
            .set_default("endpoint_id", DEFAULT_ENDPOINT_ID)?
            .set_default("credentials_path", DEFAULT_CREDENTIALS_PATH)?
            .set_default("timeout_secs", DEFAULT_TIMEOUT_SECS as i64)?
            .set_default("scopes", vec![CLOUD_PLATFORM_SCOPE])?;

        if let Some(path) = Self::user_config_path() {
            builder = builder.add_source(config::File::from(path).required(false));
        }

        builder = match explicit {
            Some(path) => builder.add_source(config::File::from(path).required(true)),
            None => builder.add_source(config::File::from(Path::new(LOCAL_CONFIG_FILE)).required(false)),
        };

        let config = builder
            .add_source(
                config::Environment::with_prefix(ENV_PREFIX)
                    .try_parsing(true)
                    .list_separator(",")
                    .with_list_parse_key("scopes"),
            )
            .build()
            .context("Failed to read configuration")?;

        let settings: Settings = config
            .try_deserialize()
            .context("Failed to parse configuration")?;
        debug!(
            project = %settings.project_id,
            location = %settings.location,
            endpoint = %settings.endpoint_id,
            "Loaded settings"
        );
        Ok(settings)
    }

    /// The per-user config file path, when a home directory is known
    pub fn user_config_path() -> Option<PathBuf> {
        dirs_next::home_dir().map(|home| home.join(".config").join("talaria").join("config.toml"))
    }

    pub fn client_config(&self) -> ClientConfig {
        ClientConfig {
            request_timeout: Duration::from_secs(self.timeout_secs),
            ..ClientConfig::default()
        }
    }

    /// Value of a named setting for display
    pub fn display_value(&self, key: &str) -> Option<String> {
        match key {
            "project_id" => Some(self.project_id.clone()),
            "location" => Some(self.location.clone()),
            "endpoint_id" => Some(self.endpoint_id.clone()),
            "credentials_path" => Some(self.credentials_path.display().to_string()),
            "api_endpoint" => self.api_endpoint.clone(),
            "timeout_secs" => Some(self.timeout_secs.to_string()),
            "scopes" => Some(self.scopes.join(",")),
            _ => None,
        }
    }
}
