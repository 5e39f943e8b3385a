//! Explicit project/region/credential binding for platform calls

use crate::auth::Credential;
use crate::error::{Error, Result};
use tracing::{debug, warn};
use url::Url;

/// Location whose API is served from the non-regional host
pub const GLOBAL_LOCATION: &str = "global";

/// Everything a platform call needs to address and authorize a request
#[derive(Debug, Clone)]
pub struct ServiceContext {
    project: String,
    location: String,
    credential: Credential,
    base_url: Url,
}

impl ServiceContext {
    /// Bind a project and region to a credential
    ///
    /// `api_endpoint` overrides the regional API host, e.g. for private
    /// service connect or tests; it must be an http(s) URL.
    pub fn new(
        project: &str,
        location: &str,
        credential: Credential,
        api_endpoint: Option<&str>,
    ) -> Result<Self> {
        validate_project(project)?;
        validate_location(location)?;

        let base_url = match api_endpoint {
            Some(endpoint) => parse_base_url(endpoint)?,
            None => parse_base_url(&default_api_endpoint(location))?,
        };

        if let Some(key_project) = credential.project_id() {
            if key_project != project {
                warn!(
                    key_project,
                    project, "Service account key was issued in a different project"
                );
            }
        }

        debug!(project, location, base_url = %base_url, "Service context ready");

        Ok(Self {
            project: project.to_string(),
            location: location.to_string(),
            credential,
            base_url,
        })
    }

    pub fn project(&self) -> &str {
        &self.project
    }

    pub fn location(&self) -> &str {
        &self.location
    }

    pub fn credential(&self) -> &Credential {
        &self.credential
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    /// Resource name of an endpoint in this project and region
    pub fn endpoint_resource(&self, endpoint_id: &str) -> String {
        format!(
            "projects/{}/locations/{}/endpoints/{}",
            self.project, self.location, endpoint_id
        )
    }

    /// Versioned REST URL for a resource path such as `projects/p/...:predict`
    pub fn api_url(&self, resource_path: &str) -> Result<Url> {
        let raw = format!(
            "{}/v1/{}",
            self.base_url.as_str().trim_end_matches('/'),
            resource_path.trim_start_matches('/')
        );
        Url::parse(&raw).map_err(|e| Error::Unexpected(format!("invalid API URL '{}': {}", raw, e)))
    }
}

/// Regional API host for a location
pub fn default_api_endpoint(location: &str) -> String {
    if location == GLOBAL_LOCATION {
        "https://aiplatform.googleapis.com".to_string()
    } else {
        format!("https://{}-aiplatform.googleapis.com", location)
    }
}

fn parse_base_url(endpoint: &str) -> Result<Url> {
    let url = Url::parse(endpoint)
        .map_err(|e| Error::Initialization(format!("invalid API endpoint '{}': {}", endpoint, e)))?;
    if !matches!(url.scheme(), "http" | "https") || url.host_str().is_none() {
        return Err(Error::Initialization(format!(
            "API endpoint '{}' must be an http(s) URL",
            endpoint
        )));
    }
    Ok(url)
}

/// Accepts a project number or a project id (6-30 chars, `[a-z][a-z0-9-]*[a-z0-9]`)
fn validate_project(project: &str) -> Result<()> {
    let is_number = !project.is_empty() && project.bytes().all(|b| b.is_ascii_digit());
    let is_id = (6..=30).contains(&project.len())
        && project.starts_with(|c: char| c.is_ascii_lowercase())
        && !project.ends_with('-')
        && project
            .bytes()
            .all(|b| b.is_ascii_lowercase() || b.is_ascii_digit() || b == b'-');

    if is_number || is_id {
        Ok(())
    } else {
        Err(Error::Initialization(format!(
            "invalid project identifier '{}'",
            project
        )))
    }
}

/// Accepts `global` or a region such as `asia-south1`
fn validate_location(location: &str) -> Result<()> {
    if location == GLOBAL_LOCATION {
        return Ok(());
    }

    let parts: Vec<&str> = location.split('-').collect();
    let well_formed = parts.len() >= 2
        && parts
            .iter()
            .all(|p| !p.is_empty() && p.bytes().all(|b| b.is_ascii_lowercase() || b.is_ascii_digit()))
        && parts[0].bytes().all(|b| b.is_ascii_lowercase())
        && parts
            .last()
            .map(|p| p.ends_with(|c: char| c.is_ascii_digit()))
            .unwrap_or(false);

    if well_formed {
        Ok(())
    } else {
        Err(Error::Initialization(format!(
            "invalid region identifier '{}'",
            location
        )))
    }
}
