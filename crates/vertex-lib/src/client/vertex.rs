//! Vertex AI REST client
//!
//! Resolves endpoints and invokes `:predict` over HTTPS with bearer tokens
//! minted from the context's service account.

use super::{PredictionPlatform, ServiceContext};
use crate::auth::TokenCache;
use crate::error::{Error, Result};
use crate::models::{DeployedModel, EndpointHandle, PredictionRequest, PredictionResponse};
use async_trait::async_trait;
use reqwest::header::CONTENT_TYPE;
use reqwest::{Client, StatusCode};
use serde::Deserialize;
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

/// Configuration for the HTTP client
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Connection timeout
    pub connect_timeout: Duration,
    /// Timeout for each request, including long-running predictions
    pub request_timeout: Duration,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            connect_timeout: Duration::from_secs(10),
            request_timeout: Duration::from_secs(60),
        }
    }
}

/// Endpoint resource as returned by `GET .../endpoints/{id}`
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct EndpointResource {
    name: String,
    #[serde(default)]
    display_name: String,
    #[serde(default)]
    deployed_models: Vec<DeployedModel>,
}

/// Standard Google API error envelope
#[derive(Debug, Deserialize)]
struct ErrorEnvelope {
    error: ErrorBody,
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    #[serde(default)]
    message: String,
    #[serde(default)]
    status: Option<String>,
}

/// Remote error category and message extracted from a failed response
fn remote_error(status: StatusCode, body: &str) -> (String, String) {
    match serde_json::from_str::<ErrorEnvelope>(body) {
        Ok(envelope) => {
            let category = envelope
                .error
                .status
                .filter(|s| !s.is_empty())
                .unwrap_or_else(|| format!("HTTP {}", status.as_u16()));
            (category, envelope.error.message)
        }
        Err(_) => {
            let message = if body.trim().is_empty() {
                status.canonical_reason().unwrap_or("no response body").to_string()
            } else {
                body.trim().to_string()
            };
            (format!("HTTP {}", status.as_u16()), message)
        }
    }
}

/// Resource path to look up for a user-supplied endpoint identifier
///
/// Accepts a bare endpoint id or a full `projects/*/locations/*/endpoints/*`
/// resource name.
fn endpoint_lookup_path(context: &ServiceContext, endpoint_id: &str) -> Result<String> {
    if endpoint_id.starts_with("projects/") {
        let segments: Vec<&str> = endpoint_id.split('/').collect();
        let well_formed = segments.len() == 6
            && segments[2] == "locations"
            && segments[4] == "endpoints"
            && segments.iter().all(|s| !s.is_empty());
        if !well_formed {
            return Err(Error::endpoint_not_found(
                endpoint_id,
                "malformed endpoint resource name",
            ));
        }
        if segments[3] != context.location() {
            warn!(
                endpoint_location = segments[3],
                location = context.location(),
                "Endpoint resource is in a different region than the service context"
            );
        }
        return Ok(endpoint_id.to_string());
    }

    let valid_id = !endpoint_id.is_empty()
        && endpoint_id.len() <= 63
        && endpoint_id
            .bytes()
            .all(|b| b.is_ascii_lowercase() || b.is_ascii_digit() || b == b'-');
    if !valid_id {
        return Err(Error::endpoint_not_found(
            endpoint_id,
            "malformed endpoint identifier",
        ));
    }

    Ok(context.endpoint_resource(endpoint_id))
}

/// HTTP implementation of [`PredictionPlatform`] for Vertex AI
pub struct VertexClient {
    http: Client,
    tokens: TokenCache,
}

impl VertexClient {
    /// Create a new client
    pub fn new(config: ClientConfig) -> Result<Self> {
        let http = Client::builder()
            .connect_timeout(config.connect_timeout)
            .timeout(config.request_timeout)
            .build()
            .map_err(|e| Error::Initialization(format!("failed to create HTTP client: {}", e)))?;

        Ok(Self {
            http,
            tokens: TokenCache::new(),
        })
    }

    async fn bearer(&self, context: &ServiceContext) -> Result<String> {
        self.tokens.bearer(&self.http, context.credential()).await
    }
}

#[async_trait]
impl PredictionPlatform for VertexClient {
    async fn resolve_endpoint(
        &self,
        context: &ServiceContext,
        endpoint_id: &str,
    ) -> Result<EndpointHandle> {
        let endpoint_id = endpoint_id.trim();
        let path = endpoint_lookup_path(context, endpoint_id)?;
        let url = context.api_url(&path)?;
        let token = self.bearer(context).await?;

        debug!(%url, "Resolving endpoint");
        let response = self
            .http
            .get(url)
            .bearer_auth(token)
            .send()
            .await
            .map_err(|e| Error::Unexpected(format!("endpoint lookup failed: {}", e)))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| Error::Unexpected(format!("failed to read endpoint response: {}", e)))?;

        if !status.is_success() {
            let (category, message) = remote_error(status, &body);
            return Err(match status {
                StatusCode::NOT_FOUND | StatusCode::BAD_REQUEST => {
                    Error::endpoint_not_found(endpoint_id, format!("{}: {}", category, message))
                }
                StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => Error::endpoint_not_found(
                    endpoint_id,
                    format!("permission denied ({}): {}", category, message),
                ),
                _ => Error::Unexpected(format!(
                    "endpoint lookup returned {}: {}",
                    category, message
                )),
            });
        }

        let resource: EndpointResource = serde_json::from_str(&body)
            .map_err(|e| Error::Unexpected(format!("malformed endpoint resource: {}", e)))?;

        let id = resource
            .name
            .rsplit('/')
            .next()
            .unwrap_or(endpoint_id)
            .to_string();

        info!(
            endpoint = %resource.name,
            display_name = %resource.display_name,
            deployed_models = resource.deployed_models.len(),
            "Endpoint resolved"
        );

        Ok(EndpointHandle {
            id,
            display_name: resource.display_name,
            resource_name: resource.name,
            deployed_models: resource.deployed_models,
        })
    }

    async fn predict(
        &self,
        context: &ServiceContext,
        endpoint: &EndpointHandle,
        request: &PredictionRequest,
    ) -> Result<PredictionResponse> {
        let url = context.api_url(&format!("{}:predict", endpoint.resource_name))?;
        let payload = serde_json::to_vec(request)
            .map_err(|e| Error::prediction("SERIALIZATION", e.to_string()))?;
        let token = self.bearer(context).await?;

        debug!(%url, batch_size = request.batch_size(), bytes = payload.len(), "Sending prediction request");
        let started = Instant::now();

        let response = self
            .http
            .post(url)
            .bearer_auth(token)
            .header(CONTENT_TYPE, "application/json")
            .body(payload)
            .send()
            .await
            .map_err(|e| {
                let category = if e.is_timeout() {
                    "DEADLINE_EXCEEDED"
                } else {
                    "UNAVAILABLE"
                };
                Error::prediction(category, e.to_string())
            })?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| Error::prediction("UNAVAILABLE", e.to_string()))?;

        let latency_ms = started.elapsed().as_millis() as u64;
        if !status.is_success() {
            let (category, message) = remote_error(status, &body);
            warn!(%status, %category, latency_ms, "Prediction failed");
            return Err(Error::prediction(category, message));
        }

        info!(latency_ms, "Prediction received");
        serde_json::from_str(&body).map_err(|e| {
            Error::prediction("SERIALIZATION", format!("malformed prediction response: {}", e))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_remote_error_with_google_envelope() {
        let (category, message) = remote_error(
            StatusCode::BAD_REQUEST,
            r#"{"error": {"code": 400, "message": "Expected shape [1, 50, 15]", "status": "INVALID_ARGUMENT"}}"#,
        );
        assert_eq!(category, "INVALID_ARGUMENT");
        assert_eq!(message, "Expected shape [1, 50, 15]");
    }

    #[test]
    fn test_remote_error_plain_body() {
        let (category, message) = remote_error(StatusCode::BAD_GATEWAY, "upstream down\n");
        assert_eq!(category, "HTTP 502");
        assert_eq!(message, "upstream down");

        let (_, message) = remote_error(StatusCode::SERVICE_UNAVAILABLE, "");
        assert_eq!(message, "Service Unavailable");
    }
}
