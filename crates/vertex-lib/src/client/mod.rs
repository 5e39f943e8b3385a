//! Prediction platform access

mod context;
mod vertex;

pub use context::{default_api_endpoint, ServiceContext, GLOBAL_LOCATION};
pub use vertex::{ClientConfig, VertexClient};

use crate::error::Result;
use crate::models::{EndpointHandle, PredictionRequest, PredictionResponse};
use async_trait::async_trait;

/// Remote platform hosting deployed prediction endpoints
#[async_trait]
pub trait PredictionPlatform: Send + Sync {
    /// Resolve an endpoint identifier into a callable handle
    async fn resolve_endpoint(
        &self,
        context: &ServiceContext,
        endpoint_id: &str,
    ) -> Result<EndpointHandle>;

    /// Submit a batch of instances to a resolved endpoint
    async fn predict(
        &self,
        context: &ServiceContext,
        endpoint: &EndpointHandle,
        request: &PredictionRequest,
    ) -> Result<PredictionResponse>;
}
