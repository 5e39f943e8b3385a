//! Core data models exchanged with the prediction endpoint

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};

/// Number of timesteps in one sensor window
pub const NUM_TIMESTEPS: usize = 50;

/// Number of sensor features per timestep
pub const NUM_FEATURES: usize = 15;

/// One sensor reading: every feature at a single timestep
pub type SensorRow = [f64; NUM_FEATURES];

/// A [timesteps][features] window submitted as one instance
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(transparent)]
pub struct InputTensor {
    rows: Vec<SensorRow>,
}

impl InputTensor {
    /// Build a tensor from fixed-width rows, checking the timestep count
    pub fn new(rows: Vec<SensorRow>) -> Result<Self> {
        if rows.len() != NUM_TIMESTEPS {
            return Err(Error::InvalidInput(format!(
                "expected {} timesteps, got {}",
                NUM_TIMESTEPS,
                rows.len()
            )));
        }
        Ok(Self { rows })
    }

    /// Rows produced in-crate with a known timestep count
    pub(crate) fn from_generated(rows: Vec<SensorRow>) -> Self {
        debug_assert_eq!(rows.len(), NUM_TIMESTEPS);
        Self { rows }
    }

    /// Build a tensor from untrusted variable-width rows
    pub fn from_rows(rows: Vec<Vec<f64>>) -> Result<Self> {
        let fixed = rows
            .into_iter()
            .enumerate()
            .map(|(i, row)| {
                if let Some(value) = row.iter().find(|v| !v.is_finite()) {
                    return Err(Error::InvalidInput(format!(
                        "sample {} contains a non-finite value ({})",
                        i, value
                    )));
                }
                let len = row.len();
                SensorRow::try_from(row).map_err(|_| {
                    Error::InvalidInput(format!(
                        "sample {} must have exactly {} features, got {}",
                        i, NUM_FEATURES, len
                    ))
                })
            })
            .collect::<Result<Vec<_>>>()?;
        Self::new(fixed)
    }

    pub fn rows(&self) -> &[SensorRow] {
        &self.rows
    }

    pub fn timesteps(&self) -> usize {
        self.rows.len()
    }
}

/// Body of a `:predict` call
#[derive(Debug, Clone, Serialize)]
pub struct PredictionRequest {
    instances: Vec<InputTensor>,
}

impl PredictionRequest {
    pub fn new(instances: Vec<InputTensor>) -> Result<Self> {
        if instances.is_empty() {
            return Err(Error::InvalidInput(
                "a prediction request needs at least one instance".to_string(),
            ));
        }
        Ok(Self { instances })
    }

    /// Wrap a single window into a batch of one
    pub fn single(instance: InputTensor) -> Self {
        Self {
            instances: vec![instance],
        }
    }

    pub fn instances(&self) -> &[InputTensor] {
        &self.instances
    }

    pub fn batch_size(&self) -> usize {
        self.instances.len()
    }
}

/// One per-instance prediction, shape decided at deserialization
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum PredictionValue {
    Scalar(f64),
    Vector(Vec<f64>),
    Other(serde_json::Value),
}

/// Response of a `:predict` call
///
/// snake_case field names are accepted as aliases, but a body carrying both
/// spellings of the same field is rejected as a duplicate field.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PredictionResponse {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub predictions: Option<Vec<PredictionValue>>,
    #[serde(default, alias = "deployed_model_id", skip_serializing_if = "Option::is_none")]
    pub deployed_model_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,
    #[serde(default, alias = "model_display_name", skip_serializing_if = "Option::is_none")]
    pub model_display_name: Option<String>,
    #[serde(default, alias = "model_version_id", skip_serializing_if = "Option::is_none")]
    pub model_version_id: Option<String>,
}

/// A model deployed behind an endpoint
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeployedModel {
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub display_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,
}

/// Resolved reference to a remote endpoint
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EndpointHandle {
    pub id: String,
    pub display_name: String,
    /// `projects/{project}/locations/{location}/endpoints/{id}`
    pub resource_name: String,
    pub deployed_models: Vec<DeployedModel>,
}
