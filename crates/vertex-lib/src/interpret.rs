//! Interpretation of prediction responses
//!
//! Turns the first per-instance prediction into a class decision when it is
//! a probability vector. Probabilities are taken as-is; nothing checks that
//! they are normalized.

use crate::models::{PredictionResponse, PredictionValue};
use serde::Serialize;

/// What the first prediction of a response says
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum PredictionOutcome {
    /// Per-class probabilities with the winning class
    Classification {
        probabilities: Vec<f64>,
        predicted_class: usize,
        confidence: f64,
    },
    /// A single number, reported verbatim
    Scalar { value: f64 },
    /// Any other shape, reported verbatim
    Unstructured { value: serde_json::Value },
}

/// Interpreted view of a prediction response
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Interpretation {
    /// Number of per-instance predictions in the response
    pub prediction_count: usize,
    /// Outcome for the first instance; `None` when there is nothing to interpret
    pub outcome: Option<PredictionOutcome>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub deployed_model_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub model_display_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub model_version_id: Option<String>,
}

impl Interpretation {
    /// Predicted class and confidence, when the first prediction was a probability vector
    pub fn classification(&self) -> Option<(usize, f64)> {
        match &self.outcome {
            Some(PredictionOutcome::Classification {
                predicted_class,
                confidence,
                ..
            }) => Some((*predicted_class, *confidence)),
            _ => None,
        }
    }
}

/// Index and value of the maximum; the first occurrence wins ties
pub fn argmax(values: &[f64]) -> Option<(usize, f64)> {
    let mut iter = values.iter().copied().enumerate();
    let first = iter.next()?;
    Some(iter.fold(first, |best, (i, v)| if v > best.1 { (i, v) } else { best }))
}

/// Interpret a prediction response
pub fn interpret(response: &PredictionResponse) -> Interpretation {
    let predictions = response.predictions.as_deref().unwrap_or_default();

    let outcome = predictions.first().and_then(|first| match first {
        PredictionValue::Vector(probabilities) => {
            argmax(probabilities).map(|(predicted_class, confidence)| {
                PredictionOutcome::Classification {
                    probabilities: probabilities.clone(),
                    predicted_class,
                    confidence,
                }
            })
        }
        PredictionValue::Scalar(value) => Some(PredictionOutcome::Scalar { value: *value }),
        PredictionValue::Other(value) => Some(PredictionOutcome::Unstructured {
            value: value.clone(),
        }),
    });

    Interpretation {
        prediction_count: predictions.len(),
        outcome,
        deployed_model_id: response.deployed_model_id.clone(),
        model_display_name: response.model_display_name.clone(),
        model: response.model.clone(),
        model_version_id: response.model_version_id.clone(),
    }
}
