//! Vertex AI prediction probe library
//!
//! This crate provides the building blocks for a single diagnostic run:
//! - Service account credentials and access tokens
//! - An explicit service context and the Vertex AI REST client
//! - Synthetic and file-based sensor windows
//! - Interpretation of prediction responses
//! - The linear probe pipeline tying them together

pub mod auth;
pub mod client;
pub mod error;
pub mod interpret;
pub mod models;
pub mod pipeline;
pub mod sensor;

pub use auth::{Credential, CLOUD_PLATFORM_SCOPE};
pub use client::{ClientConfig, PredictionPlatform, ServiceContext, VertexClient};
pub use error::{Diagnostic, Error, ErrorCategory, Result};
pub use interpret::{interpret, Interpretation, PredictionOutcome};
pub use models::*;
pub use pipeline::{
    InputSource, Pipeline, ProbeConfig, RunObserver, RunReport, RunStage, SilentObserver, Step,
};
