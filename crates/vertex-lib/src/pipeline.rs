//! Single-shot probe run
//!
//! Loads the credential, binds the service context, resolves the endpoint,
//! builds the request and invokes the prediction, strictly in that order.
//! The first failure ends the run; nothing is retried.

use crate::auth::{Credential, CLOUD_PLATFORM_SCOPE};
use crate::client::{PredictionPlatform, ServiceContext};
use crate::error::{Diagnostic, Error};
use crate::interpret::{interpret, Interpretation};
use crate::models::{EndpointHandle, PredictionRequest, PredictionResponse};
use crate::sensor::{load_input, synthetic_request};
use serde::Serialize;
use std::fmt;
use std::path::PathBuf;
use std::time::Instant;
use tracing::{info, warn};

/// Progress of a run; only moves forward
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RunStage {
    Unauthenticated,
    ContextReady,
    EndpointResolved,
    RequestBuilt,
    ResponseReceived,
    Failed,
}

impl RunStage {
    pub fn is_terminal(self) -> bool {
        matches!(self, RunStage::ResponseReceived | RunStage::Failed)
    }
}

/// Unit of work performed by the pipeline
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Step {
    LoadCredential,
    InitializeContext,
    ResolveEndpoint,
    BuildRequest,
    Predict,
}

impl Step {
    /// 1-based position in the run
    pub fn number(self) -> usize {
        match self {
            Step::LoadCredential => 1,
            Step::InitializeContext => 2,
            Step::ResolveEndpoint => 3,
            Step::BuildRequest => 4,
            Step::Predict => 5,
        }
    }

    pub fn description(self) -> &'static str {
        match self {
            Step::LoadCredential => "Loading service account credentials",
            Step::InitializeContext => "Initializing service context",
            Step::ResolveEndpoint => "Resolving endpoint",
            Step::BuildRequest => "Preparing sample data",
            Step::Predict => "Making prediction",
        }
    }
}

impl fmt::Display for Step {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.description())
    }
}

/// Where the submitted window comes from
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InputSource {
    /// Uniform random window; reproducible when seeded
    Synthetic { seed: Option<u64> },
    /// JSON or CSV file holding one window
    File(PathBuf),
}

impl Default for InputSource {
    fn default() -> Self {
        InputSource::Synthetic { seed: None }
    }
}

/// Everything a run needs
#[derive(Debug, Clone)]
pub struct ProbeConfig {
    pub project_id: String,
    pub location: String,
    pub endpoint_id: String,
    pub credentials_path: PathBuf,
    pub scopes: Vec<String>,
    pub api_endpoint: Option<String>,
    pub input: InputSource,
}

impl ProbeConfig {
    pub fn new(
        project_id: impl Into<String>,
        location: impl Into<String>,
        endpoint_id: impl Into<String>,
        credentials_path: impl Into<PathBuf>,
    ) -> Self {
        Self {
            project_id: project_id.into(),
            location: location.into(),
            endpoint_id: endpoint_id.into(),
            credentials_path: credentials_path.into(),
            scopes: vec![CLOUD_PLATFORM_SCOPE.to_string()],
            api_endpoint: None,
            input: InputSource::default(),
        }
    }
}

/// Receives progress callbacks as a run advances
///
/// All methods default to doing nothing.
#[allow(unused_variables)]
pub trait RunObserver {
    fn step_started(&mut self, step: Step) {}
    fn credential_loaded(&mut self, credential: &Credential) {}
    fn context_ready(&mut self, context: &ServiceContext) {}
    fn endpoint_resolved(&mut self, endpoint: &EndpointHandle) {}
    fn request_built(&mut self, request: &PredictionRequest) {}
    fn response_received(&mut self, response: &PredictionResponse, interpretation: &Interpretation) {}
    fn failed(&mut self, step: Step, error: &Error) {}
}

/// Observer that ignores every event
pub struct SilentObserver;

impl RunObserver for SilentObserver {}

/// Outcome of a run
#[derive(Debug, Clone, Serialize)]
pub struct RunReport {
    pub stage: RunStage,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub failed_step: Option<Step>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<Diagnostic>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub account: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub endpoint: Option<EndpointHandle>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub batch_size: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub response: Option<PredictionResponse>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub interpretation: Option<Interpretation>,
    pub duration_ms: u64,
}

impl RunReport {
    fn new() -> Self {
        Self {
            stage: RunStage::Unauthenticated,
            failed_step: None,
            error: None,
            account: None,
            endpoint: None,
            batch_size: None,
            response: None,
            interpretation: None,
            duration_ms: 0,
        }
    }

    fn advance(&mut self, next: RunStage) {
        debug_assert!(
            !self.stage.is_terminal() && next > self.stage,
            "invalid transition {:?} -> {:?}",
            self.stage,
            next
        );
        self.stage = next;
    }

    pub fn succeeded(&self) -> bool {
        self.stage == RunStage::ResponseReceived
    }
}

type StepResult<T> = std::result::Result<T, (Step, Error)>;

fn at(step: Step) -> impl FnOnce(Error) -> (Step, Error) {
    move |err| (step, err)
}

/// Drives one probe run against a platform
pub struct Pipeline<P> {
    platform: P,
}

impl<P: PredictionPlatform> Pipeline<P> {
    pub fn new(platform: P) -> Self {
        Self { platform }
    }

    pub fn platform(&self) -> &P {
        &self.platform
    }

    /// Execute every step once, stopping at the first failure
    pub async fn run(&self, config: &ProbeConfig, observer: &mut dyn RunObserver) -> RunReport {
        let started = Instant::now();
        let mut report = RunReport::new();

        if let Err((step, err)) = self.execute(config, observer, &mut report).await {
            warn!(
                step = step.number(),
                category = %err.category(),
                error = %err,
                "Probe run failed"
            );
            report.advance(RunStage::Failed);
            report.failed_step = Some(step);
            report.error = Some(Diagnostic::from(&err));
            observer.failed(step, &err);
        }

        report.duration_ms = started.elapsed().as_millis() as u64;
        report
    }

    async fn execute(
        &self,
        config: &ProbeConfig,
        observer: &mut dyn RunObserver,
        report: &mut RunReport,
    ) -> StepResult<()> {
        observer.step_started(Step::LoadCredential);
        let credential = Credential::from_file(&config.credentials_path, &config.scopes)
            .map_err(at(Step::LoadCredential))?;
        report.account = Some(credential.account().to_string());
        observer.credential_loaded(&credential);

        observer.step_started(Step::InitializeContext);
        let context = ServiceContext::new(
            &config.project_id,
            &config.location,
            credential,
            config.api_endpoint.as_deref(),
        )
        .map_err(at(Step::InitializeContext))?;
        report.advance(RunStage::ContextReady);
        observer.context_ready(&context);

        observer.step_started(Step::ResolveEndpoint);
        let endpoint = self
            .platform
            .resolve_endpoint(&context, &config.endpoint_id)
            .await
            .map_err(at(Step::ResolveEndpoint))?;
        report.advance(RunStage::EndpointResolved);
        report.endpoint = Some(endpoint.clone());
        observer.endpoint_resolved(&endpoint);

        observer.step_started(Step::BuildRequest);
        let request = match &config.input {
            InputSource::Synthetic { seed } => synthetic_request(*seed),
            InputSource::File(path) => {
                PredictionRequest::single(load_input(path).map_err(at(Step::BuildRequest))?)
            }
        };
        report.advance(RunStage::RequestBuilt);
        report.batch_size = Some(request.batch_size());
        observer.request_built(&request);

        observer.step_started(Step::Predict);
        let response = self
            .platform
            .predict(&context, &endpoint, &request)
            .await
            .map_err(at(Step::Predict))?;
        let interpretation = interpret(&response);
        report.advance(RunStage::ResponseReceived);
        info!(
            predictions = interpretation.prediction_count,
            "Probe run completed"
        );
        observer.response_received(&response, &interpretation);

        report.response = Some(response);
        report.interpretation = Some(interpretation);
        Ok(())
    }
}
