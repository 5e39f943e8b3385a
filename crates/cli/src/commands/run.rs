//! The prediction probe command

use anyhow::Result;
use clap::Args;
use colored::Colorize;
use std::path::PathBuf;
use vertex_lib::{
    Credential, EndpointHandle, Error, InputSource, Interpretation, Pipeline, PredictionOutcome,
    PredictionRequest, PredictionResponse, ProbeConfig, RunObserver, RunReport, ServiceContext,
    SilentObserver, Step, VertexClient, NUM_FEATURES,
};

use crate::config::Settings;
use crate::output::{
    color_confidence, format_confidence, format_duration, print_banner, print_detail,
    print_error, print_info, print_json, print_success, print_table, print_warning,
    OutputFormat, ProbabilityRow,
};

/// Overrides for a single run
#[derive(Args, Debug, Default)]
pub struct RunArgs {
    /// Google Cloud project id or number
    #[arg(long)]
    pub project: Option<String>,

    /// Vertex AI region
    #[arg(long)]
    pub location: Option<String>,

    /// Endpoint id or full resource name
    #[arg(long)]
    pub endpoint: Option<String>,

    /// Path to the service account key file
    #[arg(long)]
    pub credentials: Option<PathBuf>,

    /// Override the API base URL
    #[arg(long)]
    pub api_endpoint: Option<String>,

    /// Seed for the synthetic sensor window
    #[arg(long, conflicts_with = "input")]
    pub seed: Option<u64>,

    /// Read the sensor window from a JSON or CSV file
    #[arg(long, short)]
    pub input: Option<PathBuf>,
}

impl RunArgs {
    /// Merge the flags over the loaded settings
    pub fn probe_config(self, settings: &Settings) -> ProbeConfig {
        let mut config = ProbeConfig::new(
            self.project.unwrap_or_else(|| settings.project_id.clone()),
            self.location.unwrap_or_else(|| settings.location.clone()),
            self.endpoint.unwrap_or_else(|| settings.endpoint_id.clone()),
            self.credentials
                .unwrap_or_else(|| settings.credentials_path.clone()),
        );
        config.scopes = settings.scopes.clone();
        config.api_endpoint = self.api_endpoint.or_else(|| settings.api_endpoint.clone());
        config.input = match self.input {
            Some(path) => InputSource::File(path),
            None => InputSource::Synthetic { seed: self.seed },
        };
        config
    }
}

/// Run the probe and report the outcome
///
/// Pipeline failures are reported, not returned; only local plumbing errors
/// propagate.
pub async fn run_probe(settings: &Settings, args: RunArgs, format: OutputFormat) -> Result<()> {
    let config = args.probe_config(settings);
    let pipeline = Pipeline::new(VertexClient::new(settings.client_config())?);

    match format {
        OutputFormat::Json => {
            let report = pipeline.run(&config, &mut SilentObserver).await;
            print_json(&report)?;
        }
        OutputFormat::Table => {
            print_banner("TALARIA VERTEX AI PROBE");
            let mut narrator = Narrator::new(&config);
            let report = pipeline.run(&config, &mut narrator).await;
            print_summary(&report);
        }
    }

    Ok(())
}

/// Prints each step as the pipeline reports it
struct Narrator<'a> {
    config: &'a ProbeConfig,
}

impl<'a> Narrator<'a> {
    fn new(config: &'a ProbeConfig) -> Self {
        Self { config }
    }
}

impl RunObserver for Narrator<'_> {
    fn step_started(&mut self, step: Step) {
        println!();
        println!("{}", format!("[{}] {}...", step.number(), step).bold());
    }

    fn credential_loaded(&mut self, credential: &Credential) {
        print_success(&format!(
            "Credentials loaded from: {}",
            self.config.credentials_path.display()
        ));
        print_detail("Service Account", credential.account());
    }

    fn context_ready(&mut self, context: &ServiceContext) {
        print_success("Service context initialized");
        print_detail("Project", context.project());
        print_detail("Location", context.location());
        print_detail("API", context.base_url());
    }

    fn endpoint_resolved(&mut self, endpoint: &EndpointHandle) {
        print_success(&format!("Endpoint found: {}", endpoint.display_name.cyan()));
        print_detail("Endpoint ID", &endpoint.id);
        print_detail("Resource Name", &endpoint.resource_name);
        if endpoint.deployed_models.is_empty() {
            print_warning("No models are deployed to this endpoint");
        }
        for model in &endpoint.deployed_models {
            let name = model.display_name.as_deref().unwrap_or("unnamed");
            print_detail("Deployed Model", format!("{} ({})", model.id, name));
        }
    }

    fn request_built(&mut self, request: &PredictionRequest) {
        let Some(first) = request.instances().first() else {
            return;
        };
        match &self.config.input {
            InputSource::File(path) => {
                print_success(&format!("Sample data loaded from: {}", path.display()))
            }
            InputSource::Synthetic { seed: Some(seed) } => {
                print_success(&format!("Sample data prepared (seed {})", seed))
            }
            InputSource::Synthetic { seed: None } => print_success("Sample data prepared"),
        }
        print_detail(
            "Shape",
            format!("{} timesteps x {} features", first.timesteps(), NUM_FEATURES),
        );
        if let Some(row) = first.rows().first() {
            print_detail(
                "First sample",
                format!("{:?}... (showing first 3 features)", &row[..3]),
            );
        }
        print_detail(
            "Instances format",
            format!("List with {} batch(es)", request.batch_size()),
        );
    }

    fn response_received(&mut self, response: &PredictionResponse, interpretation: &Interpretation) {
        print_success("Prediction successful!");
        println!();
        print_banner("PREDICTION RESULTS");
        print_response(response, interpretation);
    }

    fn failed(&mut self, step: Step, error: &Error) {
        print_error(&format!("{} failed: {}", step, error));
        eprintln!("   Error type: {}", error.category());
        eprintln!("   Error details: {}", error);
    }
}

fn print_response(response: &PredictionResponse, interpretation: &Interpretation) {
    match serde_json::to_string(response) {
        Ok(raw) => println!("\nFull Response: {}", raw),
        Err(_) => println!("\nFull Response: {:?}", response),
    }
    println!("Predictions: {}", interpretation.prediction_count);

    match &interpretation.outcome {
        Some(PredictionOutcome::Classification {
            probabilities,
            predicted_class,
            confidence,
        }) => {
            println!("\n{}", "Class Probabilities:".bold());
            let rows: Vec<ProbabilityRow> = probabilities
                .iter()
                .enumerate()
                .map(|(class, p)| ProbabilityRow {
                    class,
                    probability: format!("{:.4}", p),
                })
                .collect();
            print_table(rows);
            println!();
            println!("Predicted Class: {}", predicted_class.to_string().bold());
            println!("Confidence: {}", color_confidence(*confidence));
        }
        Some(PredictionOutcome::Scalar { value }) => println!("\nPrediction: {}", value),
        Some(PredictionOutcome::Unstructured { value }) => println!("\nPrediction: {}", value),
        None => print_warning("Response contained no interpretable prediction"),
    }

    if let Some(id) = &interpretation.deployed_model_id {
        println!("\nDeployed Model ID: {}", id);
    }
    if let Some(name) = &interpretation.model_display_name {
        println!("Model Display Name: {}", name);
    }
    if let Some(model) = &interpretation.model {
        println!("Model: {}", model);
    }
    if let Some(version) = &interpretation.model_version_id {
        println!("Model Version: {}", version);
    }
}

fn print_summary(report: &RunReport) {
    println!();
    if report.succeeded() {
        print_banner("PROBE COMPLETED SUCCESSFULLY");
        if let Some((class, confidence)) = report
            .interpretation
            .as_ref()
            .and_then(Interpretation::classification)
        {
            print_info(&format!(
                "Class {} at {}",
                class,
                format_confidence(confidence)
            ));
        }
    } else {
        let step = report
            .failed_step
            .map(|s| format!(" at step [{}] {}", s.number(), s))
            .unwrap_or_default();
        print_banner(&format!("PROBE FAILED{}", step));
    }
    print_info(&format!("Finished in {}", format_duration(report.duration_ms)));
}
