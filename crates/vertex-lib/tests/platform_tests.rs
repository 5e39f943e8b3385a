//! Integration tests for the Vertex AI client and the probe pipeline
//! against a mock HTTP server

use mockito::{Matcher, Mock, ServerGuard};
use std::io::Write;
use std::time::Duration;
use tempfile::NamedTempFile;
use tokio::io::AsyncReadExt;
use vertex_lib::{
    sensor::synthetic_request, ClientConfig, Credential, EndpointHandle, Error, ErrorCategory, Pipeline,
    PredictionPlatform, ProbeConfig, RunStage, ServiceContext, SilentObserver, Step,
    VertexClient, CLOUD_PLATFORM_SCOPE,
};

const TEST_KEY: &str = include_str!("fixtures/test_rsa_key.pem");
const PROJECT: &str = "project-talaria-474215";
const LOCATION: &str = "asia-south1";
const ENDPOINT_ID: &str = "9135793736679161856";
const RESOURCE_NAME: &str = "projects/480213/locations/asia-south1/endpoints/9135793736679161856";

fn write_key_file(server: &ServerGuard) -> NamedTempFile {
    let mut file = NamedTempFile::new().unwrap();
    let json = serde_json::json!({
        "type": "service_account",
        "project_id": PROJECT,
        "private_key_id": "kid-1",
        "private_key": TEST_KEY,
        "client_email": "probe@project-talaria-474215.iam.gserviceaccount.com",
        "token_uri": format!("{}/token", server.url()),
    });
    file.write_all(json.to_string().as_bytes()).unwrap();
    file
}

fn context(server: &ServerGuard, key: &NamedTempFile) -> ServiceContext {
    let credential = Credential::from_file(key.path(), &[CLOUD_PLATFORM_SCOPE]).unwrap();
    ServiceContext::new(PROJECT, LOCATION, credential, Some(&server.url())).unwrap()
}

fn probe_config(server: &ServerGuard, key: &NamedTempFile) -> ProbeConfig {
    let mut config = ProbeConfig::new(PROJECT, LOCATION, ENDPOINT_ID, key.path());
    config.api_endpoint = Some(server.url());
    config
}

fn endpoint_path() -> String {
    format!(
        "/v1/projects/{}/locations/{}/endpoints/{}",
        PROJECT, LOCATION, ENDPOINT_ID
    )
}

fn predict_path() -> String {
    format!("/v1/{}:predict", RESOURCE_NAME)
}

async fn mock_token(server: &mut ServerGuard, hits: usize) -> Mock {
    server
        .mock("POST", "/token")
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(r#"{"access_token": "ya29.test", "expires_in": 3599, "token_type": "Bearer"}"#)
        .expect(hits)
        .create_async()
        .await
}

async fn mock_endpoint(server: &mut ServerGuard) -> Mock {
    server
        .mock("GET", endpoint_path().as_str())
        .match_header("authorization", "Bearer ya29.test")
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(
            serde_json::json!({
                "name": RESOURCE_NAME,
                "displayName": "talaria-activity-lstm",
                "deployedModels": [
                    {"id": "3344", "model": "projects/480213/locations/asia-south1/models/77", "displayName": "lstm-v2"}
                ]
            })
            .to_string(),
        )
        .create_async()
        .await
}

fn resolved_endpoint() -> EndpointHandle {
    EndpointHandle {
        id: ENDPOINT_ID.to_string(),
        display_name: "talaria-activity-lstm".to_string(),
        resource_name: RESOURCE_NAME.to_string(),
        deployed_models: Vec::new(),
    }
}

/// Predict against `api_endpoint`, with tokens served by `server`
async fn predict_via(
    server: &ServerGuard,
    api_endpoint: &str,
    config: ClientConfig,
) -> (String, String) {
    let key = write_key_file(server);
    let credential = Credential::from_file(key.path(), &[CLOUD_PLATFORM_SCOPE]).unwrap();
    let context = ServiceContext::new(PROJECT, LOCATION, credential, Some(api_endpoint)).unwrap();

    let err = VertexClient::new(config)
        .unwrap()
        .predict(&context, &resolved_endpoint(), &synthetic_request(Some(1)))
        .await
        .unwrap_err();
    match err {
        Error::Prediction { category, message } => (category, message),
        other => panic!("expected a prediction error, got {:?}", other),
    }
}

fn client() -> VertexClient {
    VertexClient::new(ClientConfig::default()).unwrap()
}

#[tokio::test]
async fn test_resolve_endpoint() {
    let mut server = mockito::Server::new_async().await;
    let token = mock_token(&mut server, 1).await;
    let lookup = mock_endpoint(&mut server).await;
    let key = write_key_file(&server);

    let endpoint = client()
        .resolve_endpoint(&context(&server, &key), ENDPOINT_ID)
        .await
        .unwrap();

    assert_eq!(endpoint.id, ENDPOINT_ID);
    assert_eq!(endpoint.display_name, "talaria-activity-lstm");
    assert_eq!(endpoint.resource_name, RESOURCE_NAME);
    assert_eq!(endpoint.deployed_models.len(), 1);
    assert_eq!(endpoint.deployed_models[0].display_name.as_deref(), Some("lstm-v2"));
    token.assert_async().await;
    lookup.assert_async().await;
}

#[tokio::test]
async fn test_resolve_endpoint_by_resource_name() {
    let mut server = mockito::Server::new_async().await;
    mock_token(&mut server, 1).await;
    let lookup = server
        .mock("GET", format!("/v1/{}", RESOURCE_NAME).as_str())
        .with_status(200)
        .with_body(format!(r#"{{"name": "{}", "displayName": "x"}}"#, RESOURCE_NAME))
        .create_async()
        .await;
    let key = write_key_file(&server);

    let endpoint = client()
        .resolve_endpoint(&context(&server, &key), RESOURCE_NAME)
        .await
        .unwrap();

    assert_eq!(endpoint.id, ENDPOINT_ID);
    assert!(endpoint.deployed_models.is_empty());
    lookup.assert_async().await;
}

#[tokio::test]
async fn test_unknown_endpoint() {
    let mut server = mockito::Server::new_async().await;
    mock_token(&mut server, 1).await;
    server
        .mock("GET", endpoint_path().as_str())
        .with_status(404)
        .with_body(r#"{"error": {"code": 404, "message": "Endpoint does not exist.", "status": "NOT_FOUND"}}"#)
        .create_async()
        .await;
    let key = write_key_file(&server);

    let err = client()
        .resolve_endpoint(&context(&server, &key), ENDPOINT_ID)
        .await
        .unwrap_err();

    assert_eq!(err.category(), ErrorCategory::EndpointNotFoundError);
    assert!(err.to_string().contains("NOT_FOUND: Endpoint does not exist."));
}

#[tokio::test]
async fn test_endpoint_permission_denied() {
    let mut server = mockito::Server::new_async().await;
    mock_token(&mut server, 1).await;
    server
        .mock("GET", endpoint_path().as_str())
        .with_status(403)
        .with_body(r#"{"error": {"code": 403, "message": "Permission 'aiplatform.endpoints.get' denied", "status": "PERMISSION_DENIED"}}"#)
        .create_async()
        .await;
    let key = write_key_file(&server);

    let err = client()
        .resolve_endpoint(&context(&server, &key), ENDPOINT_ID)
        .await
        .unwrap_err();

    assert!(matches!(err, Error::EndpointNotFound { .. }));
    assert!(err.to_string().contains("permission denied (PERMISSION_DENIED)"));
}

#[tokio::test]
async fn test_malformed_endpoint_id_makes_no_calls() {
    let mut server = mockito::Server::new_async().await;
    let token = mock_token(&mut server, 0).await;
    let key = write_key_file(&server);

    let err = client()
        .resolve_endpoint(&context(&server, &key), "endpoints/../../secrets")
        .await
        .unwrap_err();

    assert_eq!(err.category(), ErrorCategory::EndpointNotFoundError);
    token.assert_async().await;
}

#[tokio::test]
async fn test_token_exchange_failure_is_credential_error() {
    let mut server = mockito::Server::new_async().await;
    server
        .mock("POST", "/token")
        .with_status(401)
        .with_body(r#"{"error": "invalid_client", "error_description": "The OAuth client was not found."}"#)
        .create_async()
        .await;
    let key = write_key_file(&server);

    let err = client()
        .resolve_endpoint(&context(&server, &key), ENDPOINT_ID)
        .await
        .unwrap_err();

    assert_eq!(err.category(), ErrorCategory::CredentialError);
    assert!(err.to_string().contains("invalid_client"));
}

#[tokio::test]
async fn test_prediction_error_carries_remote_status() {
    let mut server = mockito::Server::new_async().await;
    mock_token(&mut server, 1).await;
    mock_endpoint(&mut server).await;
    server
        .mock("POST", predict_path().as_str())
        .with_status(400)
        .with_body(r#"{"error": {"code": 400, "message": "Input shape mismatch: expected [-1, 60, 12]", "status": "INVALID_ARGUMENT"}}"#)
        .create_async()
        .await;
    let key = write_key_file(&server);
    let context = context(&server, &key);
    let client = client();

    let endpoint = client.resolve_endpoint(&context, ENDPOINT_ID).await.unwrap();
    let err = client
        .predict(&context, &endpoint, &synthetic_request(Some(3)))
        .await
        .unwrap_err();

    match err {
        Error::Prediction { category, message } => {
            assert_eq!(category, "INVALID_ARGUMENT");
            assert!(message.contains("shape mismatch"));
        }
        other => panic!("expected a prediction error, got {:?}", other),
    }
}

#[tokio::test]
async fn test_end_to_end_classification() {
    let mut server = mockito::Server::new_async().await;
    let token = mock_token(&mut server, 1).await;
    mock_endpoint(&mut server).await;
    let predict = server
        .mock("POST", predict_path().as_str())
        .match_header("authorization", "Bearer ya29.test")
        .match_header("content-type", "application/json")
        .match_body(Matcher::Regex(r#"^\{"instances":\[\[\[-?[0-9]"#.to_string()))
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(
            r#"{"predictions": [[0.1, 0.7, 0.2]], "deployedModelId": "3344", "modelDisplayName": "lstm-v2"}"#,
        )
        .expect(1)
        .create_async()
        .await;
    let key = write_key_file(&server);

    let pipeline = Pipeline::new(client());
    let report = pipeline
        .run(&probe_config(&server, &key), &mut SilentObserver)
        .await;

    assert!(report.succeeded(), "run failed: {:?}", report.error);
    let interpretation = report.interpretation.unwrap();
    assert_eq!(interpretation.classification(), Some((1, 0.7)));
    assert_eq!(interpretation.deployed_model_id.as_deref(), Some("3344"));
    assert_eq!(interpretation.model_display_name.as_deref(), Some("lstm-v2"));
    assert_eq!(report.batch_size, Some(1));
    predict.assert_async().await;
    token.assert_async().await;
}

#[tokio::test]
async fn test_end_to_end_abort_on_unknown_endpoint() {
    let mut server = mockito::Server::new_async().await;
    mock_token(&mut server, 1).await;
    server
        .mock("GET", endpoint_path().as_str())
        .with_status(404)
        .with_body(r#"{"error": {"code": 404, "message": "not found", "status": "NOT_FOUND"}}"#)
        .create_async()
        .await;
    let predict = server
        .mock("POST", predict_path().as_str())
        .expect(0)
        .create_async()
        .await;
    let key = write_key_file(&server);

    let report = Pipeline::new(client())
        .run(&probe_config(&server, &key), &mut SilentObserver)
        .await;

    assert_eq!(report.stage, RunStage::Failed);
    assert_eq!(report.failed_step, Some(Step::ResolveEndpoint));
    assert_eq!(
        report.error.unwrap().category,
        ErrorCategory::EndpointNotFoundError
    );
    assert!(report.response.is_none());
    predict.assert_async().await;
}

#[tokio::test]
async fn test_prediction_timeout_is_deadline_exceeded() {
    let mut server = mockito::Server::new_async().await;
    mock_token(&mut server, 1).await;

    // Accepts connections and never answers
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        let mut held = Vec::new();
        while let Ok((mut socket, _)) = listener.accept().await {
            let mut buf = [0u8; 1024];
            let _ = socket.read(&mut buf).await;
            held.push(socket);
        }
    });

    let config = ClientConfig {
        request_timeout: Duration::from_millis(200),
        ..ClientConfig::default()
    };
    let (category, _) = predict_via(&server, &format!("http://{}", addr), config).await;

    assert_eq!(category, "DEADLINE_EXCEEDED");
}

#[tokio::test]
async fn test_prediction_connection_refused_is_unavailable() {
    let mut server = mockito::Server::new_async().await;
    mock_token(&mut server, 1).await;

    let addr = std::net::TcpListener::bind("127.0.0.1:0")
        .unwrap()
        .local_addr()
        .unwrap();
    let (category, _) =
        predict_via(&server, &format!("http://{}", addr), ClientConfig::default()).await;

    assert_eq!(category, "UNAVAILABLE");
}

#[tokio::test]
async fn test_malformed_prediction_body_is_serialization_error() {
    let mut server = mockito::Server::new_async().await;
    mock_token(&mut server, 1).await;
    server
        .mock("POST", predict_path().as_str())
        .with_status(200)
        .with_body("not json")
        .create_async()
        .await;

    let url = server.url();
    let (category, message) = predict_via(&server, &url, ClientConfig::default()).await;

    assert_eq!(category, "SERIALIZATION");
    assert!(message.contains("malformed prediction response"));
}

#[tokio::test]
async fn test_padded_endpoint_id_reported_trimmed() {
    let mut server = mockito::Server::new_async().await;
    mock_token(&mut server, 1).await;
    let lookup = server
        .mock("GET", endpoint_path().as_str())
        .with_status(404)
        .with_body(r#"{"error": {"code": 404, "message": "not found", "status": "NOT_FOUND"}}"#)
        .create_async()
        .await;
    let key = write_key_file(&server);

    let err = client()
        .resolve_endpoint(&context(&server, &key), "  9135793736679161856\n")
        .await
        .unwrap_err();

    match err {
        Error::EndpointNotFound { endpoint, .. } => assert_eq!(endpoint, ENDPOINT_ID),
        other => panic!("expected an endpoint error, got {:?}", other),
    }
    lookup.assert_async().await;
}
