use std::sync::{Arc, Mutex};

use axum::{
    Json, Router,
    body::Bytes,
    extract::{Path, State},
    http::{HeaderMap, StatusCode},
    response::IntoResponse,
    routing::post,
};
use curb_sign::{
    ClientError, GeminiClient, GenerativeClient, Part, PipelineConfig, PromptSpec,
    SignAnalysisPipeline,
};
use serde_json::{Value, json};

const API_KEY: &str = "test-key";

#[derive(Clone, Default)]
struct MockGemini {
    base_url: Arc<Mutex<String>>,
    uploads: Arc<Mutex<Vec<usize>>>,
    generations: Arc<Mutex<Vec<Value>>>,
}

fn authorized(headers: &HeaderMap) -> bool {
    headers.get("x-goog-api-key").and_then(|v| v.to_str().ok()) == Some(API_KEY)
}

async fn start_upload(State(mock): State<MockGemini>, headers: HeaderMap) -> impl IntoResponse {
    if !authorized(&headers) {
        return (StatusCode::UNAUTHORIZED, HeaderMap::new(), "").into_response();
    }
    assert_eq!(headers["x-goog-upload-command"], "start");
    assert_eq!(headers["x-goog-upload-protocol"], "resumable");

    let mut response_headers = HeaderMap::new();
    let url = format!("{}/upload-session/1", mock.base_url.lock().unwrap());
    response_headers.insert("x-goog-upload-url", url.parse().unwrap());
    (StatusCode::OK, response_headers, "").into_response()
}

async fn finish_upload(
    State(mock): State<MockGemini>,
    headers: HeaderMap,
    body: Bytes,
) -> Json<Value> {
    assert_eq!(headers["x-goog-upload-command"], "upload, finalize");
    mock.uploads.lock().unwrap().push(body.len());
    Json(json!({
        "file": {
            "name": "files/abc",
            "uri": "https://mock.test/v1beta/files/abc",
            "mimeType": headers["content-type"].to_str().unwrap(),
            "state": "ACTIVE"
        }
    }))
}

async fn generate(
    State(mock): State<MockGemini>,
    Path(model_action): Path<String>,
    headers: HeaderMap,
    Json(request): Json<Value>,
) -> impl IntoResponse {
    if !authorized(&headers) {
        return (
            StatusCode::UNAUTHORIZED,
            Json(json!({ "error": { "code": 401, "message": "API key not valid" } })),
        );
    }
    let Some(model) = model_action.strip_suffix(":generateContent") else {
        return (StatusCode::NOT_FOUND, Json(json!({})));
    };
    if model == "empty-model" {
        return (StatusCode::OK, Json(json!({ "candidates": [] })));
    }

    mock.generations.lock().unwrap().push(request.clone());
    let instruction = request["systemInstruction"]["parts"][0]["text"]
        .as_str()
        .unwrap_or_default()
        .to_string();
    let prompt = request["contents"][0]["parts"][1]["text"]
        .as_str()
        .unwrap_or_default()
        .to_string();

    (
        StatusCode::OK,
        Json(json!({
            "candidates": [{
                "content": {
                    "role": "model",
                    "parts": [{ "text": format!("[{model}] {instruction}: ") }, { "text": prompt }]
                }
            }]
        })),
    )
}

async fn spawn_mock_gemini() -> (String, MockGemini) {
    let mock = MockGemini::default();
    let app = Router::new()
        .route("/upload/v1beta/files", post(start_upload))
        .route("/upload-session/1", post(finish_upload))
        .route("/v1beta/models/{model_action}", post(generate))
        .with_state(mock.clone());

    let listener = tokio::net::TcpListener::bind(("127.0.0.1", 0)).await.unwrap();
    let addr = listener.local_addr().unwrap();
    let base_url = format!("http://{}", addr);
    *mock.base_url.lock().unwrap() = base_url.clone();

    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    (base_url, mock)
}

fn sign_image() -> tempfile::NamedTempFile {
    let file = tempfile::Builder::new().suffix(".jpg").tempfile().unwrap();
    std::fs::write(file.path(), [0xFF, 0xD8, 0xFF, 0xE0, 0, 0]).unwrap();
    file
}

#[tokio::test]
async fn upload_runs_resumable_protocol_and_returns_handle() {
    let (base_url, mock) = spawn_mock_gemini().await;
    let client = GeminiClient::new(API_KEY, &base_url);
    let image = sign_image();

    let handle = client.upload(image.path()).await.unwrap();

    assert_eq!(handle.name, "files/abc");
    assert_eq!(handle.uri, "https://mock.test/v1beta/files/abc");
    assert_eq!(handle.mime_type, "image/jpeg");
    assert_eq!(*mock.uploads.lock().unwrap(), vec![6]);
}

#[tokio::test]
async fn generate_sends_system_instruction_outside_contents() {
    let (base_url, mock) = spawn_mock_gemini().await;
    let client = GeminiClient::new(API_KEY, format!("{base_url}/"));
    let image = sign_image();
    let handle = client.upload(image.path()).await.unwrap();

    let text = client
        .generate_content(
            "gemini-2.0-flash",
            "read signs",
            &[Part::File(handle), Part::Text("what does it say?".to_string())],
        )
        .await
        .unwrap();

    assert_eq!(text, "[gemini-2.0-flash] read signs: what does it say?");

    let requests = mock.generations.lock().unwrap();
    let parts = &requests[0]["contents"][0]["parts"];
    assert_eq!(parts[0]["fileData"]["fileUri"], "https://mock.test/v1beta/files/abc");
    assert_eq!(parts[0]["fileData"]["mimeType"], "image/jpeg");
    assert_eq!(requests[0]["contents"].as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn api_errors_surface_the_service_message() {
    let (base_url, _mock) = spawn_mock_gemini().await;
    let client = GeminiClient::new("wrong-key", &base_url);

    let err = client
        .generate_content("gemini-2.0-flash", "sys", &[Part::Text("hi".to_string())])
        .await
        .unwrap_err();

    match err {
        ClientError::Api { status, message } => {
            assert_eq!(status, 401);
            assert_eq!(message, "API key not valid");
        }
        other => panic!("unexpected error: {other}"),
    }
}

#[tokio::test]
async fn response_without_text_is_an_error() {
    let (base_url, _mock) = spawn_mock_gemini().await;
    let client = GeminiClient::new(API_KEY, &base_url);

    let err = client
        .generate_content("empty-model", "sys", &[Part::Text("hi".to_string())])
        .await
        .unwrap_err();

    assert!(matches!(err, ClientError::EmptyResponse));
}

#[tokio::test]
async fn unsupported_extension_is_rejected_before_any_request() {
    let (base_url, mock) = spawn_mock_gemini().await;
    let client = GeminiClient::new(API_KEY, &base_url);
    let file = tempfile::Builder::new().suffix(".txt").tempfile().unwrap();

    let err = client.upload(file.path()).await.unwrap_err();

    assert!(matches!(err, ClientError::UnsupportedFormat(_)));
    assert!(mock.uploads.lock().unwrap().is_empty());
}

#[tokio::test]
async fn pipeline_from_config_runs_two_stages_against_gemini() {
    let (base_url, mock) = spawn_mock_gemini().await;
    let config = PipelineConfig::new(API_KEY)
        .with_model("gemini-test")
        .with_base_url(&base_url);
    let pipeline = SignAnalysisPipeline::from_config(&config);
    let image = sign_image();

    let texts = pipeline
        .analyze(
            image.path(),
            &[
                PromptSpec::new("cds", "to json"),
                PromptSpec::new("park", "as a {vehicle_type}?"),
            ],
        )
        .await
        .into_texts()
        .unwrap();

    assert_eq!(
        texts,
        vec!["[gemini-test] cds: to json", "[gemini-test] park: as a Not specified?"]
    );
    assert_eq!(mock.uploads.lock().unwrap().len(), 2);
    assert_eq!(mock.generations.lock().unwrap().len(), 2);
}
