//! Gemini implementation of [`GenerativeClient`].
//!
//! Uploads go through the Files API resumable protocol (start, then a single
//! upload-and-finalize request). Generation calls `models/{model}:generateContent`
//! with the system instruction carried in `systemInstruction`.

use std::path::Path;

use async_trait::async_trait;
use reqwest::header::CONTENT_TYPE;
use serde::{Deserialize, Serialize};

use crate::{
    config::PipelineConfig,
    error::ClientError,
    model::{FileHandle, GenerativeClient, Part, image_mime_type},
};

const API_KEY_HEADER: &str = "x-goog-api-key";
const UPLOAD_URL_HEADER: &str = "x-goog-upload-url";

#[derive(Clone)]
pub struct GeminiClient {
    api_key: String,
    base_url: String,
    client: reqwest::Client,
}

impl GeminiClient {
    pub fn new(api_key: impl Into<String>, base_url: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
            client: reqwest::Client::new(),
        }
    }

    pub fn from_config(config: &PipelineConfig) -> Self {
        Self::new(config.api_key.clone(), config.base_url.clone())
    }

    async fn start_upload(
        &self,
        display_name: &str,
        mime_type: &str,
        size: usize,
    ) -> Result<String, ClientError> {
        let response = self
            .client
            .post(format!("{}/upload/v1beta/files", self.base_url))
            .header(API_KEY_HEADER, &self.api_key)
            .header("X-Goog-Upload-Protocol", "resumable")
            .header("X-Goog-Upload-Command", "start")
            .header("X-Goog-Upload-Header-Content-Length", size.to_string())
            .header("X-Goog-Upload-Header-Content-Type", mime_type)
            .json(&StartUploadRequest {
                file: UploadMetadata { display_name },
            })
            .send()
            .await?;

        let response = check_status(response).await?;

        response
            .headers()
            .get(UPLOAD_URL_HEADER)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string)
            .ok_or(ClientError::MissingUploadUrl)
    }
}

#[async_trait]
impl GenerativeClient for GeminiClient {
    async fn upload(&self, path: &Path) -> Result<FileHandle, ClientError> {
        let mime_type = image_mime_type(path)
            .ok_or_else(|| ClientError::UnsupportedFormat(path.to_path_buf()))?;
        let bytes = tokio::fs::read(path).await.map_err(|source| ClientError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let display_name = path
            .file_name()
            .and_then(|name| name.to_str())
            .unwrap_or("image");

        let upload_url = self.start_upload(display_name, mime_type, bytes.len()).await?;
        log::debug!("Upload session opened for {display_name} ({} bytes)", bytes.len());

        let response = self
            .client
            .post(upload_url)
            .header(API_KEY_HEADER, &self.api_key)
            .header("X-Goog-Upload-Offset", "0")
            .header("X-Goog-Upload-Command", "upload, finalize")
            .header(CONTENT_TYPE, mime_type)
            .body(bytes)
            .send()
            .await?;

        let body: UploadResponse = check_status(response).await?.json().await?;
        let file = body.file;
        Ok(FileHandle {
            name: file.name,
            uri: file.uri,
            mime_type: file.mime_type.unwrap_or_else(|| mime_type.to_string()),
        })
    }

    async fn generate_content(
        &self,
        model: &str,
        system_instruction: &str,
        contents: &[Part],
    ) -> Result<String, ClientError> {
        let request = GenerateContentRequest {
            system_instruction: Content {
                role: None,
                parts: vec![WirePart::text(system_instruction)],
            },
            contents: vec![Content {
                role: Some("user"),
                parts: contents.iter().map(WirePart::from).collect(),
            }],
        };

        let response = self
            .client
            .post(format!(
                "{}/v1beta/models/{model}:generateContent",
                self.base_url
            ))
            .header(API_KEY_HEADER, &self.api_key)
            .json(&request)
            .send()
            .await?;

        let body = check_status(response).await?.text().await?;
        let response: GenerateContentResponse =
            serde_json::from_str(&body).map_err(|e| ClientError::Malformed(e.to_string()))?;

        response.text().ok_or(ClientError::EmptyResponse)
    }
}

async fn check_status(response: reqwest::Response) -> Result<reqwest::Response, ClientError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let body = response
        .text()
        .await
        .unwrap_or_else(|_| "<unable to read response body>".to_string());
    let message = serde_json::from_str::<ErrorEnvelope>(&body)
        .map(|envelope| envelope.error.message)
        .unwrap_or(body);

    Err(ClientError::Api {
        status: status.as_u16(),
        message,
    })
}

#[derive(Serialize)]
struct StartUploadRequest<'a> {
    file: UploadMetadata<'a>,
}

#[derive(Serialize)]
struct UploadMetadata<'a> {
    display_name: &'a str,
}

#[derive(Deserialize)]
struct UploadResponse {
    file: UploadedFile,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct UploadedFile {
    name: String,
    uri: String,
    mime_type: Option<String>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerateContentRequest<'a> {
    system_instruction: Content<'a>,
    contents: Vec<Content<'a>>,
}

#[derive(Serialize)]
struct Content<'a> {
    #[serde(skip_serializing_if = "Option::is_none")]
    role: Option<&'static str>,
    parts: Vec<WirePart<'a>>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
enum WirePart<'a> {
    Text(&'a str),
    FileData(FileData<'a>),
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct FileData<'a> {
    mime_type: &'a str,
    file_uri: &'a str,
}

impl<'a> WirePart<'a> {
    fn text(text: &'a str) -> Self {
        WirePart::Text(text)
    }
}

impl<'a> From<&'a Part> for WirePart<'a> {
    fn from(part: &'a Part) -> Self {
        match part {
            Part::Text(text) => WirePart::Text(text),
            Part::File(handle) => WirePart::FileData(FileData {
                mime_type: &handle.mime_type,
                file_uri: &handle.uri,
            }),
        }
    }
}

#[derive(Deserialize)]
struct GenerateContentResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Deserialize)]
struct Candidate {
    content: Option<CandidateContent>,
}

#[derive(Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<CandidatePart>,
}

#[derive(Deserialize)]
struct CandidatePart {
    text: Option<String>,
}

impl GenerateContentResponse {
    fn text(self) -> Option<String> {
        let content = self.candidates.into_iter().next()?.content?;
        let text: String = content.parts.into_iter().filter_map(|p| p.text).collect();
        if text.is_empty() { None } else { Some(text) }
    }
}

#[derive(Deserialize)]
struct ErrorEnvelope {
    error: ErrorBody,
}

#[derive(Deserialize)]
struct ErrorBody {
    message: String,
}
