use std::{collections::HashMap, sync::Arc};

use axum::{
    Json,
    body::Bytes,
    extract::{
        Multipart, State,
        multipart::{MultipartError, MultipartRejection},
    },
    http::StatusCode,
    response::{Html, IntoResponse, Response},
};
use tempfile::NamedTempFile;

use super::{
    AppState,
    error::ApiError,
    models::{Analyses, AnalyzeSignResponse, ErrorResponse},
};
use crate::pipeline::AnalysisResult;

/// Largest accepted request body.
pub const MAX_UPLOAD_BYTES: usize = 16 * 1024 * 1024;

pub const ALLOWED_EXTENSIONS: [&str; 6] = ["png", "jpg", "jpeg", "gif", "bmp", "tiff"];

const DEFAULT_VEHICLE_TYPE: &str = "car";
const TEMPLATE_FIELDS: [&str; 3] = ["vehicle_type", "date", "time"];

const INDEX_HTML: &str = include_str!("../../static/index.html");

pub async fn index() -> Html<&'static str> {
    Html(INDEX_HTML)
}

struct ImageUpload {
    filename: String,
    data: Bytes,
}

#[derive(Default)]
struct SignForm {
    image: Option<ImageUpload>,
    fields: HashMap<String, String>,
}

impl SignForm {
    async fn read(multipart: &mut Multipart) -> Result<Self, ApiError> {
        let mut form = SignForm::default();

        while let Some(field) = multipart.next_field().await.map_err(multipart_error)? {
            let Some(name) = field.name().map(str::to_string) else {
                continue;
            };

            if name == "image" {
                let filename = field.file_name().unwrap_or_default().to_string();
                let data = field.bytes().await.map_err(multipart_error)?;
                if data.len() > MAX_UPLOAD_BYTES {
                    return Err(ApiError::TooLarge);
                }
                form.image = Some(ImageUpload { filename, data });
            } else if TEMPLATE_FIELDS.contains(&name.as_str()) {
                let value = field.text().await.map_err(multipart_error)?;
                form.fields.insert(name, value);
            }
        }

        Ok(form)
    }

    fn template_variables(&self) -> HashMap<String, String> {
        let mut variables = self.fields.clone();
        variables
            .entry("vehicle_type".to_string())
            .or_insert_with(|| DEFAULT_VEHICLE_TYPE.to_string());
        variables
    }
}

fn multipart_error(err: MultipartError) -> ApiError {
    if err.status() == StatusCode::PAYLOAD_TOO_LARGE {
        ApiError::TooLarge
    } else {
        ApiError::Multipart(err.body_text())
    }
}

pub async fn analyze_sign(
    State(state): State<Arc<AppState>>,
    multipart: Result<Multipart, MultipartRejection>,
) -> Result<Json<AnalyzeSignResponse>, ApiError> {
    let mut multipart = multipart.map_err(|rejection| ApiError::Multipart(rejection.body_text()))?;

    let form = match SignForm::read(&mut multipart).await {
        Ok(form) => form,
        Err(err) => {
            log::warn!("Rejected upload: {err}");
            return Err(err);
        }
    };

    let variables = form.template_variables();
    let upload = form.image.ok_or(ApiError::MissingImage)?;
    if upload.filename.is_empty() {
        return Err(ApiError::NoFileSelected);
    }
    if !allowed_file(&upload.filename) {
        log::warn!("Rejected upload with disallowed name {:?}", upload.filename);
        return Err(ApiError::InvalidFileType);
    }

    let filename = secure_filename(&upload.filename);
    let temp_file = write_temp_file(&state, &filename, &upload.data).await?;

    let specs = state.prompts.bind(&variables);
    let result = state.pipeline.analyze(temp_file.path(), &specs).await;

    if let Err(e) = temp_file.close() {
        log::warn!("Failed to remove temp upload: {e}");
    }

    match result {
        AnalysisResult::Success(responses) => {
            log::info!("Analyzed {filename} in {} stage(s)", responses.len());
            let texts = responses.into_iter().map(|r| r.text).collect();
            Ok(Json(AnalyzeSignResponse {
                success: true,
                analyses: Analyses::from_texts(texts),
                filename,
            }))
        }
        AnalysisResult::Error(source) => Err(ApiError::Analysis { source, filename }),
    }
}

/// Writes the upload to a uniquely named file that is removed when dropped.
async fn write_temp_file(
    state: &AppState,
    filename: &str,
    data: &[u8],
) -> Result<NamedTempFile, ApiError> {
    let suffix = filename
        .rsplit_once('.')
        .map(|(_, ext)| format!(".{}", ext.to_ascii_lowercase()))
        .unwrap_or_default();

    let mut builder = tempfile::Builder::new();
    builder.prefix("sign-").suffix(&suffix);
    let temp_file = match &state.upload_dir {
        Some(dir) => builder.tempfile_in(dir),
        None => builder.tempfile(),
    }
    .map_err(|e| server_error("failed to create temp file", e))?;

    tokio::fs::write(temp_file.path(), data)
        .await
        .map_err(|e| server_error("failed to write temp file", e))?;

    Ok(temp_file)
}

fn server_error(context: &str, err: std::io::Error) -> ApiError {
    log::error!("{context}: {err}");
    ApiError::Server(format!("{context}: {err}"))
}

pub fn allowed_file(filename: &str) -> bool {
    filename
        .rsplit_once('.')
        .map(|(_, ext)| ext.to_ascii_lowercase())
        .is_some_and(|ext| ALLOWED_EXTENSIONS.contains(&ext.as_str()))
}

/// Reduces a client-supplied filename to a safe basename.
pub fn secure_filename(filename: &str) -> String {
    let base = filename.rsplit(['/', '\\']).next().unwrap_or(filename);
    let cleaned: String = base
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || matches!(c, '.' | '_' | '-') {
                c
            } else {
                '_'
            }
        })
        .collect();
    let cleaned = cleaned.trim_start_matches('.');
    if cleaned.is_empty() {
        "upload".to_string()
    } else {
        cleaned.to_string()
    }
}

pub async fn not_found() -> Response {
    (
        StatusCode::NOT_FOUND,
        Json(ErrorResponse {
            error: "Not found".to_string(),
        }),
    )
        .into_response()
}
