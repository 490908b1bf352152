use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};

use super::models::{AnalysisFailureResponse, ErrorResponse};
use crate::pipeline::AnalysisError;

#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("No image file provided")]
    MissingImage,

    #[error("No file selected")]
    NoFileSelected,

    #[error("Invalid file type. Please upload an image.")]
    InvalidFileType,

    #[error("File too large. Maximum size is 16MB.")]
    TooLarge,

    #[error("Failed to read multipart data: {0}")]
    Multipart(String),

    #[error("{source}")]
    Analysis {
        source: AnalysisError,
        filename: String,
    },

    #[error("Server error: {0}")]
    Server(String),
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::MissingImage
            | ApiError::NoFileSelected
            | ApiError::InvalidFileType
            | ApiError::Multipart(_) => StatusCode::BAD_REQUEST,
            ApiError::TooLarge => StatusCode::PAYLOAD_TOO_LARGE,
            ApiError::Analysis { .. } | ApiError::Server(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        match self {
            ApiError::Analysis { source, filename } => (
                status,
                Json(AnalysisFailureResponse {
                    success: false,
                    error: source.to_string(),
                    filename,
                }),
            )
                .into_response(),
            other => (
                status,
                Json(ErrorResponse {
                    error: other.to_string(),
                }),
            )
                .into_response(),
        }
    }
}
