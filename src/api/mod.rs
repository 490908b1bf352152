mod error;
mod handlers;
mod models;

use std::{path::PathBuf, sync::Arc};

use axum::{
    Router,
    extract::DefaultBodyLimit,
    routing::{get, post},
};

use crate::{pipeline::SignAnalysisPipeline, prompt::PromptSet};

pub use error::ApiError;
pub use handlers::{
    ALLOWED_EXTENSIONS, MAX_UPLOAD_BYTES, allowed_file, analyze_sign, index, not_found,
    secure_filename,
};
pub use models::{AnalysisFailureResponse, Analyses, AnalyzeSignResponse, ErrorResponse};

/// Shared, read-only state behind every request.
pub struct AppState {
    pub pipeline: SignAnalysisPipeline,
    pub prompts: PromptSet,
    /// Where request uploads are staged; the system temp dir when unset.
    pub upload_dir: Option<PathBuf>,
}

impl AppState {
    pub fn new(pipeline: SignAnalysisPipeline, prompts: PromptSet) -> Self {
        Self {
            pipeline,
            prompts,
            upload_dir: None,
        }
    }

    pub fn with_upload_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.upload_dir = Some(dir.into());
        self
    }
}

pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/", get(index))
        .route("/analyze-sign", post(analyze_sign))
        .fallback(not_found)
        .layer(DefaultBodyLimit::max(MAX_UPLOAD_BYTES))
        .with_state(state)
}
