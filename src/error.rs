use std::path::PathBuf;

/// Failures raised by a [`GenerativeClient`](crate::GenerativeClient).
#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    #[error("failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("unsupported image format: {0}")]
    UnsupportedFormat(PathBuf),

    #[error("request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("remote service returned {status}: {message}")]
    Api { status: u16, message: String },

    #[error("upload session did not return an upload URL")]
    MissingUploadUrl,

    #[error("malformed response: {0}")]
    Malformed(String),

    #[error("model returned no text")]
    EmptyResponse,
}

/// Failures while loading prompt pairs from storage.
#[derive(Debug, thiserror::Error)]
pub enum PromptError {
    #[error("failed to read prompt file {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("API key missing: set API_KEY (or GEMINI_API_KEY)")]
    MissingApiKey,

    #[error("invalid value for {name}: {value}")]
    Invalid { name: &'static str, value: String },
}
