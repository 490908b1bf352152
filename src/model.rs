use std::path::Path;

use async_trait::async_trait;

use crate::error::ClientError;

/// Opaque handle to a file stored by the remote service.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FileHandle {
    /// Resource name assigned by the service, e.g. `files/abc123`.
    pub name: String,
    /// URI used to reference the file from generation requests.
    pub uri: String,
    /// MIME type recorded at upload time.
    pub mime_type: String,
}

/// One piece of conversational content sent to the model.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Part {
    File(FileHandle),
    Text(String),
}

/// The remote multimodal service the pipeline talks to.
///
/// Implementors own transport and authentication. The pipeline only sees
/// uploaded handles and the final response text.
#[async_trait]
pub trait GenerativeClient: Send + Sync {
    /// Uploads the file at `path` and returns a handle valid for the session.
    async fn upload(&self, path: &Path) -> Result<FileHandle, ClientError>;

    /// Runs one generation call.
    ///
    /// `system_instruction` is a generation-time directive and is never sent
    /// as part of `contents`.
    async fn generate_content(
        &self,
        model: &str,
        system_instruction: &str,
        contents: &[Part],
    ) -> Result<String, ClientError>;
}

/// Maps an image path to the MIME type announced on upload.
pub fn image_mime_type(path: &Path) -> Option<&'static str> {
    let extension = path.extension()?.to_str()?.to_ascii_lowercase();
    match extension.as_str() {
        "png" => Some("image/png"),
        "jpg" | "jpeg" => Some("image/jpeg"),
        "gif" => Some("image/gif"),
        "bmp" => Some("image/bmp"),
        "tif" | "tiff" => Some("image/tiff"),
        _ => None,
    }
}
