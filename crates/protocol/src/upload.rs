use formats::{FeatureCollection, FileDescriptor};

use crate::error::{BackendError, explanation, status_checked};

/// Multipart field name; repeated once per file.
pub const UPLOAD_FIELD: &str = "files";

/// Shown when the upload channel fails without an explanation.
pub const UPLOAD_FALLBACK_ERROR: &str = "Failed to upload shapefile";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadRequest {
    pub files: Vec<FileDescriptor>,
}

impl UploadRequest {
    pub fn new(files: Vec<FileDescriptor>) -> Self {
        Self { files }
    }

    /// `(field, file)` pairs in submission order.
    pub fn parts(&self) -> impl Iterator<Item = (&'static str, &FileDescriptor)> + '_ {
        self.files.iter().map(|f| (UPLOAD_FIELD, f))
    }
}

/// Decodes the converter's reply.
///
/// The success body is a FeatureCollection object or a JSON string holding
/// one; an `error` field is a failure whatever the status.
pub fn decode_upload_reply(status: u16, body: &str) -> Result<FeatureCollection, BackendError> {
    let value = status_checked(status, body)?;
    if let Some(message) = explanation(&value) {
        return Err(BackendError::Rejected { status, message });
    }
    FeatureCollection::from_json_or_text(value).map_err(|e| BackendError::Payload(e.to_string()))
}
