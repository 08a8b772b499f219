/// Errors from object storage backends.
#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    #[error("Upload of {key} failed: {message}")]
    Upload { key: String, message: String },

    #[error("Presigning {key} failed: {message}")]
    Presign { key: String, message: String },

    #[error("Object not found: {0}")]
    NotFound(String),
}
