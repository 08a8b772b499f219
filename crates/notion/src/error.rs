use storyloom_cloud::StorageError;
use storyloom_core::error::CoreError;

/// Errors from a [`DocumentApi`](crate::DocumentApi) implementation.
#[derive(Debug, thiserror::Error)]
pub enum NotionError {
    /// The HTTP request itself failed (network, DNS, TLS, etc.).
    #[error("HTTP request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("Notion rate limit exceeded: {body}")]
    RateLimited { body: String },

    /// Notion returned a non-2xx status code.
    #[error("Notion API error ({status} {code}): {message}")]
    Api {
        status: u16,
        code: String,
        message: String,
    },

    #[error("Append of {0} blocks exceeds the per-request limit")]
    TooManyBlocks(usize),

    #[error("Block not found: {0}")]
    NotFound(String),
}

/// Errors from the document sync engine.
#[derive(Debug, thiserror::Error)]
pub enum SyncError {
    #[error(transparent)]
    Api(#[from] NotionError),

    #[error("Image upload failed: {0}")]
    Storage(#[from] StorageError),

    #[error(transparent)]
    Content(#[from] CoreError),

    /// The old body was (partly) removed but the new body was not fully
    /// written. The document needs manual recovery.
    #[error("Partial sync of document {document_id}: {deleted} blocks deleted, body not restored")]
    PartialSync {
        document_id: String,
        deleted: usize,
        #[source]
        source: NotionError,
    },
}
