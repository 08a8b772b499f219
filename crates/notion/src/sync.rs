//! Document sync engine.
//!
//! Applies content to remote documents addressed by exact title. Two write
//! modes exist:
//!
//! - **additive** ([`DocumentSync::append_text`], [`DocumentSync::append_image`],
//!   [`DocumentSync::upsert_document_with_append`]): never deletes. A retry
//!   after a failure may duplicate blocks but never loses any.
//! - **replace** ([`DocumentSync::replace_body`],
//!   [`DocumentSync::publish_document`]): deletes every top-level block
//!   then writes the new body. Idempotent, but not atomic: a failure
//!   between delete and append leaves the document partially written and
//!   is reported as [`SyncError::PartialSync`].

use std::sync::Arc;
use std::time::Duration;

use storyloom_cloud::{ObjectStore, DEFAULT_URL_EXPIRY};
use storyloom_core::episode::ImageArtifact;
use storyloom_core::markup::{parse_markup, split_segments, DocumentBlock, MAX_SEGMENT_LENGTH};

use crate::api::{DocumentApi, MAX_BLOCKS_PER_APPEND};
use crate::error::{NotionError, SyncError};

/// Default object key prefix for uploaded images.
pub const DEFAULT_KEY_PREFIX: &str = "generated";

/// An image to append, with an optional caption.
#[derive(Debug, Clone, Copy)]
pub struct ImageAttachment<'a> {
    pub image: &'a ImageArtifact,
    pub caption: Option<&'a str>,
}

pub struct DocumentSync<D> {
    api: D,
    store: Arc<dyn ObjectStore>,
    key_prefix: String,
    url_expiry: Duration,
}

impl<D: DocumentApi> DocumentSync<D> {
    pub fn new(api: D, store: Arc<dyn ObjectStore>) -> Self {
        Self {
            api,
            store,
            key_prefix: DEFAULT_KEY_PREFIX.to_string(),
            url_expiry: DEFAULT_URL_EXPIRY,
        }
    }

    pub fn with_key_prefix(mut self, key_prefix: impl Into<String>) -> Self {
        self.key_prefix = key_prefix.into();
        self
    }

    pub fn with_url_expiry(mut self, url_expiry: Duration) -> Self {
        self.url_expiry = url_expiry;
        self
    }

    pub fn api(&self) -> &D {
        &self.api
    }

    // -----------------------------------------------------------------------
    // Lookup
    // -----------------------------------------------------------------------

    /// Id of the first document in `collection_id` titled exactly `title`.
    pub async fn find_document_by_title(
        &self,
        collection_id: &str,
        title: &str,
    ) -> Result<Option<String>, SyncError> {
        let matches = self.api.query_by_title(collection_id, title).await?;
        if matches.len() > 1 {
            tracing::warn!(
                collection_id,
                title,
                matches = matches.len(),
                "Several documents share a title, using the first",
            );
        }
        Ok(matches.into_iter().next())
    }

    /// Id of the document titled `title`, creating an empty one if none
    /// exists.
    pub async fn create_document(
        &self,
        collection_id: &str,
        title: &str,
    ) -> Result<String, SyncError> {
        if let Some(id) = self.find_document_by_title(collection_id, title).await? {
            return Ok(id);
        }
        Ok(self.api.create_page(collection_id, title).await?)
    }

    // -----------------------------------------------------------------------
    // Replace
    // -----------------------------------------------------------------------

    /// Overwrite the body of `document_id` with `content` (markup).
    pub async fn replace_body(&self, document_id: &str, content: &str) -> Result<(), SyncError> {
        let blocks = parse_markup(content);
        let existing = self.api.list_children(document_id).await?;
        let appended = blocks.len();

        let mut deleted = 0;
        for child in &existing {
            match self.api.delete_block(&child.id).await {
                Ok(()) => deleted += 1,
                Err(source) if deleted == 0 => return Err(source.into()),
                Err(source) => return Err(partial_sync(document_id, deleted, source)),
            }
        }

        let mut written = 0;
        for chunk in blocks.chunks(MAX_BLOCKS_PER_APPEND) {
            match self.api.append_children(document_id, chunk).await {
                Ok(()) => written += chunk.len(),
                Err(source) if deleted == 0 && written == 0 => return Err(source.into()),
                Err(source) => return Err(partial_sync(document_id, deleted, source)),
            }
        }

        tracing::info!(document_id, deleted, appended, "Document body replaced");
        Ok(())
    }

    /// Find-or-create `title` and replace its body with `content`.
    /// Publishing the same content twice leaves one copy.
    pub async fn publish_document(
        &self,
        collection_id: &str,
        title: &str,
        content: &str,
    ) -> Result<String, SyncError> {
        let document_id = self.create_document(collection_id, title).await?;
        self.replace_body(&document_id, content).await?;
        Ok(document_id)
    }

    // -----------------------------------------------------------------------
    // Append
    // -----------------------------------------------------------------------

    /// Append `text` as paragraphs of at most `max_segment_length`
    /// characters. Returns the number of blocks appended.
    pub async fn append_text(
        &self,
        document_id: &str,
        text: &str,
        max_segment_length: usize,
    ) -> Result<usize, SyncError> {
        let segments = split_segments(text, max_segment_length)?;
        let count = segments.len();
        let blocks = segments.into_iter().map(DocumentBlock::Paragraph).collect();

        self.append_blocks(document_id, blocks).await?;
        tracing::debug!(document_id, segments = count, chars = text.chars().count(), "Text appended");
        Ok(count)
    }

    /// Append parsed markup without touching existing content.
    pub async fn append_markup(&self, document_id: &str, content: &str) -> Result<(), SyncError> {
        Ok(self.append_blocks(document_id, parse_markup(content)).await?)
    }

    /// Upload `image` and append it as an external image block. Returns
    /// the presigned URL.
    pub async fn append_image(
        &self,
        document_id: &str,
        image: &ImageArtifact,
        caption: Option<&str>,
    ) -> Result<String, SyncError> {
        let uploaded = self
            .store
            .upload(
                &self.key_prefix,
                image.bytes().to_vec(),
                image.content_type(),
                image.extension(),
                self.url_expiry,
            )
            .await?;

        let block = DocumentBlock::Image {
            url: uploaded.url.clone(),
            caption: caption.map(str::to_string),
        };
        self.api.append_children(document_id, &[block]).await?;

        tracing::info!(document_id, key = %uploaded.key, "Image appended");
        Ok(uploaded.url)
    }

    /// Find-or-create `title`, then append `text` and, if given, the
    /// image after it. Never deletes existing content.
    pub async fn upsert_document_with_append(
        &self,
        collection_id: &str,
        title: &str,
        text: &str,
        image: Option<ImageAttachment<'_>>,
    ) -> Result<String, SyncError> {
        let document_id = self.create_document(collection_id, title).await?;

        self.append_text(&document_id, text, MAX_SEGMENT_LENGTH).await?;
        if let Some(attachment) = image {
            self.append_image(&document_id, attachment.image, attachment.caption)
                .await?;
        }
        Ok(document_id)
    }

    // ---- private helpers ----

    /// Append in request-sized chunks, preserving order.
    async fn append_blocks(
        &self,
        document_id: &str,
        blocks: Vec<DocumentBlock>,
    ) -> Result<(), NotionError> {
        for chunk in blocks.chunks(MAX_BLOCKS_PER_APPEND) {
            self.api.append_children(document_id, chunk).await?;
        }
        Ok(())
    }
}

fn partial_sync(document_id: &str, deleted: usize, source: NotionError) -> SyncError {
    tracing::error!(
        document_id,
        deleted,
        sync_state = "partial",
        error = %source,
        "Document body left partially written, manual recovery needed",
    );
    SyncError::PartialSync {
        document_id: document_id.to_string(),
        deleted,
        source,
    }
}
