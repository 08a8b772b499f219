//! The document collection seam.

use std::future::Future;

use storyloom_core::markup::DocumentBlock;

use crate::error::NotionError;

/// Maximum number of children accepted by a single append request.
pub const MAX_BLOCKS_PER_APPEND: usize = 100;

/// A top-level block as returned by [`DocumentApi::list_children`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChildBlock {
    pub id: String,
    /// Remote block type name, e.g. `paragraph`.
    pub block_type: String,
}

/// Primitive operations on a collection of titled pages.
///
/// Implementations return every result page; callers never see cursors.
pub trait DocumentApi: Send + Sync {
    /// Ids of all pages in `collection_id` whose title equals `title`,
    /// in the order the collection returns them.
    fn query_by_title(
        &self,
        collection_id: &str,
        title: &str,
    ) -> impl Future<Output = Result<Vec<String>, NotionError>> + Send;

    /// Create an empty page and return its id.
    fn create_page(
        &self,
        collection_id: &str,
        title: &str,
    ) -> impl Future<Output = Result<String, NotionError>> + Send;

    /// All top-level children of a page, in document order.
    fn list_children(
        &self,
        block_id: &str,
    ) -> impl Future<Output = Result<Vec<ChildBlock>, NotionError>> + Send;

    /// Append `blocks` at the end of a page. At most
    /// [`MAX_BLOCKS_PER_APPEND`] blocks per call.
    fn append_children(
        &self,
        block_id: &str,
        blocks: &[DocumentBlock],
    ) -> impl Future<Output = Result<(), NotionError>> + Send;

    fn delete_block(&self, block_id: &str)
        -> impl Future<Output = Result<(), NotionError>> + Send;
}
