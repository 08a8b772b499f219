//! In-process [`DocumentApi`] for tests and dry runs.
//!
//! Enforces the same per-append block limit as Notion and supports
//! one-shot failure injection on append and delete.

use std::collections::HashMap;
use std::sync::Mutex;

use storyloom_core::markup::DocumentBlock;

use crate::api::{ChildBlock, DocumentApi, MAX_BLOCKS_PER_APPEND};
use crate::error::NotionError;

#[derive(Debug, Clone)]
struct Page {
    id: String,
    collection_id: String,
    title: String,
}

#[derive(Debug, Default)]
struct State {
    pages: Vec<Page>,
    children: HashMap<String, Vec<(String, DocumentBlock)>>,
    next_id: u64,
    append_calls: usize,
    delete_calls: usize,
    fail_next_append: bool,
    fail_next_delete: bool,
}

impl State {
    fn mint_id(&mut self, kind: &str) -> String {
        self.next_id += 1;
        format!("{kind}-{}", self.next_id)
    }
}

#[derive(Debug, Default)]
pub struct MemoryDocumentApi {
    state: Mutex<State>,
}

fn injected_failure() -> NotionError {
    NotionError::Api {
        status: 503,
        code: "service_unavailable".to_string(),
        message: "injected failure".to_string(),
    }
}

impl MemoryDocumentApi {
    pub fn new() -> Self {
        Self::default()
    }

    /// Blocks of a page, in document order.
    pub fn blocks(&self, page_id: &str) -> Vec<DocumentBlock> {
        self.lock()
            .children
            .get(page_id)
            .map(|children| children.iter().map(|(_, block)| block.clone()).collect())
            .unwrap_or_default()
    }

    /// Ids of all pages titled `title`, across collections.
    pub fn pages_titled(&self, title: &str) -> Vec<String> {
        self.lock()
            .pages
            .iter()
            .filter(|page| page.title == title)
            .map(|page| page.id.clone())
            .collect()
    }

    pub fn page_count(&self) -> usize {
        self.lock().pages.len()
    }

    /// Number of `append_children` calls that succeeded.
    pub fn append_calls(&self) -> usize {
        self.lock().append_calls
    }

    /// Number of `delete_block` calls that succeeded.
    pub fn delete_calls(&self) -> usize {
        self.lock().delete_calls
    }

    pub fn fail_next_append(&self) {
        self.lock().fail_next_append = true;
    }

    pub fn fail_next_delete(&self) {
        self.lock().fail_next_delete = true;
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, State> {
        self.state
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl DocumentApi for MemoryDocumentApi {
    async fn query_by_title(
        &self,
        collection_id: &str,
        title: &str,
    ) -> Result<Vec<String>, NotionError> {
        Ok(self
            .lock()
            .pages
            .iter()
            .filter(|page| page.collection_id == collection_id && page.title == title)
            .map(|page| page.id.clone())
            .collect())
    }

    async fn create_page(&self, collection_id: &str, title: &str) -> Result<String, NotionError> {
        let mut state = self.lock();
        let id = state.mint_id("page");
        state.pages.push(Page {
            id: id.clone(),
            collection_id: collection_id.to_string(),
            title: title.to_string(),
        });
        state.children.insert(id.clone(), Vec::new());
        Ok(id)
    }

    async fn list_children(&self, block_id: &str) -> Result<Vec<ChildBlock>, NotionError> {
        let state = self.lock();
        let children = state
            .children
            .get(block_id)
            .ok_or_else(|| NotionError::NotFound(block_id.to_string()))?;

        Ok(children
            .iter()
            .map(|(id, block)| ChildBlock {
                id: id.clone(),
                block_type: block_type(block).to_string(),
            })
            .collect())
    }

    async fn append_children(
        &self,
        block_id: &str,
        blocks: &[DocumentBlock],
    ) -> Result<(), NotionError> {
        if blocks.len() > MAX_BLOCKS_PER_APPEND {
            return Err(NotionError::TooManyBlocks(blocks.len()));
        }

        let mut state = self.lock();
        if std::mem::take(&mut state.fail_next_append) {
            return Err(injected_failure());
        }
        if !state.children.contains_key(block_id) {
            return Err(NotionError::NotFound(block_id.to_string()));
        }

        let mut appended = Vec::with_capacity(blocks.len());
        for block in blocks {
            appended.push((state.mint_id("block"), block.clone()));
        }
        state
            .children
            .entry(block_id.to_string())
            .or_default()
            .extend(appended);
        state.append_calls += 1;
        Ok(())
    }

    async fn delete_block(&self, block_id: &str) -> Result<(), NotionError> {
        let mut state = self.lock();
        if std::mem::take(&mut state.fail_next_delete) {
            return Err(injected_failure());
        }

        let removed = state.children.values_mut().any(|children| {
            let before = children.len();
            children.retain(|(id, _)| id != block_id);
            children.len() != before
        });
        if !removed {
            return Err(NotionError::NotFound(block_id.to_string()));
        }
        state.delete_calls += 1;
        Ok(())
    }
}

fn block_type(block: &DocumentBlock) -> &'static str {
    match block {
        DocumentBlock::Heading { level, .. } => match level.as_u8() {
            1 => "heading_1",
            2 => "heading_2",
            _ => "heading_3",
        },
        DocumentBlock::BulletedItem(_) => "bulleted_list_item",
        DocumentBlock::Paragraph(_) => "paragraph",
        DocumentBlock::Image { .. } => "image",
    }
}
