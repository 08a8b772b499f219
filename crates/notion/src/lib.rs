//! Document collection access and the document sync engine.
//!
//! [`DocumentApi`] exposes the five primitives the sync engine needs from a
//! Notion-style collection. [`NotionClient`] implements it over the Notion
//! REST API; [`MemoryDocumentApi`] keeps pages in process. [`DocumentSync`]
//! layers title lookup, full-body replacement, and additive text/image
//! appends on top.

pub mod api;
pub mod blocks;
pub mod client;
pub mod error;
pub mod memory;
pub mod sync;

pub use api::{ChildBlock, DocumentApi, MAX_BLOCKS_PER_APPEND};
pub use client::NotionClient;
pub use error::{NotionError, SyncError};
pub use memory::MemoryDocumentApi;
pub use sync::{DocumentSync, ImageAttachment};
