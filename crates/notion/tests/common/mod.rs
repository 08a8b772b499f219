use std::sync::Arc;

use storyloom_cloud::MemoryObjectStore;
use storyloom_core::episode::ImageArtifact;
use storyloom_notion::{DocumentSync, MemoryDocumentApi};

pub const COLLECTION: &str = "db-stories";

/// A valid 1x1 RGBA PNG.
pub const PNG_1X1: [u8; 70] = [
    0x89, 0x50, 0x4E, 0x47, 0x0D, 0x0A, 0x1A, 0x0A, 0x00, 0x00, 0x00, 0x0D, 0x49, 0x48, 0x44,
    0x52, 0x00, 0x00, 0x00, 0x01, 0x00, 0x00, 0x00, 0x01, 0x08, 0x06, 0x00, 0x00, 0x00, 0x1F,
    0x15, 0xC4, 0x89, 0x00, 0x00, 0x00, 0x0D, 0x49, 0x44, 0x41, 0x54, 0x78, 0xDA, 0x63, 0x64,
    0x60, 0xF8, 0x5F, 0x0F, 0x00, 0x02, 0x87, 0x01, 0x80, 0xEB, 0x47, 0xBA, 0x92, 0x00, 0x00,
    0x00, 0x00, 0x49, 0x45, 0x4E, 0x44, 0xAE, 0x42, 0x60, 0x82,
];

pub fn png() -> ImageArtifact {
    ImageArtifact::from_bytes(PNG_1X1.to_vec()).unwrap()
}

/// Sync engine over in-memory document and object stores. The object
/// store handle is returned for inspection.
pub fn memory_sync() -> (DocumentSync<MemoryDocumentApi>, Arc<MemoryObjectStore>) {
    let store = Arc::new(MemoryObjectStore::new());
    let sync = DocumentSync::new(MemoryDocumentApi::new(), store.clone()).with_key_prefix("test");
    (sync, store)
}
