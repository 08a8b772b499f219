//! Integration tests for the document sync engine over in-memory backends.

mod common;

use assert_matches::assert_matches;
use common::{memory_sync, png, COLLECTION};
use storyloom_core::markup::{DocumentBlock, HeadingLevel};
use storyloom_notion::{DocumentApi, ImageAttachment, NotionError, SyncError};

// ---------------------------------------------------------------------------
// Test: lookup and creation
// ---------------------------------------------------------------------------

#[tokio::test]
async fn find_returns_none_for_unknown_title() {
    let (sync, _) = memory_sync();
    let found = sync.find_document_by_title(COLLECTION, "missing").await.unwrap();
    assert_eq!(found, None);
}

#[tokio::test]
async fn first_match_wins_among_duplicate_titles() {
    let (sync, _) = memory_sync();
    let first = sync.api().create_page(COLLECTION, "dup").await.unwrap();
    let _second = sync.api().create_page(COLLECTION, "dup").await.unwrap();

    let found = sync.find_document_by_title(COLLECTION, "dup").await.unwrap();
    assert_eq!(found, Some(first));
}

#[tokio::test]
async fn lookup_is_scoped_to_collection() {
    let (sync, _) = memory_sync();
    sync.api().create_page("other-db", "title").await.unwrap();
    assert_eq!(sync.find_document_by_title(COLLECTION, "title").await.unwrap(), None);
}

#[tokio::test]
async fn create_document_reuses_existing() {
    let (sync, _) = memory_sync();
    let a = sync.create_document(COLLECTION, "Serial Story - s1").await.unwrap();
    let b = sync.create_document(COLLECTION, "Serial Story - s1").await.unwrap();
    assert_eq!(a, b);
    assert_eq!(sync.api().page_count(), 1);
}

// ---------------------------------------------------------------------------
// Test: append_text segmentation
// ---------------------------------------------------------------------------

#[tokio::test]
async fn append_text_splits_into_ceil_segments() {
    let (sync, _) = memory_sync();
    let id = sync.create_document(COLLECTION, "t").await.unwrap();
    let text = "x".repeat(4500);

    let count = sync.append_text(&id, &text, 2000).await.unwrap();
    assert_eq!(count, 3);

    let blocks = sync.api().blocks(&id);
    assert_eq!(blocks.len(), 3);
    let joined: String = blocks.iter().filter_map(DocumentBlock::text).collect();
    assert_eq!(joined, text);
    assert!(blocks
        .iter()
        .all(|b| matches!(b, DocumentBlock::Paragraph(t) if t.chars().count() <= 2000)));
}

#[tokio::test]
async fn append_text_counts_characters_not_bytes() {
    let (sync, _) = memory_sync();
    let id = sync.create_document(COLLECTION, "t").await.unwrap();

    let count = sync.append_text(&id, &"物語".repeat(5), 4).await.unwrap();
    assert_eq!(count, 3);
}

#[tokio::test]
async fn append_text_rejects_zero_segment_length() {
    let (sync, _) = memory_sync();
    let id = sync.create_document(COLLECTION, "t").await.unwrap();
    assert_matches!(
        sync.append_text(&id, "abc", 0).await,
        Err(SyncError::Content(_))
    );
    assert!(sync.api().blocks(&id).is_empty());
}

#[tokio::test]
async fn append_text_never_deletes() {
    let (sync, _) = memory_sync();
    let id = sync.create_document(COLLECTION, "t").await.unwrap();
    sync.append_text(&id, "one", 2000).await.unwrap();
    sync.append_text(&id, "two", 2000).await.unwrap();

    assert_eq!(
        sync.api().blocks(&id),
        vec![
            DocumentBlock::Paragraph("one".into()),
            DocumentBlock::Paragraph("two".into()),
        ]
    );
    assert_eq!(sync.api().delete_calls(), 0);
}

#[tokio::test]
async fn long_text_is_appended_in_request_sized_chunks() {
    let (sync, _) = memory_sync();
    let id = sync.create_document(COLLECTION, "t").await.unwrap();

    let count = sync.append_text(&id, &"y".repeat(250), 1).await.unwrap();
    assert_eq!(count, 250);
    assert_eq!(sync.api().append_calls(), 3);
    assert_eq!(sync.api().blocks(&id).len(), 250);
}

// ---------------------------------------------------------------------------
// Test: images
// ---------------------------------------------------------------------------

#[tokio::test]
async fn append_image_uploads_then_links() {
    let (sync, store) = memory_sync();
    let id = sync.create_document(COLLECTION, "t").await.unwrap();

    let url = sync.append_image(&id, &png(), Some("Part 1")).await.unwrap();

    let keys = store.keys();
    assert_eq!(keys.len(), 1);
    assert!(keys[0].starts_with("test/"));
    assert!(keys[0].ends_with(".png"));
    assert_eq!(store.get(&keys[0]).unwrap().content_type, "image/png");
    assert!(url.contains(&keys[0]));

    assert_eq!(
        sync.api().blocks(&id),
        vec![DocumentBlock::Image {
            url,
            caption: Some("Part 1".into())
        }]
    );
}

#[tokio::test]
async fn upsert_appends_text_before_image() {
    let (sync, _) = memory_sync();
    let image = png();

    let id = sync
        .upsert_document_with_append(
            COLLECTION,
            "Serial Story - s1",
            "Episode body.",
            Some(ImageAttachment {
                image: &image,
                caption: Some("Part 1"),
            }),
        )
        .await
        .unwrap();

    let blocks = sync.api().blocks(&id);
    assert_eq!(blocks.len(), 2);
    assert_eq!(blocks[0], DocumentBlock::Paragraph("Episode body.".into()));
    assert_matches!(&blocks[1], DocumentBlock::Image { caption: Some(c), .. } if c == "Part 1");
}

#[tokio::test]
async fn upsert_without_image_appends_to_existing_document() {
    let (sync, _) = memory_sync();
    let first = sync
        .upsert_document_with_append(COLLECTION, "s", "one", None)
        .await
        .unwrap();
    let second = sync
        .upsert_document_with_append(COLLECTION, "s", "two", None)
        .await
        .unwrap();

    assert_eq!(first, second);
    assert_eq!(sync.api().blocks(&first).len(), 2);
}

// ---------------------------------------------------------------------------
// Test: replace_body / publish_document
// ---------------------------------------------------------------------------

#[tokio::test]
async fn replace_body_overwrites_and_is_idempotent() {
    let (sync, _) = memory_sync();
    let id = sync.create_document(COLLECTION, "report").await.unwrap();
    sync.append_text(&id, "stale", 2000).await.unwrap();

    let content = "## Heading\n\n- bullet\nbody text\n";
    sync.replace_body(&id, content).await.unwrap();
    let once = sync.api().blocks(&id);
    sync.replace_body(&id, content).await.unwrap();
    let twice = sync.api().blocks(&id);

    assert_eq!(
        once,
        vec![
            DocumentBlock::Heading {
                level: HeadingLevel::Two,
                text: "Heading".into()
            },
            DocumentBlock::BulletedItem("bullet".into()),
            DocumentBlock::Paragraph("body text".into()),
        ]
    );
    assert_eq!(once, twice);
}

#[tokio::test]
async fn publish_twice_leaves_one_copy() {
    let (sync, _) = memory_sync();
    let content = "# 2025-01-01\nSummary.";

    let a = sync.publish_document(COLLECTION, "2025-01-01", content).await.unwrap();
    let b = sync.publish_document(COLLECTION, "2025-01-01", content).await.unwrap();

    assert_eq!(a, b);
    assert_eq!(sync.api().pages_titled("2025-01-01").len(), 1);
    assert_eq!(sync.api().blocks(&a).len(), 2);
}

#[tokio::test]
async fn append_failure_after_delete_is_partial_sync() {
    let (sync, _) = memory_sync();
    let id = sync.create_document(COLLECTION, "report").await.unwrap();
    sync.append_text(&id, "old", 2000).await.unwrap();

    sync.api().fail_next_append();
    let result = sync.replace_body(&id, "new body").await;

    assert_matches!(
        result,
        Err(SyncError::PartialSync { ref document_id, deleted: 1, .. }) if *document_id == id
    );
    assert!(sync.api().blocks(&id).is_empty());
}

#[tokio::test]
async fn delete_failure_before_any_change_is_plain_api_error() {
    let (sync, _) = memory_sync();
    let id = sync.create_document(COLLECTION, "report").await.unwrap();
    sync.append_text(&id, "old", 2000).await.unwrap();

    sync.api().fail_next_delete();
    assert_matches!(
        sync.replace_body(&id, "new").await,
        Err(SyncError::Api(NotionError::Api { status: 503, .. }))
    );
    assert_eq!(sync.api().blocks(&id), vec![DocumentBlock::Paragraph("old".into())]);
}

#[tokio::test]
async fn append_failure_on_empty_document_is_plain_api_error() {
    let (sync, _) = memory_sync();
    let id = sync.create_document(COLLECTION, "report").await.unwrap();

    sync.api().fail_next_append();
    assert_matches!(
        sync.replace_body(&id, "new body").await,
        Err(SyncError::Api(NotionError::Api { status: 503, .. }))
    );
    assert!(sync.api().blocks(&id).is_empty());
}
