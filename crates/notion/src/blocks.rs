//! Conversion of [`DocumentBlock`]s into Notion block objects.

use serde_json::{json, Value};
use storyloom_core::markup::{DocumentBlock, HeadingLevel, MAX_SEGMENT_LENGTH};

/// Notion rich-text array for `text`.
///
/// Notion caps a single text run at [`MAX_SEGMENT_LENGTH`] characters, so
/// longer text becomes several consecutive runs in the same block.
pub fn rich_text(text: &str) -> Value {
    let chars: Vec<char> = text.chars().collect();
    let runs: Vec<Value> = chars
        .chunks(MAX_SEGMENT_LENGTH)
        .map(|run| {
            json!({
                "type": "text",
                "text": { "content": run.iter().collect::<String>() }
            })
        })
        .collect();
    Value::Array(runs)
}

/// Notion block object for `block`.
pub fn block_to_json(block: &DocumentBlock) -> Value {
    match block {
        DocumentBlock::Heading { level, text } => {
            let kind = match level {
                HeadingLevel::One => "heading_1",
                HeadingLevel::Two => "heading_2",
                HeadingLevel::Three => "heading_3",
            };
            text_block(kind, text)
        }
        DocumentBlock::BulletedItem(text) => text_block("bulleted_list_item", text),
        DocumentBlock::Paragraph(text) => text_block("paragraph", text),
        DocumentBlock::Image { url, caption } => json!({
            "object": "block",
            "type": "image",
            "image": {
                "type": "external",
                "external": { "url": url },
                "caption": rich_text(caption.as_deref().unwrap_or_default()),
            }
        }),
    }
}

fn text_block(kind: &str, text: &str) -> Value {
    json!({
        "object": "block",
        "type": kind,
        kind: { "rich_text": rich_text(text) }
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn heading_levels_map_to_block_types() {
        for (level, kind) in [
            (HeadingLevel::One, "heading_1"),
            (HeadingLevel::Two, "heading_2"),
            (HeadingLevel::Three, "heading_3"),
        ] {
            let json = block_to_json(&DocumentBlock::Heading {
                level,
                text: "Title".into(),
            });
            assert_eq!(json["type"], kind);
            assert_eq!(json[kind]["rich_text"][0]["text"]["content"], "Title");
        }
    }

    #[test]
    fn bullet_and_paragraph() {
        let bullet = block_to_json(&DocumentBlock::BulletedItem("item".into()));
        assert_eq!(bullet["type"], "bulleted_list_item");
        assert_eq!(bullet["bulleted_list_item"]["rich_text"][0]["text"]["content"], "item");

        let paragraph = block_to_json(&DocumentBlock::Paragraph("body".into()));
        assert_eq!(paragraph["paragraph"]["rich_text"][0]["text"]["content"], "body");
    }

    #[test]
    fn long_text_becomes_several_runs() {
        let text = "あ".repeat(MAX_SEGMENT_LENGTH * 2 + 1);
        let runs = rich_text(&text);
        let runs = runs.as_array().unwrap();
        assert_eq!(runs.len(), 3);
        assert_eq!(
            runs[0]["text"]["content"].as_str().unwrap().chars().count(),
            MAX_SEGMENT_LENGTH
        );
        let joined: String = runs
            .iter()
            .map(|run| run["text"]["content"].as_str().unwrap())
            .collect();
        assert_eq!(joined, text);
    }

    #[test]
    fn image_is_external_with_caption() {
        let json = block_to_json(&DocumentBlock::Image {
            url: "https://bucket/img.png".into(),
            caption: Some("Part 1".into()),
        });
        assert_eq!(json["type"], "image");
        assert_eq!(json["image"]["type"], "external");
        assert_eq!(json["image"]["external"]["url"], "https://bucket/img.png");
        assert_eq!(json["image"]["caption"][0]["text"]["content"], "Part 1");
    }

    #[test]
    fn image_without_caption_has_empty_caption() {
        let json = block_to_json(&DocumentBlock::Image {
            url: "u".into(),
            caption: None,
        });
        assert_eq!(json["image"]["caption"], json!([]));
    }
}
