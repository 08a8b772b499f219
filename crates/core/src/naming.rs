//! Naming rules for stories, documents, and local artifacts.
//!
//! Documents are addressed by exact title, so these functions are the
//! lookup keys: changing a format orphans existing documents.

use chrono::{DateTime, NaiveDate, Utc};

/// Prefix of every generated story identifier.
pub const STORY_ID_PREFIX: &str = "story_";

/// Timestamp layout used in story identifiers.
const STORY_ID_TIME_FORMAT: &str = "%Y%m%d_%H%M%S";

/// Heading written to a freshly created narrative document.
pub const NARRATIVE_OPENING: &str = "## Story Start";

/// Mint a story identifier, e.g. `story_20250101_000000`.
pub fn story_id_for(now: DateTime<Utc>) -> String {
    format!("{STORY_ID_PREFIX}{}", now.format(STORY_ID_TIME_FORMAT))
}

/// True if `id` has the shape produced by [`story_id_for`].
pub fn is_story_id(id: &str) -> bool {
    id.strip_prefix(STORY_ID_PREFIX)
        .and_then(|stamp| chrono::NaiveDateTime::parse_from_str(stamp, STORY_ID_TIME_FORMAT).ok())
        .is_some()
}

/// Title of the running narrative document for a story.
pub fn narrative_title(story_id: &str) -> String {
    format!("Serial Story - {story_id}")
}

/// Title of the per-episode generation report.
pub fn report_title(story_id: &str, part_number: u32) -> String {
    format!("Daily Report - {story_id} - Part {part_number}")
}

/// Title of a daily summary document, e.g. `2025-01-01`.
pub fn daily_title(date: NaiveDate) -> String {
    date.format("%Y-%m-%d").to_string()
}

/// Local file name of an episode illustration.
pub fn illustration_file_name(part_number: u32, extension: &str) -> String {
    format!("illustration_part_{part_number}.{extension}")
}

/// Caption attached to an episode's image block.
pub fn episode_caption(part_number: u32) -> String {
    format!("Part {part_number}")
}
