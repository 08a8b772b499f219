//! Lightweight markup to document-block translation.
//!
//! Documents are built from a tiny line-oriented markup:
//!
//! | Prefix  | Block              |
//! |---------|--------------------|
//! | `# `    | heading level 1    |
//! | `## `   | heading level 2    |
//! | `### `  | heading level 3    |
//! | `- `    | bulleted list item |
//! | other   | paragraph          |
//!
//! Blank lines are dropped. Prefixes are matched after trimming the line.

use crate::error::CoreError;

// ---------------------------------------------------------------------------
// Constants
// ---------------------------------------------------------------------------

/// Per-block content ceiling of the remote document API, in characters.
pub const MAX_SEGMENT_LENGTH: usize = 2000;

// ---------------------------------------------------------------------------
// Block model
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HeadingLevel {
    One,
    Two,
    Three,
}

impl HeadingLevel {
    pub fn as_u8(self) -> u8 {
        match self {
            Self::One => 1,
            Self::Two => 2,
            Self::Three => 3,
        }
    }
}

/// Atomic unit of a remote document's content.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DocumentBlock {
    Heading { level: HeadingLevel, text: String },
    BulletedItem(String),
    Paragraph(String),
    Image { url: String, caption: Option<String> },
}

impl DocumentBlock {
    /// Text carried by the block (caption for images).
    pub fn text(&self) -> Option<&str> {
        match self {
            Self::Heading { text, .. } | Self::BulletedItem(text) | Self::Paragraph(text) => {
                Some(text)
            }
            Self::Image { caption, .. } => caption.as_deref(),
        }
    }
}

// ---------------------------------------------------------------------------
// Line parser
// ---------------------------------------------------------------------------

/// Classification of a single markup line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MarkupLine<'a> {
    Heading(HeadingLevel, &'a str),
    BulletItem(&'a str),
    Paragraph(&'a str),
    Blank,
}

/// Checked longest first.
const HEADING_PREFIXES: [(&str, HeadingLevel); 3] = [
    ("### ", HeadingLevel::Three),
    ("## ", HeadingLevel::Two),
    ("# ", HeadingLevel::One),
];

const BULLET_PREFIX: &str = "- ";

impl<'a> MarkupLine<'a> {
    pub fn parse(line: &'a str) -> Self {
        let line = line.trim();
        if line.is_empty() {
            return Self::Blank;
        }
        for (prefix, level) in HEADING_PREFIXES {
            if let Some(rest) = line.strip_prefix(prefix) {
                return Self::Heading(level, rest.trim_start());
            }
        }
        if let Some(rest) = line.strip_prefix(BULLET_PREFIX) {
            return Self::BulletItem(rest.trim_start());
        }
        Self::Paragraph(line)
    }

    pub fn into_block(self) -> Option<DocumentBlock> {
        match self {
            Self::Heading(level, text) => Some(DocumentBlock::Heading {
                level,
                text: text.to_string(),
            }),
            Self::BulletItem(text) => Some(DocumentBlock::BulletedItem(text.to_string())),
            Self::Paragraph(text) => Some(DocumentBlock::Paragraph(text.to_string())),
            Self::Blank => None,
        }
    }
}

/// Translate markup into an ordered block sequence.
pub fn parse_markup(content: &str) -> Vec<DocumentBlock> {
    content
        .lines()
        .filter_map(|line| MarkupLine::parse(line).into_block())
        .collect()
}

// ---------------------------------------------------------------------------
// Segmentation
// ---------------------------------------------------------------------------

/// Split `text` into consecutive chunks of at most `max_len` characters.
///
/// The split is a hard character boundary, not word-aware. Concatenating
/// the result yields `text` exactly; an empty input yields no segments.
pub fn split_segments(text: &str, max_len: usize) -> Result<Vec<String>, CoreError> {
    if max_len == 0 {
        return Err(CoreError::Validation(
            "max segment length must be at least 1".to_string(),
        ));
    }

    let mut segments = Vec::with_capacity(text.len() / max_len + 1);
    let mut current = String::new();
    let mut count = 0;
    for ch in text.chars() {
        if count == max_len {
            segments.push(std::mem::take(&mut current));
            count = 0;
        }
        current.push(ch);
        count += 1;
    }
    if !current.is_empty() {
        segments.push(current);
    }
    Ok(segments)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
