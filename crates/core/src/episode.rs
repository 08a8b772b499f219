//! Episode data model and the image artifact produced by the illustration
//! stage.

use std::io::Cursor;

use image::{ImageFormat, ImageReader};
use serde::{Deserialize, Serialize};

use crate::error::CoreError;

/// Output of the story stage: the episode text and the model's own account
/// of how it was written (best effort).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoryDraft {
    pub narrative_text: String,
    pub narrative_explanation: String,
}

/// A rendered illustration: encoded bytes plus header metadata.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageArtifact {
    bytes: Vec<u8>,
    format: ImageFormat,
    width: u32,
    height: u32,
}

impl ImageArtifact {
    /// Wrap encoded image bytes, sniffing format and dimensions from the
    /// header. Empty or undecodable payloads are rejected.
    pub fn from_bytes(bytes: Vec<u8>) -> Result<Self, CoreError> {
        if bytes.is_empty() {
            return Err(CoreError::InvalidImage("empty payload".to_string()));
        }

        let format = image::guess_format(&bytes)
            .map_err(|e| CoreError::InvalidImage(format!("unrecognised format: {e}")))?;

        let (width, height) = ImageReader::with_format(Cursor::new(&bytes), format)
            .into_dimensions()
            .map_err(|e| CoreError::InvalidImage(format!("unreadable {format:?} header: {e}")))?;

        Ok(Self {
            bytes,
            format,
            width,
            height,
        })
    }

    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }

    pub fn format(&self) -> ImageFormat {
        self.format
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    /// MIME type for upload headers, e.g. `image/png`.
    pub fn content_type(&self) -> &'static str {
        self.format.to_mime_type()
    }

    /// Preferred file extension without the dot, e.g. `png`.
    pub fn extension(&self) -> &'static str {
        self.format.extensions_str().first().copied().unwrap_or("bin")
    }

    pub fn info(&self) -> ImageInfo {
        ImageInfo {
            format: self.extension().to_string(),
            width: self.width,
            height: self.height,
        }
    }
}

/// Header metadata of a rendered illustration, kept after the bytes are gone.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImageInfo {
    /// File extension of the encoded format, e.g. `png`.
    pub format: String,
    pub width: u32,
    pub height: u32,
}

/// One fully generated episode, as described by its report.
#[derive(Debug, Clone)]
pub struct Episode {
    pub part_number: u32,
    pub narrative_text: String,
    pub narrative_explanation: String,
    pub illustration_prompt: String,
    /// `None` when the published illustration can no longer be inspected.
    pub image: Option<ImageInfo>,
}

#[cfg(test)]
pub(crate) mod test_images {
    /// A valid 1x1 RGBA PNG.
    pub const PNG_1X1: &[u8] = &[
        0x89, 0x50, 0x4E, 0x47, 0x0D, 0x0A, 0x1A, 0x0A, 0x00, 0x00, 0x00, 0x0D, 0x49, 0x48, 0x44,
        0x52, 0x00, 0x00, 0x00, 0x01, 0x00, 0x00, 0x00, 0x01, 0x08, 0x06, 0x00, 0x00, 0x00, 0x1F,
        0x15, 0xC4, 0x89, 0x00, 0x00, 0x00, 0x0D, 0x49, 0x44, 0x41, 0x54, 0x78, 0xDA, 0x63, 0x64,
        0x60, 0xF8, 0x5F, 0x0F, 0x00, 0x02, 0x87, 0x01, 0x80, 0xEB, 0x47, 0xBA, 0x92, 0x00, 0x00,
        0x00, 0x00, 0x49, 0x45, 0x4E, 0x44, 0xAE, 0x42, 0x60, 0x82,
    ];
}

#[cfg(test)]
mod tests {
    use assert_matches::assert_matches;

    use super::test_images::PNG_1X1;
    use super::*;

    #[test]
    fn png_header_is_sniffed() {
        let image = ImageArtifact::from_bytes(PNG_1X1.to_vec()).unwrap();
        assert_eq!(image.format(), ImageFormat::Png);
        assert_eq!((image.width(), image.height()), (1, 1));
        assert_eq!(image.content_type(), "image/png");
        assert_eq!(image.extension(), "png");
        assert_eq!(image.bytes(), PNG_1X1);
        assert_eq!(
            image.info(),
            ImageInfo {
                format: "png".into(),
                width: 1,
                height: 1
            }
        );
    }

    #[test]
    fn empty_payload_rejected() {
        assert_matches!(
            ImageArtifact::from_bytes(Vec::new()),
            Err(CoreError::InvalidImage(msg)) if msg.contains("empty")
        );
    }

    #[test]
    fn non_image_payload_rejected() {
        assert_matches!(
            ImageArtifact::from_bytes(b"dummy image content".to_vec()),
            Err(CoreError::InvalidImage(_))
        );
    }

    #[test]
    fn truncated_png_rejected() {
        assert_matches!(
            ImageArtifact::from_bytes(PNG_1X1[..12].to_vec()),
            Err(CoreError::InvalidImage(_))
        );
    }
}
