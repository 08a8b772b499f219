//! Durable pipeline progress record and its crash-safe file store.
//!
//! The checkpoint is rewritten after every state transition of the
//! orchestrator. Writes go through a temp file in the target directory
//! followed by an atomic rename, so a crash leaves either the previous
//! record or the new one on disk, never a torn file.
//!
//! Reads are forgiving: a missing, unreadable, or malformed file yields a
//! zero-valued checkpoint (a fresh story), never an error.

use std::io::Write;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tempfile::NamedTempFile;

use crate::episode::ImageInfo;
use crate::error::CoreError;

// ---------------------------------------------------------------------------
// Constants
// ---------------------------------------------------------------------------

/// Default location of the checkpoint file, relative to the working directory.
pub const DEFAULT_CHECKPOINT_PATH: &str = "data/state.json";

// ---------------------------------------------------------------------------
// Data types
// ---------------------------------------------------------------------------

/// Last stage completed for the in-flight episode.
///
/// Ordered: each variant implies all earlier ones are done.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EpisodeStage {
    StoryGenerated,
    PromptGenerated,
    ImageGenerated,
    /// Episode text and image are in the narrative document; only the
    /// report remains.
    NarrativeSynced,
}

/// An episode whose part number has been reserved but which has not yet
/// been fully published.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PendingEpisode {
    /// Part number reserved for this episode (`part_number + 1` at reservation).
    pub part_number: u32,
    pub stage: EpisodeStage,
    pub narrative_text: String,
    pub narrative_explanation: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub illustration_prompt: Option<String>,
    /// Local path of the rendered illustration.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image_path: Option<PathBuf>,
    /// Metadata of the rendered illustration, for the report.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image_info: Option<ImageInfo>,
}

/// Durable record of pipeline progress.
///
/// Serialized as `{"story_id", "notion_page_id", "part_number"}` with an
/// optional `"pending"` object.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PipelineCheckpoint {
    pub story_id: Option<String>,
    /// Identifier of the running narrative document.
    #[serde(rename = "notion_page_id", alias = "document_id")]
    pub document_id: Option<String>,
    /// Number of fully published episodes.
    pub part_number: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pending: Option<PendingEpisode>,
}

impl PipelineCheckpoint {
    /// True when both a story and its narrative document are bound.
    pub fn is_bound(&self) -> bool {
        self.story_id.is_some() && self.document_id.is_some()
    }

    /// Bind a new story and its narrative document.
    ///
    /// A half-bound record (story without document, or the reverse) is
    /// treated as no story at all and is replaced. A fully bound record
    /// is never rebound.
    pub fn start_story(&mut self, story_id: String, document_id: String) -> Result<(), CoreError> {
        if self.is_bound() {
            return Err(CoreError::Invariant(format!(
                "story {} is already bound to document {}",
                self.story_id.as_deref().unwrap_or_default(),
                self.document_id.as_deref().unwrap_or_default(),
            )));
        }
        *self = Self {
            story_id: Some(story_id),
            document_id: Some(document_id),
            part_number: 0,
            pending: None,
        };
        Ok(())
    }

    /// Reserve the next part number for a freshly generated story text.
    pub fn begin_episode(
        &mut self,
        narrative_text: String,
        narrative_explanation: String,
    ) -> Result<&mut PendingEpisode, CoreError> {
        if let Some(pending) = &self.pending {
            return Err(CoreError::Invariant(format!(
                "part {} is still in flight",
                pending.part_number
            )));
        }
        Ok(self.pending.insert(PendingEpisode {
            part_number: self.part_number + 1,
            stage: EpisodeStage::StoryGenerated,
            narrative_text,
            narrative_explanation,
            illustration_prompt: None,
            image_path: None,
            image_info: None,
        }))
    }

    /// Commit the in-flight episode: advance `part_number` by one and clear
    /// the pending record. Returns the new part number.
    pub fn complete_episode(&mut self) -> Result<u32, CoreError> {
        let pending = self
            .pending
            .take()
            .ok_or_else(|| CoreError::Invariant("no episode in flight".to_string()))?;

        if pending.part_number != self.part_number + 1 {
            let part = pending.part_number;
            self.pending = Some(pending);
            return Err(CoreError::Invariant(format!(
                "pending part {part} does not follow completed part {}",
                self.part_number
            )));
        }

        self.part_number = pending.part_number;
        Ok(self.part_number)
    }
}

// ---------------------------------------------------------------------------
// Store
// ---------------------------------------------------------------------------

/// Errors from persisting a checkpoint.
#[derive(Debug, thiserror::Error)]
pub enum CheckpointError {
    #[error("Checkpoint I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Checkpoint serialization error: {0}")]
    Serialize(#[from] serde_json::Error),
}

/// File-backed checkpoint store. Assumes a single writer.
#[derive(Debug, Clone)]
pub struct CheckpointStore {
    path: PathBuf,
}

impl CheckpointStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Load the checkpoint, falling back to a zero-valued record when the
    /// file is absent or cannot be parsed.
    pub fn load(&self) -> PipelineCheckpoint {
        let raw = match std::fs::read_to_string(&self.path) {
            Ok(raw) => raw,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::debug!(path = %self.path.display(), "No checkpoint found, starting fresh");
                return PipelineCheckpoint::default();
            }
            Err(e) => {
                tracing::warn!(
                    path = %self.path.display(),
                    error = %e,
                    "Checkpoint unreadable, starting fresh",
                );
                return PipelineCheckpoint::default();
            }
        };

        match serde_json::from_str::<PipelineCheckpoint>(&raw) {
            Ok(checkpoint) => checkpoint,
            Err(e) => {
                tracing::warn!(
                    path = %self.path.display(),
                    error = %e,
                    "Checkpoint corrupt, starting fresh",
                );
                PipelineCheckpoint::default()
            }
        }
    }

    /// Atomically replace the checkpoint file with `checkpoint`.
    pub fn save(&self, checkpoint: &PipelineCheckpoint) -> Result<(), CheckpointError> {
        let body = serde_json::to_vec_pretty(checkpoint)?;

        let dir = match self.path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent,
            _ => Path::new("."),
        };
        std::fs::create_dir_all(dir)?;

        let mut temp = NamedTempFile::new_in(dir)?;
        temp.write_all(&body)?;
        temp.as_file().sync_all()?;
        temp.persist(&self.path).map_err(|e| e.error)?;

        tracing::debug!(
            path = %self.path.display(),
            story_id = checkpoint.story_id.as_deref().unwrap_or("-"),
            part_number = checkpoint.part_number,
            pending = checkpoint.pending.as_ref().map(|p| p.part_number),
            "Checkpoint saved",
        );
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
