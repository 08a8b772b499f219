//! Checkpointed story pipeline.
//!
//! One call to [`Orchestrator::run_once`] produces and publishes at most
//! one episode:
//!
//! ```text
//! NONE -> INIT -> STORY_GENERATED -> PROMPT_GENERATED -> IMAGE_GENERATED -> SYNCED
//! ```
//!
//! The checkpoint is saved after every transition. A run that fails
//! leaves the in-flight episode in `pending`; the next run resumes from
//! the last completed step with the same part number and the same text.

use std::fmt;
use std::path::{Path, PathBuf};

use storyloom_core::checkpoint::{
    CheckpointError, CheckpointStore, EpisodeStage, PendingEpisode, PipelineCheckpoint,
};
use storyloom_core::episode::{Episode, ImageArtifact, StoryDraft};
use storyloom_core::error::CoreError;
use storyloom_core::naming::{
    episode_caption, illustration_file_name, narrative_title, report_title, story_id_for,
    NARRATIVE_OPENING,
};
use storyloom_core::report::render_report;
use storyloom_notion::{DocumentApi, DocumentSync, ImageAttachment, SyncError};

use crate::stages::{Stage, StageError};

// ---------------------------------------------------------------------------
// Outcome and errors
// ---------------------------------------------------------------------------

/// Step of an iteration, used to attribute failures.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PipelineStep {
    Init,
    Story,
    Prompt,
    Illustration,
    NarrativeSync,
    Report,
    Checkpoint,
}

impl PipelineStep {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Init => "init",
            Self::Story => "story",
            Self::Prompt => "prompt",
            Self::Illustration => "illustration",
            Self::NarrativeSync => "narrative_sync",
            Self::Report => "report",
            Self::Checkpoint => "checkpoint",
        }
    }
}

impl fmt::Display for PipelineStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Result of one [`Orchestrator::run_once`] call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IterationOutcome {
    Completed { story_id: String, part_number: u32 },
    Failed { stage: PipelineStep },
}

impl IterationOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self, Self::Completed { .. })
    }
}

#[derive(Debug, thiserror::Error)]
pub enum PipelineError {
    #[error("{step} stage failed")]
    Stage {
        step: PipelineStep,
        #[source]
        source: StageError,
    },

    #[error("Document sync failed during {step}")]
    Sync {
        step: PipelineStep,
        #[source]
        source: SyncError,
    },

    #[error("Failed to write illustration to {}", .path.display())]
    ImageWrite {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to save checkpoint")]
    Checkpoint(#[from] CheckpointError),

    #[error("Checkpoint state rejected")]
    State(#[from] CoreError),
}

impl PipelineError {
    /// Step the failure is attributed to.
    pub fn step(&self) -> PipelineStep {
        match self {
            Self::Stage { step, .. } | Self::Sync { step, .. } => *step,
            Self::ImageWrite { .. } => PipelineStep::Illustration,
            Self::Checkpoint(_) | Self::State(_) => PipelineStep::Checkpoint,
        }
    }
}

/// Collections the pipeline writes into.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Collections {
    /// Holds the running narrative documents.
    pub narrative: String,
    /// Holds per-episode reports.
    pub report: String,
}

// ---------------------------------------------------------------------------
// Orchestrator
// ---------------------------------------------------------------------------

pub struct Orchestrator<S, P, I, D> {
    story: S,
    prompt: P,
    illustration: I,
    sync: DocumentSync<D>,
    store: CheckpointStore,
    image_dir: PathBuf,
    collections: Collections,
}

impl<S, P, I, D> Orchestrator<S, P, I, D>
where
    S: Stage<(), StoryDraft>,
    P: Stage<String, String>,
    I: Stage<String, ImageArtifact>,
    D: DocumentApi,
{
    pub fn new(
        story: S,
        prompt: P,
        illustration: I,
        sync: DocumentSync<D>,
        store: CheckpointStore,
        image_dir: impl Into<PathBuf>,
        collections: Collections,
    ) -> Self {
        Self {
            story,
            prompt,
            illustration,
            sync,
            store,
            image_dir: image_dir.into(),
            collections,
        }
    }

    pub fn sync(&self) -> &DocumentSync<D> {
        &self.sync
    }

    pub fn checkpoint_store(&self) -> &CheckpointStore {
        &self.store
    }

    /// Run one iteration, logging any failure instead of returning it.
    pub async fn run_once(&self) -> IterationOutcome {
        match self.run_iteration().await {
            Ok(outcome) => outcome,
            Err(e) => {
                let stage = e.step();
                tracing::error!(
                    stage = %stage,
                    error = %error_chain(&e),
                    backtrace = %std::backtrace::Backtrace::force_capture(),
                    "Pipeline iteration failed",
                );
                IterationOutcome::Failed { stage }
            }
        }
    }

    /// Run one iteration, returning the first error.
    pub async fn run_iteration(&self) -> Result<IterationOutcome, PipelineError> {
        let mut checkpoint = self.store.load();

        if !checkpoint.is_bound() {
            self.init_story(&mut checkpoint).await?;
        }
        let (story_id, document_id) = bound_ids(&checkpoint)?;

        // STORY_GENERATED
        let in_flight = checkpoint
            .pending
            .as_ref()
            .map(|pending| (pending.part_number, pending.stage));
        match in_flight {
            Some((part_number, stage)) => tracing::info!(
                story_id = %story_id,
                part_number,
                stage = ?stage,
                "Resuming in-flight episode",
            ),
            None => {
                let draft = self
                    .story
                    .run(())
                    .await
                    .map_err(|source| stage_error(PipelineStep::Story, source))?;
                let pending = checkpoint
                    .begin_episode(draft.narrative_text, draft.narrative_explanation)?;
                tracing::info!(
                    story_id = %story_id,
                    part_number = pending.part_number,
                    stage = self.story.name(),
                    chars = pending.narrative_text.chars().count(),
                    "Episode text generated",
                );
                self.store.save(&checkpoint)?;
            }
        }

        // PROMPT_GENERATED
        let prompt = match pending_mut(&mut checkpoint)?.illustration_prompt.clone() {
            Some(prompt) => prompt,
            None => {
                let narrative_text = pending_mut(&mut checkpoint)?.narrative_text.clone();
                let prompt = self
                    .prompt
                    .run(narrative_text)
                    .await
                    .map_err(|source| stage_error(PipelineStep::Prompt, source))?;

                let pending = pending_mut(&mut checkpoint)?;
                pending.illustration_prompt = Some(prompt.clone());
                pending.stage = EpisodeStage::PromptGenerated;
                tracing::info!(
                    part_number = pending.part_number,
                    stage = self.prompt.name(),
                    prompt = %prompt,
                    "Illustration prompt generated",
                );
                self.store.save(&checkpoint)?;
                prompt
            }
        };

        // IMAGE_GENERATED. Once the narrative carries the image, only its
        // metadata is needed for the report.
        let stage = pending_mut(&mut checkpoint)?.stage;
        let image = if stage >= EpisodeStage::NarrativeSynced {
            None
        } else {
            let image = match load_saved_image(pending_mut(&mut checkpoint)?).await {
                Some(image) => image,
                None => {
                    let image = self
                        .illustration
                        .run(prompt.clone())
                        .await
                        .map_err(|source| stage_error(PipelineStep::Illustration, source))?;

                    let pending = pending_mut(&mut checkpoint)?;
                    let path = self.write_image(pending.part_number, &image).await?;
                    tracing::info!(
                        part_number = pending.part_number,
                        stage = self.illustration.name(),
                        path = %path.display(),
                        width = image.width(),
                        height = image.height(),
                        "Illustration generated",
                    );
                    pending.image_path = Some(path);
                    pending.image_info = Some(image.info());
                    if pending.stage < EpisodeStage::ImageGenerated {
                        pending.stage = EpisodeStage::ImageGenerated;
                    }
                    self.store.save(&checkpoint)?;
                    image
                }
            };
            Some(image)
        };

        // SYNCED: narrative first, then the report.
        if let Some(image) = &image {
            let pending = pending_mut(&mut checkpoint)?.clone();
            self.sync_narrative(
                &story_id,
                pending.part_number,
                &pending.narrative_text,
                image,
                &document_id,
            )
            .await?;

            let pending = pending_mut(&mut checkpoint)?;
            pending.stage = EpisodeStage::NarrativeSynced;
            pending.image_info = Some(image.info());
            self.store.save(&checkpoint)?;
        }

        let pending = pending_mut(&mut checkpoint)?.clone();
        if pending.image_info.is_none() {
            tracing::warn!(
                part_number = pending.part_number,
                "Illustration details unavailable, report omits them",
            );
        }
        let episode = Episode {
            part_number: pending.part_number,
            narrative_text: pending.narrative_text,
            narrative_explanation: pending.narrative_explanation,
            illustration_prompt: prompt,
            image: pending.image_info,
        };

        let report_id = self
            .sync
            .publish_document(
                &self.collections.report,
                &report_title(&story_id, episode.part_number),
                &render_report(&episode),
            )
            .await
            .map_err(|source| sync_error(PipelineStep::Report, source))?;

        let part_number = checkpoint.complete_episode()?;
        self.store.save(&checkpoint)?;

        tracing::info!(
            story_id = %story_id,
            part_number,
            document_id = %document_id,
            report_id = %report_id,
            "Episode published",
        );
        Ok(IterationOutcome::Completed {
            story_id,
            part_number,
        })
    }

    // ---- private helpers ----

    /// Mint a story, find or create its narrative document, and bind both.
    async fn init_story(&self, checkpoint: &mut PipelineCheckpoint) -> Result<(), PipelineError> {
        let story_id = story_id_for(chrono::Utc::now());
        let title = narrative_title(&story_id);
        let collection = &self.collections.narrative;

        let existing = self
            .sync
            .find_document_by_title(collection, &title)
            .await
            .map_err(|source| sync_error(PipelineStep::Init, source))?;

        let document_id = match existing {
            Some(id) => id,
            None => {
                let id = self
                    .sync
                    .create_document(collection, &title)
                    .await
                    .map_err(|source| sync_error(PipelineStep::Init, source))?;
                self.sync
                    .append_markup(&id, NARRATIVE_OPENING)
                    .await
                    .map_err(|source| sync_error(PipelineStep::Init, source))?;
                id
            }
        };

        checkpoint.start_story(story_id.clone(), document_id.clone())?;
        self.store.save(checkpoint)?;

        tracing::info!(story_id = %story_id, document_id = %document_id, "New story started");
        Ok(())
    }

    async fn sync_narrative(
        &self,
        story_id: &str,
        part_number: u32,
        narrative_text: &str,
        image: &ImageArtifact,
        document_id: &str,
    ) -> Result<(), PipelineError> {
        let caption = episode_caption(part_number);
        let resolved = self
            .sync
            .upsert_document_with_append(
                &self.collections.narrative,
                &narrative_title(story_id),
                narrative_text,
                Some(ImageAttachment {
                    image,
                    caption: Some(&caption),
                }),
            )
            .await
            .map_err(|source| sync_error(PipelineStep::NarrativeSync, source))?;

        if resolved != document_id {
            tracing::warn!(
                story_id,
                checkpoint_document_id = document_id,
                resolved_document_id = %resolved,
                "Narrative title resolved to a different document than the checkpoint",
            );
        }
        Ok(())
    }

    async fn write_image(
        &self,
        part_number: u32,
        image: &ImageArtifact,
    ) -> Result<PathBuf, PipelineError> {
        let path = self
            .image_dir
            .join(illustration_file_name(part_number, image.extension()));
        let write_error = |source| PipelineError::ImageWrite {
            path: path.clone(),
            source,
        };

        tokio::fs::create_dir_all(&self.image_dir)
            .await
            .map_err(write_error)?;
        tokio::fs::write(&path, image.bytes())
            .await
            .map_err(write_error)?;
        Ok(path)
    }
}

fn stage_error(step: PipelineStep, source: StageError) -> PipelineError {
    PipelineError::Stage { step, source }
}

fn sync_error(step: PipelineStep, source: SyncError) -> PipelineError {
    PipelineError::Sync { step, source }
}

fn bound_ids(checkpoint: &PipelineCheckpoint) -> Result<(String, String), CoreError> {
    match (&checkpoint.story_id, &checkpoint.document_id) {
        (Some(story_id), Some(document_id)) => Ok((story_id.clone(), document_id.clone())),
        _ => Err(CoreError::Invariant("no story bound".to_string())),
    }
}

fn pending_mut(checkpoint: &mut PipelineCheckpoint) -> Result<&mut PendingEpisode, CoreError> {
    checkpoint
        .pending
        .as_mut()
        .ok_or_else(|| CoreError::Invariant("no episode in flight".to_string()))
}

/// The illustration saved by an earlier run, if it is still readable.
async fn load_saved_image(pending: &PendingEpisode) -> Option<ImageArtifact> {
    let path = pending.image_path.as_deref()?;
    match read_image(path).await {
        Ok(image) => Some(image),
        Err(reason) => {
            tracing::warn!(
                part_number = pending.part_number,
                path = %path.display(),
                reason = %reason,
                "Saved illustration unusable, rendering again",
            );
            None
        }
    }
}

async fn read_image(path: &Path) -> Result<ImageArtifact, String> {
    let bytes = tokio::fs::read(path).await.map_err(|e| e.to_string())?;
    ImageArtifact::from_bytes(bytes).map_err(|e| e.to_string())
}

/// `error: cause: cause` rendering of an error and its sources.
fn error_chain(err: &dyn std::error::Error) -> String {
    let mut chain = err.to_string();
    let mut source = err.source();
    while let Some(cause) = source {
        chain.push_str(": ");
        chain.push_str(&cause.to_string());
        source = cause.source();
    }
    chain
}
