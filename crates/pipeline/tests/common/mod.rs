use std::collections::VecDeque;
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use storyloom_cloud::MemoryObjectStore;
use storyloom_core::checkpoint::CheckpointStore;
use storyloom_core::episode::{ImageArtifact, StoryDraft};
use storyloom_notion::{DocumentSync, MemoryDocumentApi};
use storyloom_pipeline::{Collections, Orchestrator, Stage, StageError};

pub const NARRATIVE_COLLECTION: &str = "db-narrative";
pub const REPORT_COLLECTION: &str = "db-report";

/// A valid 1x1 RGBA PNG.
pub const PNG_1X1: [u8; 70] = [
    0x89, 0x50, 0x4E, 0x47, 0x0D, 0x0A, 0x1A, 0x0A, 0x00, 0x00, 0x00, 0x0D, 0x49, 0x48, 0x44,
    0x52, 0x00, 0x00, 0x00, 0x01, 0x00, 0x00, 0x00, 0x01, 0x08, 0x06, 0x00, 0x00, 0x00, 0x1F,
    0x15, 0xC4, 0x89, 0x00, 0x00, 0x00, 0x0D, 0x49, 0x44, 0x41, 0x54, 0x78, 0xDA, 0x63, 0x64,
    0x60, 0xF8, 0x5F, 0x0F, 0x00, 0x02, 0x87, 0x01, 0x80, 0xEB, 0x47, 0xBA, 0x92, 0x00, 0x00,
    0x00, 0x00, 0x49, 0x45, 0x4E, 0x44, 0xAE, 0x42, 0x60, 0x82,
];

// ---------------------------------------------------------------------------
// Fake stages
// ---------------------------------------------------------------------------

/// Returns numbered drafts: "Episode text 1", "Episode text 2", ...
#[derive(Default, Clone)]
pub struct FakeStory {
    pub calls: Arc<AtomicUsize>,
}

impl Stage<(), StoryDraft> for FakeStory {
    fn name(&self) -> &'static str {
        "fake-story"
    }

    async fn run(&self, _input: ()) -> Result<StoryDraft, StageError> {
        let n = self.calls.fetch_add(1, Ordering::SeqCst) + 1;
        Ok(StoryDraft {
            narrative_text: format!("Episode text {n}"),
            narrative_explanation: format!("Explanation {n}"),
        })
    }
}

/// Echoes a prompt derived from the narrative text.
#[derive(Default, Clone)]
pub struct FakePrompt {
    pub calls: Arc<AtomicUsize>,
}

impl Stage<String, String> for FakePrompt {
    fn name(&self) -> &'static str {
        "fake-prompt"
    }

    async fn run(&self, narrative_text: String) -> Result<String, StageError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(format!("masterpiece, illustration of {narrative_text}"))
    }
}

/// Returns the 1x1 PNG, or a scripted failure.
#[derive(Default, Clone)]
pub struct FakeIllustration {
    pub calls: Arc<AtomicUsize>,
    failures: Arc<Mutex<VecDeque<bool>>>,
}

impl FakeIllustration {
    /// Make the next call fail.
    pub fn fail_next(&self) {
        self.failures.lock().unwrap().push_back(true);
    }
}

impl Stage<String, ImageArtifact> for FakeIllustration {
    fn name(&self) -> &'static str {
        "fake-illustration"
    }

    async fn run(&self, _prompt: String) -> Result<ImageArtifact, StageError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let fail = self.failures.lock().unwrap().pop_front().unwrap_or(false);
        if fail {
            return Err(StageError::EmptyOutput("image"));
        }
        Ok(ImageArtifact::from_bytes(PNG_1X1.to_vec())?)
    }
}

// ---------------------------------------------------------------------------
// Harness
// ---------------------------------------------------------------------------

pub type TestOrchestrator =
    Orchestrator<FakeStory, FakePrompt, FakeIllustration, MemoryDocumentApi>;

pub struct Harness {
    pub story: FakeStory,
    pub prompt: FakePrompt,
    pub illustration: FakeIllustration,
    pub objects: Arc<MemoryObjectStore>,
}

impl Harness {
    pub fn new() -> Self {
        Self {
            story: FakeStory::default(),
            prompt: FakePrompt::default(),
            illustration: FakeIllustration::default(),
            objects: Arc::new(MemoryObjectStore::new()),
        }
    }

    /// Orchestrator writing its checkpoint and images under `dir`.
    pub fn orchestrator(&self, dir: &Path, api: MemoryDocumentApi) -> TestOrchestrator {
        Orchestrator::new(
            self.story.clone(),
            self.prompt.clone(),
            self.illustration.clone(),
            DocumentSync::new(api, self.objects.clone()),
            CheckpointStore::new(dir.join("state.json")),
            dir.join("img"),
            Collections {
                narrative: NARRATIVE_COLLECTION.to_string(),
                report: REPORT_COLLECTION.to_string(),
            },
        )
    }
}

pub fn story_calls(harness: &Harness) -> usize {
    harness.story.calls.load(Ordering::SeqCst)
}

pub fn illustration_calls(harness: &Harness) -> usize {
    harness.illustration.calls.load(Ordering::SeqCst)
}
