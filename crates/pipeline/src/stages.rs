//! Content stage chain: story text -> illustration prompt -> image.
//!
//! Every stage implements [`Stage`]; the orchestrator is generic over the
//! three concrete stages so tests can substitute fakes.

use std::future::Future;

use storyloom_comfyui::{ComfyUIApi, ComfyUIApiError, PollConfig, Txt2ImgRequest};
use storyloom_core::episode::{ImageArtifact, StoryDraft};
use storyloom_core::error::CoreError;
use storyloom_llm::{ChatClient, ChatMessage, ChatRequest, ImageClient, ImageGenerationRequest, LlmError};

use crate::prompts::{
    illustration_user_prompt, ILLUSTRATION_SYSTEM_PROMPT, PROCESS_MARKER, STORY_MARKER,
    STORY_SYSTEM_PROMPT, STORY_USER_PROMPT,
};

// ---------------------------------------------------------------------------
// Constants
// ---------------------------------------------------------------------------

/// Explanation used when the story response carries no usable markers.
pub const MISSING_EXPLANATION: &str = "Details of the generation process are not available.";

/// Content the illustration backends are asked to avoid.
pub const NEGATIVE_PROMPT: &str = "blurry, low quality, low resolution, deformed, disfigured, \
bad anatomy, ugly, bad proportions, extra limbs, NSFW, inappropriate content";

/// Illustration prompts longer than this are logged but still used.
pub const PROMPT_WORD_LIMIT: usize = 100;

const STORY_TEMPERATURE: f32 = 0.7;
const STORY_MAX_TOKENS: u32 = 2000;
const PROMPT_MAX_TOKENS: u32 = 200;

// ---------------------------------------------------------------------------
// Stage trait
// ---------------------------------------------------------------------------

#[derive(Debug, thiserror::Error)]
pub enum StageError {
    #[error(transparent)]
    Llm(#[from] LlmError),

    #[error(transparent)]
    ComfyUi(#[from] ComfyUIApiError),

    #[error("Generated image rejected: {0}")]
    InvalidImage(#[from] CoreError),

    #[error("Stage produced no usable {0}")]
    EmptyOutput(&'static str),
}

/// One step of the content chain.
pub trait Stage<In, Out>: Send + Sync {
    /// Short name used in logs.
    fn name(&self) -> &'static str;

    fn run(&self, input: In) -> impl Future<Output = Result<Out, StageError>> + Send;
}

// ---------------------------------------------------------------------------
// Response shaping
// ---------------------------------------------------------------------------

/// Split a story response into narrative text and explanation.
///
/// Uses the `STORY:` / `GENERATION_PROCESS:` markers when both are present
/// in that order; otherwise the whole response is the narrative and the
/// explanation is [`MISSING_EXPLANATION`]. Never fails.
pub fn split_story_response(raw: &str) -> StoryDraft {
    let story = raw.find(STORY_MARKER);
    let process = raw.find(PROCESS_MARKER);

    match (story, process) {
        (Some(story), Some(process)) if process > story => StoryDraft {
            narrative_text: raw[story + STORY_MARKER.len()..process].trim().to_string(),
            narrative_explanation: raw[process + PROCESS_MARKER.len()..].trim().to_string(),
        },
        _ => StoryDraft {
            narrative_text: raw.trim().to_string(),
            narrative_explanation: MISSING_EXPLANATION.to_string(),
        },
    }
}

const QUOTE_PAIRS: [(char, char); 3] = [('"', '"'), ('\'', '\''), ('\u{201C}', '\u{201D}')];

/// Reduce a chat answer to a single prompt line: the first non-blank line,
/// trimmed, with one pair of wrapping quotes removed.
pub fn clean_prompt(raw: &str) -> Option<String> {
    let line = raw.lines().map(str::trim).find(|line| !line.is_empty())?;

    let unquoted = QUOTE_PAIRS
        .iter()
        .find_map(|&(open, close)| {
            line.strip_prefix(open)
                .and_then(|rest| rest.strip_suffix(close))
        })
        .map(str::trim)
        .unwrap_or(line);

    (!unquoted.is_empty()).then(|| unquoted.to_string())
}

// ---------------------------------------------------------------------------
// Story stage
// ---------------------------------------------------------------------------

/// Generates the next episode's text.
#[derive(Debug, Clone)]
pub struct StoryStage {
    chat: ChatClient,
    model: String,
}

impl StoryStage {
    pub fn new(chat: ChatClient, model: String) -> Self {
        Self { chat, model }
    }
}

impl Stage<(), StoryDraft> for StoryStage {
    fn name(&self) -> &'static str {
        "story"
    }

    async fn run(&self, _input: ()) -> Result<StoryDraft, StageError> {
        let request = ChatRequest {
            model: self.model.clone(),
            messages: vec![
                ChatMessage::system(STORY_SYSTEM_PROMPT),
                ChatMessage::user(STORY_USER_PROMPT),
            ],
            temperature: Some(STORY_TEMPERATURE),
            max_tokens: Some(STORY_MAX_TOKENS),
        };
        let raw = self.chat.complete(&request).await?;

        let draft = split_story_response(&raw);
        if draft.narrative_text.is_empty() {
            return Err(StageError::EmptyOutput("story text"));
        }
        if draft.narrative_explanation == MISSING_EXPLANATION {
            tracing::warn!("Story response lacks section markers, using whole text");
        }
        Ok(draft)
    }
}

// ---------------------------------------------------------------------------
// Prompt stage
// ---------------------------------------------------------------------------

/// Turns episode text into a single English illustration prompt.
#[derive(Debug, Clone)]
pub struct PromptStage {
    chat: ChatClient,
    model: String,
}

impl PromptStage {
    pub fn new(chat: ChatClient, model: String) -> Self {
        Self { chat, model }
    }
}

impl Stage<String, String> for PromptStage {
    fn name(&self) -> &'static str {
        "prompt"
    }

    async fn run(&self, narrative_text: String) -> Result<String, StageError> {
        let request = ChatRequest {
            model: self.model.clone(),
            messages: vec![
                ChatMessage::system(ILLUSTRATION_SYSTEM_PROMPT),
                ChatMessage::user(illustration_user_prompt(&narrative_text)),
            ],
            temperature: None,
            max_tokens: Some(PROMPT_MAX_TOKENS),
        };
        let raw = self.chat.complete(&request).await?;

        let prompt = clean_prompt(&raw).ok_or(StageError::EmptyOutput("illustration prompt"))?;
        let words = prompt.split_whitespace().count();
        if words > PROMPT_WORD_LIMIT {
            tracing::warn!(words, limit = PROMPT_WORD_LIMIT, "Illustration prompt is long");
        }
        Ok(prompt)
    }
}

// ---------------------------------------------------------------------------
// Illustration stage
// ---------------------------------------------------------------------------

/// Image generation service used by [`IllustrationStage`].
#[derive(Debug, Clone)]
pub enum ImageBackend {
    ComfyUi {
        api: ComfyUIApi,
        checkpoint: String,
        steps: u32,
        guidance: f32,
        seed: u64,
        poll: PollConfig,
    },
    OpenAi {
        client: ImageClient,
        model: String,
    },
}

/// Renders the illustration for a prompt at a fixed pixel size.
#[derive(Debug, Clone)]
pub struct IllustrationStage {
    backend: ImageBackend,
    width: u32,
    height: u32,
}

impl IllustrationStage {
    pub fn new(backend: ImageBackend, width: u32, height: u32) -> Self {
        Self {
            backend,
            width,
            height,
        }
    }

    async fn render(&self, prompt: String) -> Result<Vec<u8>, StageError> {
        match &self.backend {
            ImageBackend::ComfyUi {
                api,
                checkpoint,
                steps,
                guidance,
                seed,
                poll,
            } => {
                let request = Txt2ImgRequest {
                    positive_prompt: prompt,
                    negative_prompt: NEGATIVE_PROMPT.to_string(),
                    width: self.width,
                    height: self.height,
                    steps: *steps,
                    cfg: *guidance,
                    seed: *seed,
                    checkpoint: checkpoint.clone(),
                };
                Ok(api.generate_image(&request, *poll).await?)
            }
            ImageBackend::OpenAi { client, model } => {
                tracing::debug!("Image backend has no negative prompt support, ignoring it");
                let request =
                    ImageGenerationRequest::single(model.clone(), prompt, self.width, self.height);
                Ok(client.generate(&request).await?)
            }
        }
    }
}

impl Stage<String, ImageArtifact> for IllustrationStage {
    fn name(&self) -> &'static str {
        "illustration"
    }

    async fn run(&self, prompt: String) -> Result<ImageArtifact, StageError> {
        let bytes = self.render(prompt).await?;
        let image = ImageArtifact::from_bytes(bytes)?;

        if image.width() != self.width || image.height() != self.height {
            tracing::warn!(
                requested = %format!("{}x{}", self.width, self.height),
                actual = %format!("{}x{}", image.width(), image.height()),
                "Illustration size differs from request",
            );
        }
        Ok(image)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
