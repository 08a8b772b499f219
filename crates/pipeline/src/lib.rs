//! Story pipeline: content stages, configuration, and the checkpointed
//! orchestrator that ties them to the document sync engine.

pub mod config;
pub mod orchestrator;
pub mod prompts;
pub mod stages;

pub use config::{ConfigError, ImageBackendKind, ImageConfig, PipelineConfig};
pub use orchestrator::{Collections, IterationOutcome, Orchestrator, PipelineError, PipelineStep};
pub use stages::{
    IllustrationStage, ImageBackend, PromptStage, Stage, StageError, StoryStage,
};
