//! Wiring of concrete clients into the pipeline, and the subcommand bodies.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::Context;
use storyloom_cloud::S3ObjectStore;
use storyloom_comfyui::ComfyUIApi;
use storyloom_core::checkpoint::{CheckpointStore, DEFAULT_CHECKPOINT_PATH};
use storyloom_core::naming::daily_title;
use storyloom_llm::{ChatClient, ImageClient};
use storyloom_notion::{DocumentSync, NotionClient};
use storyloom_pipeline::{
    Collections, IllustrationStage, ImageBackend, ImageBackendKind, IterationOutcome,
    Orchestrator, PipelineConfig, PromptStage, StoryStage,
};

pub type LiveOrchestrator = Orchestrator<StoryStage, PromptStage, IllustrationStage, NotionClient>;

/// Stage that renders illustrations with the configured backend.
pub fn illustration_stage(client: &reqwest::Client, config: &PipelineConfig) -> IllustrationStage {
    let image = &config.image;
    let backend = match image.backend {
        ImageBackendKind::ComfyUi => ImageBackend::ComfyUi {
            api: ComfyUIApi::with_client(client.clone(), image.comfyui_url.clone()),
            checkpoint: image.comfyui_checkpoint.clone(),
            steps: image.steps,
            guidance: image.guidance,
            seed: image.seed,
            poll: image.comfyui_poll,
        },
        ImageBackendKind::OpenAi => ImageBackend::OpenAi {
            client: ImageClient::with_client(
                client.clone(),
                config.openai_api_key.clone(),
                config.openai_base_url.clone(),
            ),
            model: image.openai_model.clone(),
        },
    };
    IllustrationStage::new(backend, image.width, image.height)
}

/// Document sync engine over Notion and S3.
pub async fn document_sync(
    client: &reqwest::Client,
    config: &PipelineConfig,
) -> DocumentSync<NotionClient> {
    let notion = NotionClient::with_client(
        client.clone(),
        storyloom_notion::client::DEFAULT_BASE_URL.to_string(),
        config.notion_token.clone(),
        config.notion_title_property.clone(),
    );
    let store = S3ObjectStore::connect(config.s3_bucket.clone(), config.aws_region.clone()).await;

    DocumentSync::new(notion, Arc::new(store))
        .with_key_prefix(config.s3_key_prefix.clone())
        .with_url_expiry(config.url_expiry)
}

/// Build the production orchestrator from `config`.
pub async fn build_orchestrator(config: &PipelineConfig) -> LiveOrchestrator {
    let client = reqwest::Client::new();
    let chat = ChatClient::with_client(
        client.clone(),
        config.openai_api_key.clone(),
        config.openai_base_url.clone(),
    );

    Orchestrator::new(
        StoryStage::new(chat.clone(), config.story_model.clone()),
        PromptStage::new(chat, config.prompt_model.clone()),
        illustration_stage(&client, config),
        document_sync(&client, config).await,
        CheckpointStore::new(&config.checkpoint_path),
        &config.image_output_dir,
        Collections {
            narrative: config.notion_database_id.clone(),
            report: config.notion_report_database_id.clone(),
        },
    )
}

// ---------------------------------------------------------------------------
// Subcommands
// ---------------------------------------------------------------------------

/// Run one pipeline iteration.
pub async fn run() -> anyhow::Result<IterationOutcome> {
    let config = PipelineConfig::from_env().context("Failed to load configuration")?;
    tracing::info!(?config, "Starting pipeline iteration");

    let orchestrator = build_orchestrator(&config).await;
    let outcome = orchestrator.run_once().await;

    match &outcome {
        IterationOutcome::Completed {
            story_id,
            part_number,
        } => tracing::info!(%story_id, part_number, "Pipeline iteration completed"),
        IterationOutcome::Failed { stage } => {
            tracing::warn!(%stage, "Pipeline iteration stopped; next run resumes from checkpoint")
        }
    }
    Ok(outcome)
}

/// Checkpoint location, from `CHECKPOINT_PATH` or the default.
pub fn checkpoint_path() -> PathBuf {
    std::env::var("CHECKPOINT_PATH")
        .ok()
        .filter(|p| !p.trim().is_empty())
        .unwrap_or_else(|| DEFAULT_CHECKPOINT_PATH.to_string())
        .into()
}

/// Render the checkpoint at `path` as pretty JSON.
pub fn status(path: &Path) -> anyhow::Result<String> {
    let checkpoint = CheckpointStore::new(path).load();
    serde_json::to_string_pretty(&checkpoint).context("Failed to serialize checkpoint")
}

/// Publish a markup file into the report collection. Returns the document id.
pub async fn publish(file: &Path, title: Option<String>) -> anyhow::Result<String> {
    let content = tokio::fs::read_to_string(file)
        .await
        .with_context(|| format!("Failed to read {}", file.display()))?;
    let title = title.unwrap_or_else(|| daily_title(chrono::Local::now().date_naive()));

    let config = PipelineConfig::from_env().context("Failed to load configuration")?;
    let sync = document_sync(&reqwest::Client::new(), &config).await;

    let document_id = sync
        .publish_document(&config.notion_report_database_id, &title, &content)
        .await
        .with_context(|| format!("Failed to publish '{title}'"))?;

    tracing::info!(%title, %document_id, "Published document");
    Ok(document_id)
}
