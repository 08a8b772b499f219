//! REST API client for the ComfyUI HTTP endpoints.
//!
//! Wraps workflow submission, cancellation, history retrieval and output
//! download using [`reqwest`], plus [`ComfyUIApi::generate_image`], which
//! drives a txt2img render from submission to image bytes by polling
//! history.

use std::time::{Duration, Instant};

use serde::Deserialize;

use crate::history::{prompt_state, OutputImage, PromptState};
use crate::workflow::Txt2ImgRequest;

/// Default delay between two `/history` polls.
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(2);

/// Default upper bound on a single render.
pub const DEFAULT_POLL_TIMEOUT: Duration = Duration::from_secs(600);

/// HTTP client for a single ComfyUI instance.
#[derive(Debug, Clone)]
pub struct ComfyUIApi {
    client: reqwest::Client,
    api_url: String,
}

/// Response returned by the ComfyUI `/prompt` endpoint after
/// successfully queuing a workflow.
#[derive(Debug, Deserialize)]
pub struct SubmitResponse {
    /// Server-assigned identifier for the queued prompt.
    pub prompt_id: String,
    /// Position in the execution queue.
    pub number: i32,
}

/// Polling cadence for [`ComfyUIApi::generate_image`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PollConfig {
    pub interval: Duration,
    pub timeout: Duration,
}

impl Default for PollConfig {
    fn default() -> Self {
        Self {
            interval: DEFAULT_POLL_INTERVAL,
            timeout: DEFAULT_POLL_TIMEOUT,
        }
    }
}

/// Errors from the ComfyUI REST API layer.
#[derive(Debug, thiserror::Error)]
pub enum ComfyUIApiError {
    /// The HTTP request itself failed (network, DNS, TLS, etc.).
    #[error("HTTP request failed: {0}")]
    Request(#[from] reqwest::Error),

    /// ComfyUI returned a non-2xx status code.
    #[error("ComfyUI API error ({status}): {body}")]
    ApiError {
        /// HTTP status code.
        status: u16,
        /// Raw response body for debugging.
        body: String,
    },

    /// The prompt finished with an execution error.
    #[error("ComfyUI execution of prompt {prompt_id} failed: {message}")]
    ExecutionFailed { prompt_id: String, message: String },

    /// The prompt finished without producing any image.
    #[error("ComfyUI prompt {prompt_id} produced no image output")]
    MissingOutput { prompt_id: String },

    /// The prompt did not finish within the poll timeout.
    #[error("ComfyUI prompt {prompt_id} did not finish within {waited:?}")]
    Timeout { prompt_id: String, waited: Duration },
}

impl ComfyUIApi {
    /// Create a new API client for a ComfyUI instance.
    ///
    /// * `api_url` - Base HTTP URL, e.g. `http://host:8188`.
    pub fn new(api_url: String) -> Self {
        Self::with_client(reqwest::Client::new(), api_url)
    }

    /// Create an API client reusing an existing [`reqwest::Client`].
    pub fn with_client(client: reqwest::Client, api_url: String) -> Self {
        Self {
            client,
            api_url: api_url.trim_end_matches('/').to_string(),
        }
    }

    /// Submit a workflow for execution.
    ///
    /// Sends a `POST /prompt` request with the given workflow JSON and
    /// client ID.  Returns the server-assigned `prompt_id` and queue
    /// position.
    pub async fn submit_workflow(
        &self,
        workflow: &serde_json::Value,
        client_id: &str,
    ) -> Result<SubmitResponse, ComfyUIApiError> {
        let body = serde_json::json!({
            "prompt": workflow,
            "client_id": client_id,
        });

        let response = self
            .client
            .post(format!("{}/prompt", self.api_url))
            .json(&body)
            .send()
            .await?;

        Self::parse_response(response).await
    }

    /// Remove a queued prompt (`POST /queue` with `delete`).
    pub async fn cancel_execution(&self, prompt_id: &str) -> Result<(), ComfyUIApiError> {
        let body = serde_json::json!({
            "delete": [prompt_id],
        });

        let response = self
            .client
            .post(format!("{}/queue", self.api_url))
            .json(&body)
            .send()
            .await?;

        Self::check_status(response).await
    }

    /// Retrieve execution history for a specific prompt.
    ///
    /// Sends a `GET /history/{prompt_id}` request.  The body is `{}`
    /// until the prompt has finished.
    pub async fn get_history(&self, prompt_id: &str) -> Result<serde_json::Value, ComfyUIApiError> {
        let response = self
            .client
            .get(format!("{}/history/{}", self.api_url, prompt_id))
            .send()
            .await?;

        Self::parse_response(response).await
    }

    /// Download an output file (`GET /view`).
    pub async fn view_image(&self, image: &OutputImage) -> Result<Vec<u8>, ComfyUIApiError> {
        let response = self
            .client
            .get(format!("{}/view", self.api_url))
            .query(&[
                ("filename", image.filename.as_str()),
                ("subfolder", image.subfolder.as_str()),
                ("type", image.folder_type.as_str()),
            ])
            .send()
            .await?;

        let response = Self::ensure_success(response).await?;
        Ok(response.bytes().await?.to_vec())
    }

    /// Render one txt2img request and return the encoded image bytes.
    ///
    /// Polls `/history` every `poll.interval`. On timeout the prompt is
    /// removed from the queue (best effort) before returning
    /// [`ComfyUIApiError::Timeout`].
    pub async fn generate_image(
        &self,
        request: &Txt2ImgRequest,
        poll: PollConfig,
    ) -> Result<Vec<u8>, ComfyUIApiError> {
        let client_id = uuid::Uuid::new_v4().to_string();
        let submitted = self
            .submit_workflow(&request.to_workflow(), &client_id)
            .await?;
        let prompt_id = submitted.prompt_id;

        tracing::info!(
            prompt_id = %prompt_id,
            queue_position = submitted.number,
            width = request.width,
            height = request.height,
            "ComfyUI workflow queued",
        );

        let started = Instant::now();
        let image = loop {
            tokio::time::sleep(poll.interval).await;

            let history = self.get_history(&prompt_id).await?;
            match prompt_state(&history, &prompt_id) {
                PromptState::Completed(image) => break image,
                PromptState::Failed(message) => {
                    return Err(ComfyUIApiError::ExecutionFailed { prompt_id, message });
                }
                PromptState::NoOutput => {
                    return Err(ComfyUIApiError::MissingOutput { prompt_id });
                }
                PromptState::Pending => {}
            }

            let waited = started.elapsed();
            if waited >= poll.timeout {
                if let Err(e) = self.cancel_execution(&prompt_id).await {
                    tracing::warn!(prompt_id = %prompt_id, error = %e, "Failed to cancel timed-out prompt");
                }
                return Err(ComfyUIApiError::Timeout { prompt_id, waited });
            }
        };

        tracing::info!(
            prompt_id = %prompt_id,
            filename = %image.filename,
            elapsed_ms = started.elapsed().as_millis() as u64,
            "ComfyUI render finished",
        );

        self.view_image(&image).await
    }

    // ---- private helpers ----

    /// Ensure the response has a success status code. Returns the
    /// response unchanged on success, or a [`ComfyUIApiError::ApiError`]
    /// containing the status and body text on failure.
    async fn ensure_success(
        response: reqwest::Response,
    ) -> Result<reqwest::Response, ComfyUIApiError> {
        let status = response.status();
        if !status.is_success() {
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| "<unreadable body>".to_string());
            return Err(ComfyUIApiError::ApiError {
                status: status.as_u16(),
                body,
            });
        }
        Ok(response)
    }

    async fn parse_response<T: serde::de::DeserializeOwned>(
        response: reqwest::Response,
    ) -> Result<T, ComfyUIApiError> {
        let response = Self::ensure_success(response).await?;
        Ok(response.json::<T>().await?)
    }

    async fn check_status(response: reqwest::Response) -> Result<(), ComfyUIApiError> {
        Self::ensure_success(response).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_poll_cadence() {
        let poll = PollConfig::default();
        assert_eq!(poll.interval, Duration::from_secs(2));
        assert_eq!(poll.timeout, Duration::from_secs(600));
    }

    #[test]
    fn trailing_slash_is_trimmed() {
        let api = ComfyUIApi::new("http://127.0.0.1:8188/".into());
        assert_eq!(api.api_url, "http://127.0.0.1:8188");
    }

    #[test]
    fn submit_response_parses() {
        let parsed: SubmitResponse =
            serde_json::from_str(r#"{"prompt_id": "p-1", "number": 3, "node_errors": {}}"#).unwrap();
        assert_eq!(parsed.prompt_id, "p-1");
        assert_eq!(parsed.number, 3);
    }

    #[test]
    fn timeout_error_names_prompt() {
        let err = ComfyUIApiError::Timeout {
            prompt_id: "p-9".into(),
            waited: Duration::from_secs(600),
        };
        assert!(err.to_string().contains("p-9"));
    }
}
