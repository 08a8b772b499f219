//! Image-generation client (`POST /images/generations`).
//!
//! The endpoint answers with short-lived URLs; [`ImageClient::generate`]
//! downloads the first one and returns the encoded bytes.

use serde::{Deserialize, Serialize};

use crate::error::LlmError;
use crate::http::ensure_success;

/// Body of a `POST /images/generations` request.
#[derive(Debug, Clone, Serialize)]
pub struct ImageGenerationRequest {
    pub model: String,
    pub prompt: String,
    pub n: u8,
    /// `"<width>x<height>"`, e.g. `"512x512"`.
    pub size: String,
    pub response_format: &'static str,
}

impl ImageGenerationRequest {
    /// Single-image request returning a URL.
    pub fn single(model: String, prompt: String, width: u32, height: u32) -> Self {
        Self {
            model,
            prompt,
            n: 1,
            size: format!("{width}x{height}"),
            response_format: "url",
        }
    }
}

#[derive(Debug, Deserialize)]
struct ImageGenerationResponse {
    #[serde(default)]
    data: Vec<GeneratedImage>,
}

#[derive(Debug, Deserialize)]
struct GeneratedImage {
    url: Option<String>,
}

impl ImageGenerationResponse {
    fn first_url(self) -> Result<String, LlmError> {
        self.data
            .into_iter()
            .find_map(|image| image.url)
            .ok_or(LlmError::EmptyResponse("image generation returned no URL"))
    }
}

/// HTTP client for an OpenAI-compatible image-generation endpoint.
#[derive(Clone)]
pub struct ImageClient {
    client: reqwest::Client,
    base_url: String,
    api_key: String,
}

impl ImageClient {
    pub fn new(api_key: String, base_url: String) -> Self {
        Self::with_client(reqwest::Client::new(), api_key, base_url)
    }

    pub fn with_client(client: reqwest::Client, api_key: String, base_url: String) -> Self {
        Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key,
        }
    }

    /// Generate one image and download its bytes.
    pub async fn generate(&self, request: &ImageGenerationRequest) -> Result<Vec<u8>, LlmError> {
        tracing::debug!(model = %request.model, size = %request.size, "Requesting image generation");

        let response = self
            .client
            .post(format!("{}/images/generations", self.base_url))
            .bearer_auth(&self.api_key)
            .json(request)
            .send()
            .await?;

        let response = ensure_success(response).await?;
        let url = response.json::<ImageGenerationResponse>().await?.first_url()?;

        let download = ensure_success(self.client.get(&url).send().await?).await?;
        let bytes = download.bytes().await?;

        tracing::debug!(bytes = bytes.len(), "Generated image downloaded");
        Ok(bytes.to_vec())
    }
}

impl std::fmt::Debug for ImageClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ImageClient")
            .field("base_url", &self.base_url)
            .finish_non_exhaustive()
    }
}
