//! Clients for OpenAI-compatible generative endpoints.
//!
//! - [`chat::ChatClient`] -- `POST /chat/completions`
//! - [`images::ImageClient`] -- `POST /images/generations` plus download
//!   of the returned image URL
//!
//! Both clients are plain configuration handles around a shared
//! [`reqwest::Client`]; construct them once and pass them where needed.

pub mod chat;
pub mod error;
pub mod images;

mod http;

pub use chat::{ChatClient, ChatMessage, ChatRequest, Role};
pub use error::LlmError;
pub use images::{ImageClient, ImageGenerationRequest};

/// Default API base URL.
pub const DEFAULT_BASE_URL: &str = "https://api.openai.com/v1";
