//! ComfyUI REST client library.
//!
//! Provides the HTTP API wrapper, a text-to-image workflow builder, and
//! history parsing for rendering single illustrations on a ComfyUI
//! image-generation server.

pub mod api;
pub mod history;
pub mod workflow;

pub use api::{ComfyUIApi, ComfyUIApiError, PollConfig};
pub use workflow::Txt2ImgRequest;
