//! Text-to-image workflow graph in ComfyUI's API (prompt) format.
//!
//! The graph is the stock SD1.5 pipeline:
//! checkpoint loader -> positive/negative CLIP encode -> empty latent ->
//! KSampler -> VAE decode -> save image.

use serde_json::{json, Value};

/// Node id of the `SaveImage` node whose output carries the result.
pub const SAVE_IMAGE_NODE: &str = "9";

/// Filename prefix ComfyUI uses for saved outputs.
pub const OUTPUT_PREFIX: &str = "storyloom";

/// Parameters of a single txt2img render.
#[derive(Debug, Clone, PartialEq)]
pub struct Txt2ImgRequest {
    pub positive_prompt: String,
    pub negative_prompt: String,
    pub width: u32,
    pub height: u32,
    pub steps: u32,
    /// Classifier-free guidance scale.
    pub cfg: f32,
    pub seed: u64,
    /// Model file known to the ComfyUI instance, e.g.
    /// `v1-5-pruned-emaonly.safetensors`.
    pub checkpoint: String,
}

impl Txt2ImgRequest {
    /// Build the workflow graph submitted to `POST /prompt`.
    pub fn to_workflow(&self) -> Value {
        json!({
            "3": {
                "class_type": "KSampler",
                "inputs": {
                    "seed": self.seed,
                    "steps": self.steps,
                    "cfg": self.cfg,
                    "sampler_name": "euler",
                    "scheduler": "normal",
                    "denoise": 1.0,
                    "model": ["4", 0],
                    "positive": ["6", 0],
                    "negative": ["7", 0],
                    "latent_image": ["5", 0]
                }
            },
            "4": {
                "class_type": "CheckpointLoaderSimple",
                "inputs": { "ckpt_name": self.checkpoint }
            },
            "5": {
                "class_type": "EmptyLatentImage",
                "inputs": { "width": self.width, "height": self.height, "batch_size": 1 }
            },
            "6": {
                "class_type": "CLIPTextEncode",
                "inputs": { "text": self.positive_prompt, "clip": ["4", 1] }
            },
            "7": {
                "class_type": "CLIPTextEncode",
                "inputs": { "text": self.negative_prompt, "clip": ["4", 1] }
            },
            "8": {
                "class_type": "VAEDecode",
                "inputs": { "samples": ["3", 0], "vae": ["4", 2] }
            },
            SAVE_IMAGE_NODE: {
                "class_type": "SaveImage",
                "inputs": { "filename_prefix": OUTPUT_PREFIX, "images": ["8", 0] }
            }
        })
    }
}
