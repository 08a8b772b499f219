//! Parsing of `GET /history/{prompt_id}` responses.
//!
//! The endpoint returns `{}` while the prompt is queued or running and
//! `{"<prompt_id>": {"outputs": {...}, "status": {...}}}` once it has
//! finished.

use serde::Deserialize;
use serde_json::Value;

use crate::workflow::SAVE_IMAGE_NODE;

/// Reference to an image stored on the ComfyUI server, fetched via `/view`.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct OutputImage {
    pub filename: String,
    #[serde(default)]
    pub subfolder: String,
    #[serde(rename = "type", default = "default_folder_type")]
    pub folder_type: String,
}

fn default_folder_type() -> String {
    "output".to_string()
}

/// State of a prompt as reported by its history entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PromptState {
    /// No history entry yet.
    Pending,
    /// Finished with at least one output image.
    Completed(OutputImage),
    /// Finished with an error status.
    Failed(String),
    /// Finished successfully but produced no image.
    NoOutput,
}

/// Interpret a history response for `prompt_id`.
///
/// The `SaveImage` node's output is preferred; any other node's images
/// are used as a fallback.
pub fn prompt_state(history: &Value, prompt_id: &str) -> PromptState {
    let Some(entry) = history.get(prompt_id) else {
        return PromptState::Pending;
    };

    if entry["status"]["status_str"].as_str() == Some("error") {
        return PromptState::Failed(error_message(&entry["status"]));
    }

    let outputs = &entry["outputs"];
    let preferred = first_image(&outputs[SAVE_IMAGE_NODE]);
    let any = || {
        outputs
            .as_object()
            .into_iter()
            .flat_map(|nodes| nodes.values())
            .find_map(first_image)
    };

    match preferred.or_else(any) {
        Some(image) => PromptState::Completed(image),
        None if entry["status"]["completed"].as_bool() == Some(false) => PromptState::Pending,
        None => PromptState::NoOutput,
    }
}

fn first_image(node_output: &Value) -> Option<OutputImage> {
    node_output["images"]
        .as_array()?
        .iter()
        .find_map(|image| serde_json::from_value(image.clone()).ok())
}

/// Extract the exception message from a status block's `execution_error`
/// message, if present.
fn error_message(status: &Value) -> String {
    status["messages"]
        .as_array()
        .into_iter()
        .flatten()
        .find(|message| message[0].as_str() == Some("execution_error"))
        .and_then(|message| message[1]["exception_message"].as_str())
        .unwrap_or("execution failed")
        .to_string()
}

#[cfg(test)]
mod tests {
    use assert_matches::assert_matches;
    use serde_json::json;

    use super::*;

    #[test]
    fn empty_history_is_pending() {
        assert_eq!(prompt_state(&json!({}), "abc"), PromptState::Pending);
    }

    #[test]
    fn save_node_image_is_returned() {
        let history = json!({
            "abc": {
                "outputs": {
                    "9": {"images": [{"filename": "storyloom_00001_.png", "subfolder": "", "type": "output"}]}
                },
                "status": {"status_str": "success", "completed": true, "messages": []}
            }
        });
        assert_eq!(
            prompt_state(&history, "abc"),
            PromptState::Completed(OutputImage {
                filename: "storyloom_00001_.png".into(),
                subfolder: String::new(),
                folder_type: "output".into(),
            })
        );
    }

    #[test]
    fn other_node_image_is_fallback() {
        let history = json!({
            "abc": {
                "outputs": {"12": {"images": [{"filename": "preview.png", "type": "temp"}]}},
                "status": {"status_str": "success", "completed": true}
            }
        });
        assert_matches!(
            prompt_state(&history, "abc"),
            PromptState::Completed(image) if image.filename == "preview.png" && image.folder_type == "temp"
        );
    }

    #[test]
    fn error_status_reports_exception_message() {
        let history = json!({
            "abc": {
                "outputs": {},
                "status": {
                    "status_str": "error",
                    "completed": false,
                    "messages": [
                        ["execution_start", {"prompt_id": "abc"}],
                        ["execution_error", {"prompt_id": "abc", "exception_message": "CUDA out of memory"}]
                    ]
                }
            }
        });
        assert_eq!(
            prompt_state(&history, "abc"),
            PromptState::Failed("CUDA out of memory".into())
        );
    }

    #[test]
    fn success_without_images_is_no_output() {
        let history = json!({
            "abc": {"outputs": {}, "status": {"status_str": "success", "completed": true}}
        });
        assert_eq!(prompt_state(&history, "abc"), PromptState::NoOutput);
    }

    #[test]
    fn other_prompt_ids_are_ignored() {
        let history = json!({"zzz": {"outputs": {}, "status": {"status_str": "error"}}});
        assert_eq!(prompt_state(&history, "abc"), PromptState::Pending);
    }
}
