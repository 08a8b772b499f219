//! Per-episode generation report, rendered as markup for `replace_body`.

use crate::episode::Episode;

/// Render the generation report for `episode`.
pub fn render_report(episode: &Episode) -> String {
    let part = episode.part_number;
    let mut report = format!(
        "## Part {part} Generation Report\n\
         \n\
         ### Story Generation Process\n\
         {explanation}\n\
         \n\
         ### Illustration Prompt\n\
         {prompt}\n",
        explanation = episode.narrative_explanation.trim(),
        prompt = episode.illustration_prompt.trim(),
    );
    if let Some(image) = &episode.image {
        report.push_str(&format!(
            "\n\
             ### Illustration\n\
             - Format: {format}\n\
             - Size: {width}x{height}\n",
            format = image.format,
            width = image.width,
            height = image.height,
        ));
    }
    report
}
