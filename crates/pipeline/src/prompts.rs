//! Fixed prompt texts sent to the chat model.

/// Marker opening the story body in the story stage response.
pub const STORY_MARKER: &str = "STORY:";

/// Marker opening the model's account of how it wrote the story.
pub const PROCESS_MARKER: &str = "GENERATION_PROCESS:";

pub const STORY_SYSTEM_PROMPT: &str = "You are a writer of heartwarming stories. \
Always include both the STORY: and GENERATION_PROCESS: markers in your answer.";

pub const STORY_USER_PROMPT: &str = "\
Your answer must contain two parts: the story itself and an explanation of how you wrote it.

First, write a heartwarming story that satisfies the following:
- a world where different races live together
- five main characters
- a theme of friendship and cooperation
- a moving ending

Then explain your thinking and the choices you made while writing it, covering:
- intent behind the characters
- intent behind the plot development
- intent behind the theme
- how emotions are expressed
- the message of the story

Use exactly this format:
STORY:
[the story]

GENERATION_PROCESS:
[the explanation]";

pub const ILLUSTRATION_SYSTEM_PROMPT: &str = "\
You are a professional illustrator and prompt engineer for Stable Diffusion. \
Given the following story, create a single, vivid English prompt suitable for image generation. \
Follow these rules strictly:
1. The illustration must depict only ONE main character.
2. Start with the main subject and character, using descriptive adjectives.
3. Add the scene and background details, but keep the composition simple.
4. Specify the art style and atmosphere.
5. Add quality modifiers such as 'highly detailed', 'masterpiece', 'best quality'.

Use commas to separate elements, describe lighting, colors and mood, \
keep the total length under 100 words, and answer with the prompt only.";

/// User message for the illustration prompt stage.
pub fn illustration_user_prompt(narrative_text: &str) -> String {
    format!("Story:\n{narrative_text}")
}
