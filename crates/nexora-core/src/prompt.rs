//! Provider-neutral prompts and the reasoning prompt template.

use crate::data_uri::ImageDataUri;
use crate::state::{ChatRole, HistoryTurn};

/// Persona and style preamble sent ahead of every reasoning question.
pub const PERSONA_PREAMBLE: &str = "You are a helpful and friendly AI assistant that provides insightful and reasoned answers to questions. Use emojis to make your answers more engaging.\n\nAnswer the following question to the best of your ability.\n\n";

/// One ordered piece of a prompt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PromptPart {
    Text(String),
    Image(ImageDataUri),
}

/// A single-turn prompt made of text and inline images, in order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Prompt {
    parts: Vec<PromptPart>,
}

impl Prompt {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn text(text: impl Into<String>) -> Self {
        let mut prompt = Self::new();
        prompt.push_text(text.into());
        prompt
    }

    /// Append text, merging with a preceding text part.
    pub fn push_text(&mut self, text: impl AsRef<str>) {
        let text = text.as_ref();
        if text.is_empty() {
            return;
        }
        if let Some(PromptPart::Text(last)) = self.parts.last_mut() {
            last.push_str(text);
        } else {
            self.parts.push(PromptPart::Text(text.to_string()));
        }
    }

    pub fn push_image(&mut self, image: ImageDataUri) {
        self.parts.push(PromptPart::Image(image));
    }

    pub fn parts(&self) -> &[PromptPart] {
        &self.parts
    }

    pub fn images(&self) -> impl Iterator<Item = &ImageDataUri> {
        self.parts.iter().filter_map(|p| match p {
            PromptPart::Image(img) => Some(img),
            PromptPart::Text(_) => None,
        })
    }

    /// All text parts joined, with images replaced by a marker.
    ///
    /// Used by providers that take images out-of-band.
    pub fn flatten_text(&self) -> String {
        let mut out = String::new();
        for part in &self.parts {
            match part {
                PromptPart::Text(t) => out.push_str(t),
                PromptPart::Image(_) => out.push_str("[attached image]"),
            }
        }
        out
    }

    pub fn text_len(&self) -> usize {
        self.parts
            .iter()
            .map(|p| match p {
                PromptPart::Text(t) => t.len(),
                PromptPart::Image(_) => 0,
            })
            .sum()
    }
}

/// Compose the reasoning prompt: preamble, history, image, then the question.
pub fn build_reasoning_prompt(
    question: &str,
    image: Option<&ImageDataUri>,
    history: &[HistoryTurn],
) -> Prompt {
    let mut prompt = Prompt::text(PERSONA_PREAMBLE);

    if !history.is_empty() {
        prompt.push_text("Here is the conversation history:\n");
        for turn in history {
            let speaker = match turn.role {
                ChatRole::User => "User",
                ChatRole::Bot => "Assistant",
            };
            prompt.push_text(format!("{}: {}\n", speaker, turn.content));
        }
        prompt.push_text("\n");
    }

    if let Some(image) = image {
        prompt.push_text("Refer to the following image when answering the question.\nImage: ");
        prompt.push_image(image.clone());
        prompt.push_text("\n\n");
    }

    prompt.push_text("Question: ");
    prompt.push_text(question);

    prompt
}
