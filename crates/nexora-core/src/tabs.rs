//! Per-tab controllers: Reasoning, Image Generation, and Chat.
//!
//! Each controller owns its own input, attachment, loading flag, and error.
//! Submitting is split in two so the caller decides how to run the request:
//! `begin_submit` applies the guards and returns the request to send (or
//! `None` for a no-op), and `complete` folds the flow result back in. While a
//! request is outstanding `begin_submit` always returns `None`, so a tab never
//! has more than one request in flight.

use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::config::DEFAULT_REVEAL_INTERVAL_MS;
use crate::data_uri::ImageDataUri;
use crate::error::{FlowError, PermissionError, ValidationError};
use crate::flows::{ImageRequest, ImageResponse, ReasoningRequest, ReasoningResponse};
use crate::reveal::Reveal;
use crate::state::{ChatMessage, ChatRole};

const FALLBACK_ERROR: &str = "An unexpected error occurred.";

/// A dismissible, non-blocking warning.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notice {
    pub title: &'static str,
    pub message: String,
}

impl From<&ValidationError> for Notice {
    fn from(err: &ValidationError) -> Self {
        Self {
            title: err.title(),
            message: err.to_string(),
        }
    }
}

impl From<&PermissionError> for Notice {
    fn from(err: &PermissionError) -> Self {
        let title = match err {
            PermissionError::CameraDenied(_) => "Camera Access Denied",
            PermissionError::MicrophoneDenied(_) => "Microphone Access Denied",
        };
        Self {
            title,
            message: err.to_string(),
        }
    }
}

fn error_message(err: &FlowError) -> String {
    let message = err.to_string();
    if message.trim().is_empty() {
        FALLBACK_ERROR.to_string()
    } else {
        message
    }
}

/// Store an upload in `slot`, or leave it untouched and return a warning.
fn attach(slot: &mut Option<ImageDataUri>, upload: Result<ImageDataUri, ValidationError>) -> Option<Notice> {
    match upload {
        Ok(image) => {
            *slot = Some(image);
            None
        }
        Err(err) => {
            tracing::warn!(error = %err, "image upload rejected");
            Some(Notice::from(&err))
        }
    }
}

// =============================================================================
// REASONING
// =============================================================================

#[derive(Debug, Default)]
pub struct ReasoningTab {
    pub question: String,
    pub image: Option<ImageDataUri>,
    pub answer: Option<String>,
    pub loading: bool,
    pub error: Option<String>,
}

impl ReasoningTab {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn can_submit(&self) -> bool {
        !self.loading && (!self.question.trim().is_empty() || self.image.is_some())
    }

    pub fn begin_submit(&mut self) -> Option<ReasoningRequest> {
        if !self.can_submit() {
            return None;
        }
        self.loading = true;
        self.answer = None;
        self.error = None;
        Some(ReasoningRequest::new(self.question.clone()).with_image(self.image.clone()))
    }

    pub fn complete(&mut self, result: Result<ReasoningResponse, FlowError>) {
        self.loading = false;
        match result {
            Ok(response) => self.answer = Some(response.answer),
            Err(err) => self.error = Some(error_message(&err)),
        }
    }

    pub fn attach_image(&mut self, upload: Result<ImageDataUri, ValidationError>) -> Option<Notice> {
        attach(&mut self.image, upload)
    }

    pub fn clear_image(&mut self) {
        self.image = None;
    }

    pub fn apply_transcript(&mut self, transcript: &str) {
        self.question = transcript.to_string();
    }
}

// =============================================================================
// IMAGE GENERATION
// =============================================================================

#[derive(Debug, Default)]
pub struct ImageGenTab {
    pub prompt: String,
    pub image: Option<ImageDataUri>,
    /// Prompt that produced `image`; names the downloaded file.
    pub generated_for: String,
    pub saved_path: Option<PathBuf>,
    pub loading: bool,
    pub error: Option<String>,
}

impl ImageGenTab {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn can_submit(&self) -> bool {
        !self.loading && !self.prompt.trim().is_empty()
    }

    pub fn begin_submit(&mut self) -> Option<ImageRequest> {
        if !self.can_submit() {
            return None;
        }
        self.loading = true;
        self.image = None;
        self.saved_path = None;
        self.error = None;
        self.generated_for = self.prompt.clone();
        Some(ImageRequest::new(self.prompt.clone()))
    }

    pub fn complete(&mut self, result: Result<ImageResponse, FlowError>) {
        self.loading = false;
        match result {
            Ok(response) => self.image = Some(response.image),
            Err(err) => self.error = Some(error_message(&err)),
        }
    }

    pub fn apply_transcript(&mut self, transcript: &str) {
        self.prompt = transcript.to_string();
    }
}

// =============================================================================
// CHAT
// =============================================================================

/// What happens to the optimistic user message when a chat request fails.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChatFailurePolicy {
    /// Remove the message and put its text and image back into the input.
    #[default]
    Revert,
    /// Keep the message and append an inline error from the bot.
    Inline,
}

#[derive(Debug)]
pub struct ChatEntry {
    pub message: ChatMessage,
    /// Typing effect for bot answers; `None` for user messages.
    pub reveal: Option<Reveal>,
}

impl ChatEntry {
    /// Text to draw right now.
    pub fn display_text(&self) -> &str {
        match &self.reveal {
            Some(reveal) => reveal.visible(),
            None => &self.message.content,
        }
    }
}

#[derive(Debug)]
pub struct ChatTab {
    pub input: String,
    pub image: Option<ImageDataUri>,
    pub entries: Vec<ChatEntry>,
    pub loading: bool,
    pub error: Option<String>,
    policy: ChatFailurePolicy,
    reveal_interval: Duration,
    // input and image taken by the in-flight submit, restored on revert
    pending: Option<(String, Option<ImageDataUri>)>,
}

impl Default for ChatTab {
    fn default() -> Self {
        Self::new(
            ChatFailurePolicy::default(),
            Duration::from_millis(DEFAULT_REVEAL_INTERVAL_MS),
        )
    }
}

impl ChatTab {
    pub fn new(policy: ChatFailurePolicy, reveal_interval: Duration) -> Self {
        Self {
            input: String::new(),
            image: None,
            entries: Vec::new(),
            loading: false,
            error: None,
            policy,
            reveal_interval,
            pending: None,
        }
    }

    pub fn messages(&self) -> impl Iterator<Item = &ChatMessage> {
        self.entries.iter().map(|e| &e.message)
    }

    pub fn can_submit(&self) -> bool {
        !self.loading && (!self.input.trim().is_empty() || self.image.is_some())
    }

    pub fn begin_submit(&mut self) -> Option<ReasoningRequest> {
        if !self.can_submit() {
            return None;
        }

        let history = self
            .entries
            .iter()
            .filter(|e| !e.message.is_error)
            .map(|e| e.message.to_history())
            .collect();

        let input = std::mem::take(&mut self.input);
        let image = self.image.take();

        self.entries.push(ChatEntry {
            message: ChatMessage::user(input.clone(), image.clone()),
            reveal: None,
        });
        self.pending = Some((input.clone(), image.clone()));
        self.loading = true;
        self.error = None;

        Some(
            ReasoningRequest::new(input)
                .with_image(image)
                .with_history(history),
        )
    }

    /// Fold in the flow result. Must run inside a tokio runtime when the
    /// reveal interval is non-zero.
    pub fn complete(&mut self, result: Result<ReasoningResponse, FlowError>) {
        self.loading = false;
        let pending = self.pending.take();

        match result {
            Ok(response) => {
                let reveal = Reveal::start(response.answer.clone(), self.reveal_interval);
                self.entries.push(ChatEntry {
                    message: ChatMessage::bot(response.answer),
                    reveal: Some(reveal),
                });
            }
            Err(err) => {
                let message = error_message(&err);
                match self.policy {
                    ChatFailurePolicy::Revert => {
                        if matches!(self.entries.last(), Some(e) if e.message.role == ChatRole::User) {
                            self.entries.pop();
                        }
                        if let Some((input, image)) = pending {
                            self.input = input;
                            self.image = image;
                        }
                    }
                    ChatFailurePolicy::Inline => {
                        self.entries.push(ChatEntry {
                            message: ChatMessage::bot_error(&message),
                            reveal: None,
                        });
                    }
                }
                self.error = Some(message);
            }
        }
    }

    pub fn attach_image(&mut self, upload: Result<ImageDataUri, ValidationError>) -> Option<Notice> {
        attach(&mut self.image, upload)
    }

    pub fn clear_image(&mut self) {
        self.image = None;
    }

    pub fn apply_transcript(&mut self, transcript: &str) {
        self.input = transcript.to_string();
    }

    /// True while any bot answer is still being typed out.
    pub fn is_revealing(&self) -> bool {
        self.entries
            .iter()
            .any(|e| e.reveal.as_ref().is_some_and(|r| !r.is_done()))
    }

    /// Skip the typing effect on every message.
    pub fn finish_reveals(&mut self) {
        for entry in &mut self.entries {
            if let Some(reveal) = entry.reveal.as_mut() {
                reveal.finish();
            }
        }
    }

    /// Drop the transcript, cancelling any running reveals.
    pub fn clear(&mut self) {
        if !self.loading {
            self.entries.clear();
            self.error = None;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ModelInvocationError;
    use crate::flows::{self, testing::MockBackend};

    const FOX: &str = "data:image/png;base64,iVBORw0KGgo=";

    fn fox() -> ImageDataUri {
        ImageDataUri::parse(FOX).unwrap()
    }

    fn failure() -> FlowError {
        ModelInvocationError::Status {
            status: 500,
            body: "internal".into(),
        }
        .into()
    }

    // =========================================================================
    // ReasoningTab
    // =========================================================================

    #[test]
    fn reasoning_empty_submit_is_noop() {
        let mut tab = ReasoningTab::new();
        tab.question = "   ".into();
        assert!(tab.begin_submit().is_none());
        assert!(!tab.loading);
        assert!(tab.error.is_none());
    }

    #[test]
    fn reasoning_second_submit_while_loading_is_noop() {
        let mut tab = ReasoningTab::new();
        tab.question = "Why?".into();
        assert!(tab.begin_submit().is_some());
        assert!(tab.loading);
        assert!(tab.begin_submit().is_none());
    }

    #[test]
    fn reasoning_image_only_submits() {
        let mut tab = ReasoningTab::new();
        assert!(tab.attach_image(Ok(fox())).is_none());
        let request = tab.begin_submit().unwrap();
        assert_eq!(request.image_data_uri, Some(fox()));
        assert_eq!(request.question, "");
    }

    #[test]
    fn reasoning_failure_keeps_question() {
        let mut tab = ReasoningTab::new();
        tab.question = "What's 2+2?".into();
        tab.begin_submit().unwrap();
        tab.complete(Err(failure()));
        assert!(!tab.loading);
        assert!(tab.error.as_deref().is_some_and(|e| !e.is_empty()));
        assert_eq!(tab.question, "What's 2+2?");
        assert!(tab.answer.is_none());
    }

    #[tokio::test]
    async fn reasoning_end_to_end_with_backend() {
        let backend = MockBackend::new().answer(Ok(Some("4".into())));
        let mut tab = ReasoningTab::new();
        tab.question = "What's 2+2?".into();

        let request = tab.begin_submit().unwrap();
        tab.complete(flows::respond_with_reasoning(&backend, &request).await);
        assert_eq!(tab.answer.as_deref(), Some("4"));
        assert!(tab.error.is_none());
    }

    #[test]
    fn rejected_uploads_leave_attachment_alone() {
        let mut tab = ReasoningTab::new();
        tab.attach_image(Ok(fox()));

        let notice = tab
            .attach_image(Err(ValidationError::FileTooLarge { size: 5 << 20, limit: 4 << 20 }))
            .unwrap();
        assert_eq!(notice.title, "File too large");
        assert_eq!(tab.image, Some(fox()));

        let notice = tab
            .attach_image(Err(ValidationError::UnsupportedType { mime: "application/pdf".into() }))
            .unwrap();
        assert_eq!(notice.title, "Unsupported file type");
        assert_eq!(tab.image, Some(fox()));
    }

    // =========================================================================
    // ImageGenTab
    // =========================================================================

    #[test]
    fn image_empty_prompt_is_noop() {
        let mut tab = ImageGenTab::new();
        assert!(tab.begin_submit().is_none());
        assert!(!tab.loading);
    }

    #[tokio::test]
    async fn image_success_shows_uri_verbatim() {
        let backend = MockBackend::new().image(Ok(Some(FOX.into())));
        let mut tab = ImageGenTab::new();
        tab.prompt = "a red fox".into();

        let request = tab.begin_submit().unwrap();
        assert!(tab.begin_submit().is_none());
        tab.complete(flows::generate_image(&backend, &request).await);

        assert_eq!(tab.image.as_ref().map(ImageDataUri::as_str), Some(FOX));
        assert_eq!(tab.generated_for, "a red fox");
        assert_eq!(tab.prompt, "a red fox");
    }

    #[test]
    fn image_failure_sets_error_and_clears_loading() {
        let mut tab = ImageGenTab::new();
        tab.prompt = "a red fox".into();
        tab.begin_submit().unwrap();
        tab.complete(Err(ModelInvocationError::MissingImage.into()));
        assert!(!tab.loading);
        assert_eq!(tab.error.as_deref(), Some("the model returned no image"));
        assert_eq!(tab.prompt, "a red fox");
    }

    // =========================================================================
    // ChatTab
    // =========================================================================

    #[test]
    fn chat_empty_submit_is_noop() {
        let mut tab = ChatTab::default();
        assert!(tab.begin_submit().is_none());
        assert_eq!(tab.entries.len(), 0);
    }

    #[test]
    fn chat_appends_optimistically_and_clears_input() {
        let mut tab = ChatTab::default();
        tab.input = "Hi".into();
        tab.image = Some(fox());

        let request = tab.begin_submit().unwrap();
        assert_eq!(request.question, "Hi");
        assert!(request.history.is_empty());
        assert_eq!(tab.entries.len(), 1);
        assert_eq!(tab.entries[0].message.image, Some(fox()));
        assert!(tab.input.is_empty());
        assert!(tab.image.is_none());
        assert!(tab.begin_submit().is_none());
    }

    #[tokio::test]
    async fn chat_sends_prior_turns_as_history() {
        let mut tab = ChatTab::new(ChatFailurePolicy::Revert, Duration::ZERO);
        tab.input = "Hi".into();
        tab.begin_submit().unwrap();
        tab.complete(Ok(ReasoningResponse { answer: "Hello! 👋".into() }));

        tab.input = "What's 2+2?".into();
        let request = tab.begin_submit().unwrap();
        let roles: Vec<_> = request.history.iter().map(|t| t.role).collect();
        assert_eq!(roles, vec![ChatRole::User, ChatRole::Bot]);
        assert_eq!(request.history[1].content, "Hello! 👋");
    }

    #[test]
    fn chat_revert_restores_input_and_image() {
        let mut tab = ChatTab::new(ChatFailurePolicy::Revert, Duration::ZERO);
        tab.input = "Describe this".into();
        tab.image = Some(fox());
        tab.begin_submit().unwrap();

        tab.complete(Err(failure()));
        assert!(tab.entries.is_empty());
        assert_eq!(tab.input, "Describe this");
        assert_eq!(tab.image, Some(fox()));
        assert!(tab.error.is_some());
        assert!(!tab.loading);
    }

    #[test]
    fn chat_inline_appends_error_message() {
        let mut tab = ChatTab::new(ChatFailurePolicy::Inline, Duration::ZERO);
        tab.input = "Hi".into();
        tab.begin_submit().unwrap();

        tab.complete(Err(failure()));
        let messages: Vec<_> = tab.messages().collect();
        assert_eq!(messages.len(), 2);
        assert_eq!(messages[0].role, ChatRole::User);
        assert!(messages[1].is_error);
        assert!(messages[1].content.starts_with("Error: "));
        assert!(tab.input.is_empty());

        tab.input = "Again".into();
        let request = tab.begin_submit().unwrap();
        assert_eq!(request.history.len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn chat_answer_is_revealed_over_time() {
        let mut tab = ChatTab::new(ChatFailurePolicy::Revert, Duration::from_millis(10));
        tab.input = "Hi".into();
        tab.begin_submit().unwrap();
        tab.complete(Ok(ReasoningResponse { answer: "Hello there".into() }));

        assert!(tab.is_revealing());
        assert_eq!(tab.entries[1].message.content, "Hello there");

        tokio::time::sleep(Duration::from_millis(500)).await;
        assert!(!tab.is_revealing());
        assert_eq!(tab.entries[1].display_text(), "Hello there");
    }

    #[tokio::test(start_paused = true)]
    async fn finish_reveals_skips_animation() {
        let mut tab = ChatTab::new(ChatFailurePolicy::Revert, Duration::from_secs(1));
        tab.input = "Hi".into();
        tab.begin_submit().unwrap();
        tab.complete(Ok(ReasoningResponse { answer: "Hello".into() }));
        tab.finish_reveals();
        assert_eq!(tab.entries[1].display_text(), "Hello");
    }
}
