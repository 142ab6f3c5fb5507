//! AI flows: typed request/response wrappers around one model invocation.
//!
//! Each flow validates its input, builds the provider-neutral prompt, calls
//! the backend exactly once, and validates what came back. Failures propagate
//! as a single [`FlowError`]; nothing is retried.

use std::time::Instant;

use serde::{Deserialize, Serialize};

use crate::data_uri::ImageDataUri;
use crate::error::{FlowError, ModelInvocationError, ValidationError};
use crate::model::ModelBackend;
use crate::prompt::build_reasoning_prompt;
use crate::state::HistoryTurn;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReasoningRequest {
    pub question: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image_data_uri: Option<ImageDataUri>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub history: Vec<HistoryTurn>,
}

impl ReasoningRequest {
    pub fn new(question: impl Into<String>) -> Self {
        Self {
            question: question.into(),
            ..Self::default()
        }
    }

    pub fn with_image(mut self, image: Option<ImageDataUri>) -> Self {
        self.image_data_uri = image;
        self
    }

    pub fn with_history(mut self, history: Vec<HistoryTurn>) -> Self {
        self.history = history;
        self
    }

    /// At least one of question or image must be present.
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.question.trim().is_empty() && self.image_data_uri.is_none() {
            return Err(ValidationError::EmptyInput);
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReasoningResponse {
    pub answer: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImageRequest {
    pub prompt: String,
}

impl ImageRequest {
    pub fn new(prompt: impl Into<String>) -> Self {
        Self { prompt: prompt.into() }
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.prompt.trim().is_empty() {
            return Err(ValidationError::EmptyInput);
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImageResponse {
    pub image: ImageDataUri,
}

/// Answer a question, optionally about an image, in light of prior turns.
pub async fn respond_with_reasoning(
    backend: &dyn ModelBackend,
    request: &ReasoningRequest,
) -> Result<ReasoningResponse, FlowError> {
    request.validate()?;

    let prompt = build_reasoning_prompt(
        &request.question,
        request.image_data_uri.as_ref(),
        &request.history,
    );
    tracing::debug!(
        provider = backend.name(),
        prompt_chars = prompt.text_len(),
        history_turns = request.history.len(),
        has_image = request.image_data_uri.is_some(),
        "invoking reasoning model"
    );

    let started = Instant::now();
    let result = backend.invoke_reasoning_model(&prompt).await;
    let elapsed_ms = started.elapsed().as_millis() as u64;

    match result {
        Ok(Some(answer)) => {
            tracing::info!(
                provider = backend.name(),
                model = backend.reasoning_model(),
                elapsed_ms,
                "reasoning answer received"
            );
            Ok(ReasoningResponse { answer })
        }
        Ok(None) => {
            tracing::warn!(
                provider = backend.name(),
                elapsed_ms,
                "reasoning model returned no answer"
            );
            Err(ModelInvocationError::MissingAnswer.into())
        }
        Err(e) => {
            tracing::warn!(
                provider = backend.name(),
                elapsed_ms,
                error = %e,
                "reasoning model call failed"
            );
            Err(e.into())
        }
    }
}

/// Generate one image from a text prompt.
pub async fn generate_image(
    backend: &dyn ModelBackend,
    request: &ImageRequest,
) -> Result<ImageResponse, FlowError> {
    request.validate()?;

    let started = Instant::now();
    let result = backend.invoke_image_model(&request.prompt).await;
    let elapsed_ms = started.elapsed().as_millis() as u64;

    let raw = match result {
        Ok(Some(raw)) => raw,
        Ok(None) => {
            tracing::warn!(provider = backend.name(), elapsed_ms, "image model returned no image");
            return Err(ModelInvocationError::MissingImage.into());
        }
        Err(e) => {
            tracing::warn!(
                provider = backend.name(),
                elapsed_ms,
                error = %e,
                "image model call failed"
            );
            return Err(e.into());
        }
    };

    let image = ImageDataUri::parse(raw)
        .map_err(|e| ModelInvocationError::Parse(format!("image payload: {}", e)))?;
    tracing::info!(
        provider = backend.name(),
        model = backend.image_model(),
        elapsed_ms,
        mime = image.mime_type(),
        bytes = image.decoded_len(),
        "image received"
    );
    Ok(ImageResponse { image })
}

#[cfg(test)]
pub(crate) mod testing {
    //! A scripted backend shared by flow and tab tests.

    use std::collections::VecDeque;
    use std::sync::Mutex;

    use crate::error::ModelInvocationError;
    use crate::model::{ImageOutput, ModelBackend, ReasoningOutput};
    use crate::prompt::Prompt;

    pub(crate) struct MockBackend {
        answers: Mutex<VecDeque<Result<ReasoningOutput, ModelInvocationError>>>,
        images: Mutex<VecDeque<Result<ImageOutput, ModelInvocationError>>>,
        pub(crate) prompts: Mutex<Vec<Prompt>>,
        pub(crate) image_prompts: Mutex<Vec<String>>,
    }

    impl MockBackend {
        pub(crate) fn new() -> Self {
            Self {
                answers: Mutex::new(VecDeque::new()),
                images: Mutex::new(VecDeque::new()),
                prompts: Mutex::new(Vec::new()),
                image_prompts: Mutex::new(Vec::new()),
            }
        }

        pub(crate) fn answer(self, result: Result<ReasoningOutput, ModelInvocationError>) -> Self {
            self.answers.lock().unwrap().push_back(result);
            self
        }

        pub(crate) fn image(self, result: Result<ImageOutput, ModelInvocationError>) -> Self {
            self.images.lock().unwrap().push_back(result);
            self
        }

        pub(crate) fn calls(&self) -> usize {
            self.prompts.lock().unwrap().len() + self.image_prompts.lock().unwrap().len()
        }
    }

    #[async_trait::async_trait]
    impl ModelBackend for MockBackend {
        fn name(&self) -> &'static str {
            "Mock"
        }

        fn reasoning_model(&self) -> &str {
            "mock-reasoning"
        }

        fn image_model(&self) -> &str {
            "mock-image"
        }

        async fn invoke_reasoning_model(
            &self,
            prompt: &Prompt,
        ) -> Result<ReasoningOutput, ModelInvocationError> {
            self.prompts.lock().unwrap().push(prompt.clone());
            self.answers
                .lock()
                .unwrap()
                .pop_front()
                .unwrap_or(Ok(Some("done".into())))
        }

        async fn invoke_image_model(&self, prompt: &str) -> Result<ImageOutput, ModelInvocationError> {
            self.image_prompts.lock().unwrap().push(prompt.to_string());
            self.images.lock().unwrap().pop_front().unwrap_or(Ok(None))
        }
    }
}
