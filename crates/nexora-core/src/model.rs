//! The model capability interface.
//!
//! Flows only ever talk to a [`ModelBackend`]. Concrete providers live in
//! [`crate::ai`]; tests substitute a mock.

use std::sync::Arc;

use crate::error::ModelInvocationError;
use crate::prompt::Prompt;

/// Raw text returned by a reasoning model.
///
/// `None` means the provider answered but the payload carried no text.
pub type ReasoningOutput = Option<String>;

/// Raw image returned by an image model, as a data URI string.
pub type ImageOutput = Option<String>;

#[async_trait::async_trait]
pub trait ModelBackend: Send + Sync {
    /// Provider name for logs and error messages.
    fn name(&self) -> &'static str;

    /// Model used for reasoning and chat.
    fn reasoning_model(&self) -> &str;

    /// Model used for image generation.
    fn image_model(&self) -> &str;

    /// Send one prompt to the reasoning model. Single request, no retry.
    async fn invoke_reasoning_model(
        &self,
        prompt: &Prompt,
    ) -> Result<ReasoningOutput, ModelInvocationError>;

    /// Ask the image model for an image. Single request, no retry.
    async fn invoke_image_model(&self, prompt: &str) -> Result<ImageOutput, ModelInvocationError>;
}

pub type SharedBackend = Arc<dyn ModelBackend>;

/// Convenience used by backends that build data URIs from inline payloads.
pub(crate) fn image_from_base64(mime: &str, data: &str) -> String {
    format!("data:{};base64,{}", mime, data)
}

