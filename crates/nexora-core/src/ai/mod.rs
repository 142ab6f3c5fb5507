pub mod claude;
pub mod gemini;
pub mod ollama;
pub mod openai;

pub use claude::ClaudeClient;
pub use gemini::GeminiClient;
pub use ollama::OllamaClient;
pub use openai::OpenAIClient;

use std::time::Duration;

use crate::error::ModelInvocationError;

/// Connect and request timeouts applied to every provider client.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Timeouts {
    pub connect: Duration,
    pub request: Duration,
}

impl Default for Timeouts {
    fn default() -> Self {
        Self {
            connect: Duration::from_secs(10),
            request: Duration::from_secs(120),
        }
    }
}

pub(crate) fn http_client(timeouts: Timeouts) -> Result<reqwest::Client, ModelInvocationError> {
    reqwest::Client::builder()
        .connect_timeout(timeouts.connect)
        .timeout(timeouts.request)
        .build()
        .map_err(|e| ModelInvocationError::HttpClientBuild(e.to_string()))
}

/// Read a response body, turning non-success statuses into errors.
pub(crate) async fn read_body(response: reqwest::Response) -> Result<String, ModelInvocationError> {
    let status = response.status();
    let text = response
        .text()
        .await
        .map_err(|e| ModelInvocationError::Request(e.to_string()))?;

    if !status.is_success() {
        return Err(ModelInvocationError::Status {
            status: status.as_u16(),
            body: text,
        });
    }
    Ok(text)
}

pub(crate) fn request_error(e: reqwest::Error) -> ModelInvocationError {
    ModelInvocationError::Request(e.to_string())
}
