use serde::{Deserialize, Serialize};

use super::{http_client, read_body, request_error, Timeouts};
use crate::error::ModelInvocationError;
use crate::model::{ImageOutput, ModelBackend, ReasoningOutput};
use crate::prompt::{Prompt, PromptPart};

const API_URL: &str = "https://api.anthropic.com/v1/messages";
const API_VERSION: &str = "2023-06-01";
pub const DEFAULT_REASONING_MODEL: &str = "claude-sonnet-4-20250514";

#[derive(Serialize)]
struct ClaudeMessage {
    role: &'static str,
    content: Vec<ClaudeBlock>,
}

#[derive(Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum ClaudeBlock {
    Text { text: String },
    Image { source: ClaudeImageSource },
}

#[derive(Serialize)]
struct ClaudeImageSource {
    #[serde(rename = "type")]
    kind: &'static str,
    media_type: String,
    data: String,
}

#[derive(Serialize)]
struct ClaudeRequest<'a> {
    model: &'a str,
    max_tokens: u32,
    messages: Vec<ClaudeMessage>,
}

#[derive(Deserialize)]
struct ClaudeContent {
    #[serde(rename = "type")]
    kind: String,
    #[serde(default)]
    text: String,
}

#[derive(Deserialize)]
struct ClaudeResponse {
    #[serde(default)]
    content: Vec<ClaudeContent>,
}

fn to_blocks(prompt: &Prompt) -> Vec<ClaudeBlock> {
    prompt
        .parts()
        .iter()
        .map(|part| match part {
            PromptPart::Text(text) => ClaudeBlock::Text { text: text.clone() },
            PromptPart::Image(image) => ClaudeBlock::Image {
                source: ClaudeImageSource {
                    kind: "base64",
                    media_type: image.mime_type().to_string(),
                    data: image.base64_data().to_string(),
                },
            },
        })
        .collect()
}

pub fn parse_response(body: &str) -> Result<ReasoningOutput, ModelInvocationError> {
    let response: ClaudeResponse =
        serde_json::from_str(body).map_err(|e| ModelInvocationError::Parse(e.to_string()))?;
    let text: String = response
        .content
        .into_iter()
        .filter(|c| c.kind == "text")
        .map(|c| c.text)
        .collect();
    Ok(if text.is_empty() { None } else { Some(text) })
}

#[derive(Clone)]
pub struct ClaudeClient {
    client: reqwest::Client,
    api_key: String,
    model: String,
}

impl ClaudeClient {
    pub fn new(api_key: &str, model: Option<&str>, timeouts: Timeouts) -> Result<Self, ModelInvocationError> {
        Ok(Self {
            client: http_client(timeouts)?,
            api_key: api_key.to_string(),
            model: model.unwrap_or(DEFAULT_REASONING_MODEL).to_string(),
        })
    }

    pub fn list_models() -> Vec<String> {
        vec![
            "claude-sonnet-4-20250514".to_string(),
            "claude-3-5-sonnet-20241022".to_string(),
            "claude-3-5-haiku-20241022".to_string(),
        ]
    }
}

#[async_trait::async_trait]
impl ModelBackend for ClaudeClient {
    fn name(&self) -> &'static str {
        "Claude"
    }

    fn reasoning_model(&self) -> &str {
        &self.model
    }

    fn image_model(&self) -> &str {
        ""
    }

    async fn invoke_reasoning_model(
        &self,
        prompt: &Prompt,
    ) -> Result<ReasoningOutput, ModelInvocationError> {
        let request = ClaudeRequest {
            model: &self.model,
            max_tokens: 4096,
            messages: vec![ClaudeMessage {
                role: "user",
                content: to_blocks(prompt),
            }],
        };

        let response = self
            .client
            .post(API_URL)
            .header("x-api-key", &self.api_key)
            .header("anthropic-version", API_VERSION)
            .header("content-type", "application/json")
            .json(&request)
            .send()
            .await
            .map_err(request_error)?;

        parse_response(&read_body(response).await?)
    }

    async fn invoke_image_model(&self, _prompt: &str) -> Result<ImageOutput, ModelInvocationError> {
        Err(ModelInvocationError::Unsupported {
            provider: "Claude",
            capability: "image generation",
        })
    }
}
