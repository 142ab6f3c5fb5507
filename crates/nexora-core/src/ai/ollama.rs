use serde::{Deserialize, Serialize};

use super::{http_client, read_body, request_error, Timeouts};
use crate::error::ModelInvocationError;
use crate::model::{ImageOutput, ModelBackend, ReasoningOutput};
use crate::prompt::Prompt;

pub const DEFAULT_BASE_URL: &str = "http://localhost:11434";
pub const DEFAULT_REASONING_MODEL: &str = "llava:latest";

#[derive(Serialize)]
struct OllamaRequest<'a> {
    model: &'a str,
    prompt: String,
    stream: bool,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    images: Vec<String>,
}

#[derive(Deserialize)]
struct OllamaResponse {
    #[serde(default)]
    response: String,
}

#[derive(Deserialize)]
struct OllamaModel {
    name: String,
}

#[derive(Deserialize)]
struct OllamaModelsResponse {
    models: Vec<OllamaModel>,
}

pub fn parse_response(body: &str) -> Result<ReasoningOutput, ModelInvocationError> {
    let response: OllamaResponse =
        serde_json::from_str(body).map_err(|e| ModelInvocationError::Parse(e.to_string()))?;
    Ok(if response.response.is_empty() { None } else { Some(response.response) })
}

#[derive(Clone)]
pub struct OllamaClient {
    client: reqwest::Client,
    base_url: String,
    model: String,
}

impl OllamaClient {
    pub fn new(base_url: &str, model: Option<&str>, timeouts: Timeouts) -> Result<Self, ModelInvocationError> {
        Ok(Self {
            client: http_client(timeouts)?,
            base_url: base_url.trim_end_matches('/').to_string(),
            model: model.unwrap_or(DEFAULT_REASONING_MODEL).to_string(),
        })
    }

    pub async fn list_models(&self) -> Result<Vec<String>, ModelInvocationError> {
        let url = format!("{}/api/tags", self.base_url);

        let response = self.client.get(&url).send().await.map_err(request_error)?;
        let body = read_body(response).await?;

        let models_response: OllamaModelsResponse =
            serde_json::from_str(&body).map_err(|e| ModelInvocationError::Parse(e.to_string()))?;
        Ok(models_response
            .models
            .into_iter()
            .map(|model| model.name)
            .collect())
    }
}

#[async_trait::async_trait]
impl ModelBackend for OllamaClient {
    fn name(&self) -> &'static str {
        "Ollama"
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
        let url = format!("{}/api/generate", self.base_url);

        // Ollama takes images out-of-band, next to the prompt text
        let request = OllamaRequest {
            model: &self.model,
            prompt: prompt.flatten_text(),
            stream: false,
            images: prompt.images().map(|i| i.base64_data().to_string()).collect(),
        };

        let response = self
            .client
            .post(&url)
            .json(&request)
            .send()
            .await
            .map_err(|e| {
                ModelInvocationError::Request(format!(
                    "{}. Make sure Ollama is running with: ollama serve",
                    e
                ))
            })?;

        parse_response(&read_body(response).await?)
    }

    async fn invoke_image_model(&self, _prompt: &str) -> Result<ImageOutput, ModelInvocationError> {
        Err(ModelInvocationError::Unsupported {
            provider: "Ollama",
            capability: "image generation",
        })
    }
}
