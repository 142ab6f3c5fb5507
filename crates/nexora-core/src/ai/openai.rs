use serde::{Deserialize, Serialize};

use super::{http_client, read_body, request_error, Timeouts};
use crate::error::ModelInvocationError;
use crate::model::{image_from_base64, ImageOutput, ModelBackend, ReasoningOutput};
use crate::prompt::{Prompt, PromptPart};

const CHAT_URL: &str = "https://api.openai.com/v1/chat/completions";
const IMAGES_URL: &str = "https://api.openai.com/v1/images/generations";
pub const DEFAULT_REASONING_MODEL: &str = "gpt-4o";
pub const DEFAULT_IMAGE_MODEL: &str = "dall-e-3";

#[derive(Serialize)]
struct OpenAIMessage {
    role: &'static str,
    content: Vec<OpenAIContentPart>,
}

#[derive(Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum OpenAIContentPart {
    Text { text: String },
    ImageUrl { image_url: OpenAIImageUrl },
}

#[derive(Serialize)]
struct OpenAIImageUrl {
    url: String,
}

#[derive(Serialize)]
struct OpenAIRequest<'a> {
    model: &'a str,
    messages: Vec<OpenAIMessage>,
}

#[derive(Deserialize)]
struct OpenAIChoice {
    message: OpenAIResponseMessage,
}

#[derive(Deserialize)]
struct OpenAIResponseMessage {
    content: Option<String>,
}

#[derive(Deserialize)]
struct OpenAIResponse {
    #[serde(default)]
    choices: Vec<OpenAIChoice>,
}

#[derive(Serialize)]
struct OpenAIImageRequest<'a> {
    model: &'a str,
    prompt: &'a str,
    n: u32,
    response_format: &'static str,
}

#[derive(Deserialize)]
struct OpenAIImageData {
    b64_json: Option<String>,
}

#[derive(Deserialize)]
struct OpenAIImageResponse {
    #[serde(default)]
    data: Vec<OpenAIImageData>,
}

fn to_content(prompt: &Prompt) -> Vec<OpenAIContentPart> {
    prompt
        .parts()
        .iter()
        .map(|part| match part {
            PromptPart::Text(text) => OpenAIContentPart::Text { text: text.clone() },
            PromptPart::Image(image) => OpenAIContentPart::ImageUrl {
                image_url: OpenAIImageUrl {
                    url: image.as_str().to_string(),
                },
            },
        })
        .collect()
}

pub fn parse_chat_response(body: &str) -> Result<ReasoningOutput, ModelInvocationError> {
    let response: OpenAIResponse =
        serde_json::from_str(body).map_err(|e| ModelInvocationError::Parse(e.to_string()))?;
    Ok(response
        .choices
        .into_iter()
        .next()
        .and_then(|c| c.message.content)
        .filter(|c| !c.is_empty()))
}

pub fn parse_image_response(body: &str) -> Result<ImageOutput, ModelInvocationError> {
    let response: OpenAIImageResponse =
        serde_json::from_str(body).map_err(|e| ModelInvocationError::Parse(e.to_string()))?;
    Ok(response
        .data
        .into_iter()
        .find_map(|d| d.b64_json)
        .map(|data| image_from_base64("image/png", &data)))
}

#[derive(Clone)]
pub struct OpenAIClient {
    client: reqwest::Client,
    api_key: String,
    reasoning_model: String,
    image_model: String,
}

impl OpenAIClient {
    pub fn new(
        api_key: &str,
        reasoning_model: Option<&str>,
        image_model: Option<&str>,
        timeouts: Timeouts,
    ) -> Result<Self, ModelInvocationError> {
        Ok(Self {
            client: http_client(timeouts)?,
            api_key: api_key.to_string(),
            reasoning_model: reasoning_model.unwrap_or(DEFAULT_REASONING_MODEL).to_string(),
            image_model: image_model.unwrap_or(DEFAULT_IMAGE_MODEL).to_string(),
        })
    }

    async fn post<T: Serialize>(&self, url: &str, body: &T) -> Result<String, ModelInvocationError> {
        let response = self
            .client
            .post(url)
            .header("Authorization", format!("Bearer {}", self.api_key))
            .header("Content-Type", "application/json")
            .json(body)
            .send()
            .await
            .map_err(request_error)?;

        read_body(response).await
    }

    pub fn list_models() -> Vec<String> {
        vec![
            "gpt-4o".to_string(),
            "gpt-4o-mini".to_string(),
            "gpt-4-turbo".to_string(),
        ]
    }
}

#[async_trait::async_trait]
impl ModelBackend for OpenAIClient {
    fn name(&self) -> &'static str {
        "OpenAI"
    }

    fn reasoning_model(&self) -> &str {
        &self.reasoning_model
    }

    fn image_model(&self) -> &str {
        &self.image_model
    }

    async fn invoke_reasoning_model(
        &self,
        prompt: &Prompt,
    ) -> Result<ReasoningOutput, ModelInvocationError> {
        let request = OpenAIRequest {
            model: &self.reasoning_model,
            messages: vec![OpenAIMessage {
                role: "user",
                content: to_content(prompt),
            }],
        };
        let body = self.post(CHAT_URL, &request).await?;
        parse_chat_response(&body)
    }

    async fn invoke_image_model(&self, prompt: &str) -> Result<ImageOutput, ModelInvocationError> {
        let request = OpenAIImageRequest {
            model: &self.image_model,
            prompt,
            n: 1,
            response_format: "b64_json",
        };
        let body = self.post(IMAGES_URL, &request).await?;
        parse_image_response(&body)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data_uri::ImageDataUri;

    #[test]
    fn image_parts_are_sent_as_data_urls() {
        let mut prompt = Prompt::text("What is this? ");
        prompt.push_image(ImageDataUri::parse("data:image/jpeg;base64,/9j/").unwrap());
        let json = serde_json::to_value(to_content(&prompt)).unwrap();
        assert_eq!(json[0]["type"], "text");
        assert_eq!(json[1]["type"], "image_url");
        assert_eq!(json[1]["image_url"]["url"], "data:image/jpeg;base64,/9j/");
    }

    #[test]
    fn chat_response_takes_first_choice() {
        let body = r#"{"choices":[{"message":{"role":"assistant","content":"Four."}}]}"#;
        assert_eq!(parse_chat_response(body).unwrap().as_deref(), Some("Four."));
        assert_eq!(parse_chat_response(r#"{"choices":[]}"#).unwrap(), None);
        let refusal = r#"{"choices":[{"message":{"role":"assistant","content":null}}]}"#;
        assert_eq!(parse_chat_response(refusal).unwrap(), None);
    }

    #[test]
    fn image_response_decodes_b64_json() {
        let body = r#"{"created":1,"data":[{"b64_json":"iVBORw0KGgo="}]}"#;
        assert_eq!(
            parse_image_response(body).unwrap().as_deref(),
            Some("data:image/png;base64,iVBORw0KGgo=")
        );
        assert_eq!(parse_image_response(r#"{"data":[]}"#).unwrap(), None);
    }
}
