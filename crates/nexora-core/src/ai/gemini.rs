//! Google Gemini `generateContent` client.
//!
//! The only default provider that can produce images. The image model must be
//! asked for both TEXT and IMAGE response modalities; IMAGE alone is refused.

use serde::{Deserialize, Serialize};

use super::{http_client, read_body, request_error, Timeouts};
use crate::error::ModelInvocationError;
use crate::model::{image_from_base64, ImageOutput, ModelBackend, ReasoningOutput};
use crate::prompt::{Prompt, PromptPart};

pub const DEFAULT_BASE_URL: &str = "https://generativelanguage.googleapis.com";
pub const DEFAULT_REASONING_MODEL: &str = "gemini-2.0-flash";
pub const DEFAULT_IMAGE_MODEL: &str = "gemini-2.0-flash-preview-image-generation";

#[derive(Debug, Clone, Serialize, Deserialize)]
struct Content {
    #[serde(skip_serializing_if = "Option::is_none")]
    role: Option<String>,
    #[serde(default)]
    parts: Vec<Part>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Part {
    #[serde(skip_serializing_if = "Option::is_none")]
    text: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    inline_data: Option<InlineData>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct InlineData {
    mime_type: String,
    data: String,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerationConfig {
    response_modalities: Vec<&'static str>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerateContentRequest {
    contents: Vec<Content>,
    #[serde(skip_serializing_if = "Option::is_none")]
    generation_config: Option<GenerationConfig>,
}

#[derive(Deserialize)]
struct GenerateContentResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Deserialize)]
struct Candidate {
    content: Option<Content>,
}

fn to_parts(prompt: &Prompt) -> Vec<Part> {
    prompt
        .parts()
        .iter()
        .map(|part| match part {
            PromptPart::Text(text) => Part {
                text: Some(text.clone()),
                inline_data: None,
            },
            PromptPart::Image(image) => Part {
                text: None,
                inline_data: Some(InlineData {
                    mime_type: image.mime_type().to_string(),
                    data: image.base64_data().to_string(),
                }),
            },
        })
        .collect()
}

fn first_candidate_parts(body: &str) -> Result<Vec<Part>, ModelInvocationError> {
    let response: GenerateContentResponse =
        serde_json::from_str(body).map_err(|e| ModelInvocationError::Parse(e.to_string()))?;
    Ok(response
        .candidates
        .into_iter()
        .next()
        .and_then(|c| c.content)
        .map(|c| c.parts)
        .unwrap_or_default())
}

/// Concatenate the text parts of the first candidate.
pub fn parse_text_response(body: &str) -> Result<ReasoningOutput, ModelInvocationError> {
    let text: String = first_candidate_parts(body)?
        .into_iter()
        .filter_map(|p| p.text)
        .collect();
    Ok(if text.is_empty() { None } else { Some(text) })
}

/// The first inline image of the first candidate, as a data URI.
pub fn parse_image_response(body: &str) -> Result<ImageOutput, ModelInvocationError> {
    Ok(first_candidate_parts(body)?
        .into_iter()
        .filter_map(|p| p.inline_data)
        .find(|d| d.mime_type.starts_with("image/"))
        .map(|d| image_from_base64(&d.mime_type, &d.data)))
}

#[derive(Clone)]
pub struct GeminiClient {
    client: reqwest::Client,
    api_key: String,
    base_url: String,
    reasoning_model: String,
    image_model: String,
}

impl GeminiClient {
    pub fn new(
        api_key: &str,
        reasoning_model: Option<&str>,
        image_model: Option<&str>,
        timeouts: Timeouts,
    ) -> Result<Self, ModelInvocationError> {
        Ok(Self {
            client: http_client(timeouts)?,
            api_key: api_key.to_string(),
            base_url: DEFAULT_BASE_URL.to_string(),
            reasoning_model: reasoning_model.unwrap_or(DEFAULT_REASONING_MODEL).to_string(),
            image_model: image_model.unwrap_or(DEFAULT_IMAGE_MODEL).to_string(),
        })
    }

    pub fn with_base_url(mut self, base_url: &str) -> Self {
        self.base_url = base_url.trim_end_matches('/').to_string();
        self
    }

    async fn generate(
        &self,
        model: &str,
        request: &GenerateContentRequest,
    ) -> Result<String, ModelInvocationError> {
        let url = format!("{}/v1beta/models/{}:generateContent", self.base_url, model);

        let response = self
            .client
            .post(&url)
            .header("x-goog-api-key", &self.api_key)
            .json(request)
            .send()
            .await
            .map_err(request_error)?;

        read_body(response).await
    }

    pub fn list_models() -> Vec<String> {
        vec![
            DEFAULT_REASONING_MODEL.to_string(),
            "gemini-2.5-flash".to_string(),
            "gemini-2.5-pro".to_string(),
            "gemini-1.5-pro".to_string(),
        ]
    }
}

#[async_trait::async_trait]
impl ModelBackend for GeminiClient {
    fn name(&self) -> &'static str {
        "Gemini"
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
        let request = GenerateContentRequest {
            contents: vec![Content {
                role: Some("user".to_string()),
                parts: to_parts(prompt),
            }],
            generation_config: None,
        };
        let body = self.generate(&self.reasoning_model, &request).await?;
        parse_text_response(&body)
    }

    async fn invoke_image_model(&self, prompt: &str) -> Result<ImageOutput, ModelInvocationError> {
        let request = GenerateContentRequest {
            contents: vec![Content {
                role: Some("user".to_string()),
                parts: vec![Part {
                    text: Some(prompt.to_string()),
                    inline_data: None,
                }],
            }],
            generation_config: Some(GenerationConfig {
                response_modalities: vec!["TEXT", "IMAGE"],
            }),
        };
        let body = self.generate(&self.image_model, &request).await?;
        parse_image_response(&body)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data_uri::ImageDataUri;

    #[test]
    fn request_serializes_inline_image_and_modalities() {
        let mut prompt = Prompt::text("Look: ");
        prompt.push_image(ImageDataUri::parse("data:image/png;base64,AAAA").unwrap());
        let request = GenerateContentRequest {
            contents: vec![Content {
                role: Some("user".into()),
                parts: to_parts(&prompt),
            }],
            generation_config: Some(GenerationConfig {
                response_modalities: vec!["TEXT", "IMAGE"],
            }),
        };
        let json = serde_json::to_value(&request).unwrap();
        assert_eq!(json["contents"][0]["parts"][0]["text"], "Look: ");
        assert_eq!(json["contents"][0]["parts"][1]["inlineData"]["mimeType"], "image/png");
        assert_eq!(json["contents"][0]["parts"][1]["inlineData"]["data"], "AAAA");
        assert!(json["contents"][0]["parts"][1].get("text").is_none());
        assert_eq!(
            json["generationConfig"]["responseModalities"],
            serde_json::json!(["TEXT", "IMAGE"])
        );
    }

    #[test]
    fn text_parts_are_concatenated() {
        let body = r#"{"candidates":[{"content":{"role":"model","parts":[{"text":"2+2 is "},{"text":"4 🎉"}]}}]}"#;
        assert_eq!(parse_text_response(body).unwrap().as_deref(), Some("2+2 is 4 🎉"));
    }

    #[test]
    fn empty_candidates_mean_no_answer() {
        assert_eq!(parse_text_response(r#"{"candidates":[]}"#).unwrap(), None);
        assert_eq!(parse_text_response(r#"{}"#).unwrap(), None);
        assert_eq!(parse_image_response(r#"{"candidates":[{}]}"#).unwrap(), None);
    }

    #[test]
    fn image_part_becomes_data_uri() {
        let body = r#"{"candidates":[{"content":{"parts":[
            {"text":"Here is your fox"},
            {"inlineData":{"mimeType":"image/png","data":"iVBORw0KGgo="}}
        ]}}]}"#;
        assert_eq!(
            parse_image_response(body).unwrap().as_deref(),
            Some("data:image/png;base64,iVBORw0KGgo=")
        );
    }

    #[test]
    fn base_url_override_drops_trailing_slash() {
        let client = GeminiClient::new("key", None, None, Timeouts::default())
            .unwrap()
            .with_base_url("http://localhost:8080/");
        assert_eq!(client.base_url, "http://localhost:8080");
        assert_eq!(client.reasoning_model, DEFAULT_REASONING_MODEL);
    }

    #[test]
    fn malformed_body_is_parse_error() {
        assert!(matches!(
            parse_text_response("not json"),
            Err(ModelInvocationError::Parse(_))
        ));
    }
}
