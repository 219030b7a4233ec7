use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};
use std::time::Duration;

use super::{prompt, VisionClient, VisionRequest};
use crate::config::AppConfig;
use crate::error::AnalysisError;

#[derive(Debug, Serialize)]
struct OpenAIRequest {
    model: String,
    messages: Vec<OpenAIMessage>,
    max_tokens: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    response_format: Option<serde_json::Value>,
}

#[derive(Debug, Serialize)]
struct OpenAIMessage {
    role: String,
    content: serde_json::Value,
}

#[derive(Debug, Deserialize)]
struct OpenAIResponse {
    #[serde(default)]
    choices: Vec<OpenAIChoice>,
}

#[derive(Debug, Deserialize)]
struct OpenAIChoice {
    message: OpenAIMessageResponse,
}

#[derive(Debug, Deserialize)]
struct OpenAIMessageResponse {
    content: Option<String>,
}

#[derive(Debug, Deserialize)]
struct OpenAIErrorBody {
    error: Option<OpenAIErrorDetail>,
}

#[derive(Debug, Deserialize)]
struct OpenAIErrorDetail {
    message: Option<String>,
}

/// Chat completions client for vision-capable OpenAI models.
#[derive(Debug, Clone)]
pub struct OpenAIVisionClient {
    client: Client,
    api_key: String,
    model: String,
    url: String,
    timeout: Duration,
}

impl OpenAIVisionClient {
    pub fn new(config: &AppConfig) -> Result<Self, AnalysisError> {
        let timeout = config.request_timeout();
        // The analysis workflow owns the overall deadline.
        let client = Client::builder().connect_timeout(timeout).build()?;

        Ok(Self {
            client,
            api_key: config.openai_api_key.clone(),
            model: config.openai_model.clone(),
            url: config.chat_completions_url(),
            timeout,
        })
    }

    fn request_error(&self, e: reqwest::Error) -> AnalysisError {
        if e.is_timeout() {
            AnalysisError::Timeout(self.timeout)
        } else {
            e.into()
        }
    }

    fn build_request(&self, request: VisionRequest) -> OpenAIRequest {
        let image_url = request.image_data_uri();
        let response_format = request.response_schema.map(|schema| {
            serde_json::json!({
                "type": "json_schema",
                "json_schema": {
                    "name": prompt::SCHEMA_NAME,
                    "strict": true,
                    "schema": schema
                }
            })
        });

        OpenAIRequest {
            model: self.model.clone(),
            messages: vec![OpenAIMessage {
                role: "user".to_string(),
                content: serde_json::json!([
                    {
                        "type": "text",
                        "text": request.prompt
                    },
                    {
                        "type": "image_url",
                        "image_url": {
                            "url": image_url
                        }
                    }
                ]),
            }],
            max_tokens: request.max_tokens,
            response_format,
        }
    }
}

impl VisionClient for OpenAIVisionClient {
    async fn complete(&self, request: VisionRequest) -> Result<String, AnalysisError> {
        if self.api_key.is_empty() {
            return Err(AnalysisError::MissingApiKey);
        }

        let body = self.build_request(request);
        log::debug!("Sending vision request to {} (model {})", self.url, self.model);

        let response = self
            .client
            .post(&self.url)
            .header("Authorization", format!("Bearer {}", self.api_key))
            .header("Content-Type", "application/json")
            .json(&body)
            .send()
            .await
            .map_err(|e| self.request_error(e))?;

        let status = response.status();
        log::debug!("Response status: {}", status);
        let text = response.text().await.map_err(|e| self.request_error(e))?;

        parse_completion(status, &text)
    }
}

/// Pull the reply text out of a chat completion response.
pub fn parse_completion(status: StatusCode, body: &str) -> Result<String, AnalysisError> {
    if !status.is_success() {
        let message = serde_json::from_str::<OpenAIErrorBody>(body)
            .ok()
            .and_then(|b| b.error)
            .and_then(|e| e.message)
            .unwrap_or_else(|| "Unknown error".to_string());
        return Err(AnalysisError::Api(format!("{} ({})", message, status)));
    }

    let parsed: OpenAIResponse = serde_json::from_str(body)
        .map_err(|e| AnalysisError::Api(format!("invalid completion body: {}", e)))?;

    let choice = parsed
        .choices
        .into_iter()
        .next()
        .ok_or_else(|| AnalysisError::Api("completion has no choices".to_string()))?;
    let content = choice.message.content.unwrap_or_default();

    if content.trim().is_empty() {
        return Err(AnalysisError::MalformedResponse(
            "response has no message content".to_string(),
        ));
    }

    Ok(content)
}
