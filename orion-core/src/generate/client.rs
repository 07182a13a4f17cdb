//! Chat-completions client

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};

use crate::config::LlmConfig;
use crate::{Error, Result};

/// A model that answers a system + user prompt pair
#[async_trait]
pub trait ChatModel: Send + Sync {
    /// Complete a prompt; `json` requests a JSON-object response
    async fn complete(&self, system: &str, user: &str, json: bool) -> Result<String>;

    /// Model identifier for logs
    fn model(&self) -> &str;
}

/// OpenAI-compatible chat-completions client
pub struct LlmClient {
    client: Client,
    api_url: String,
    api_key: String,
    model: String,
    temperature: f32,
    max_tokens: u32,
}

impl std::fmt::Debug for LlmClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LlmClient")
            .field("api_url", &self.api_url)
            .field("model", &self.model)
            .finish_non_exhaustive()
    }
}

impl LlmClient {
    pub fn new(api_key: &str, config: &LlmConfig) -> Self {
        Self {
            client: Client::new(),
            api_url: config.api_url.clone(),
            api_key: api_key.to_string(),
            model: config.model.clone(),
            temperature: config.temperature,
            max_tokens: config.max_tokens,
        }
    }

    pub async fn send(&self, request: &CompletionRequest<'_>) -> Result<CompletionResponse> {
        let response = self
            .client
            .post(&self.api_url)
            .bearer_auth(&self.api_key)
            .json(request)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(Error::Generation(format!("API returned {status}: {body}")));
        }

        Ok(response.json::<CompletionResponse>().await?)
    }
}

#[async_trait]
impl ChatModel for LlmClient {
    async fn complete(&self, system: &str, user: &str, json: bool) -> Result<String> {
        let request = CompletionRequest {
            model: &self.model,
            messages: vec![
                Message {
                    role: "system",
                    content: system,
                },
                Message {
                    role: "user",
                    content: user,
                },
            ],
            temperature: self.temperature,
            max_completion_tokens: self.max_tokens,
            response_format: json.then_some(ResponseFormat {
                kind: "json_object",
            }),
        };

        tracing::debug!(model = %self.model, json, "Sending completion request");
        let response = self.send(&request).await?;
        response.text()
    }

    fn model(&self) -> &str {
        &self.model
    }
}

// --- Request types ---

#[derive(Debug, Serialize)]
pub struct CompletionRequest<'a> {
    pub model: &'a str,
    pub messages: Vec<Message<'a>>,
    pub temperature: f32,
    pub max_completion_tokens: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub response_format: Option<ResponseFormat>,
}

#[derive(Debug, Serialize)]
pub struct Message<'a> {
    pub role: &'a str,
    pub content: &'a str,
}

#[derive(Debug, Serialize)]
pub struct ResponseFormat {
    #[serde(rename = "type")]
    pub kind: &'static str,
}

// --- Response types ---

#[derive(Debug, Deserialize)]
pub struct CompletionResponse {
    pub choices: Vec<Choice>,
}

#[derive(Debug, Deserialize)]
pub struct Choice {
    pub message: ResponseMessage,
    pub finish_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct ResponseMessage {
    pub content: Option<String>,
}

impl CompletionResponse {
    /// Text of the first choice
    pub fn text(self) -> Result<String> {
        self.choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .filter(|c| !c.trim().is_empty())
            .ok_or_else(|| Error::Generation("Model returned an empty response".to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request_shape() {
        let request = CompletionRequest {
            model: "gpt-5-mini",
            messages: vec![Message {
                role: "user",
                content: "hi",
            }],
            temperature: 1.0,
            max_completion_tokens: 100,
            response_format: Some(ResponseFormat {
                kind: "json_object",
            }),
        };
        let json = serde_json::to_value(&request).unwrap();
        assert_eq!(json["response_format"]["type"], "json_object");
        assert_eq!(json["messages"][0]["role"], "user");

        let plain = CompletionRequest {
            response_format: None,
            ..request
        };
        let json = serde_json::to_value(&plain).unwrap();
        assert!(json.get("response_format").is_none());
    }

    #[test]
    fn test_response_text() {
        let body = r#"{"choices":[{"message":{"content":"hello"},"finish_reason":"stop"}]}"#;
        let response: CompletionResponse = serde_json::from_str(body).unwrap();
        assert_eq!(response.text().unwrap(), "hello");

        let empty: CompletionResponse = serde_json::from_str(r#"{"choices":[]}"#).unwrap();
        assert!(empty.text().is_err());
    }
}
