//! Minimal client for the Moonshot (Kimi) chat-completions API.

pub mod error;
pub mod types;

pub use error::{MoonshotError, Result};
pub use types::{ChatRequest, ChatResponse, Message, Role};

use std::time::Duration;
use tracing::debug;

const MOONSHOT_API_URL: &str = "https://api.moonshot.cn/v1";
pub const MODEL_V1_8K: &str = "moonshot-v1-8k";

pub struct MoonshotClient {
    client: reqwest::Client,
    base_url: String,
    api_key: String,
}

impl MoonshotClient {
    pub fn new(api_key: &str) -> Self {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(60))
            .build()
            .expect("Failed to build HTTP client");

        Self {
            client,
            base_url: MOONSHOT_API_URL.to_string(),
            api_key: api_key.to_string(),
        }
    }

    pub fn with_base_url(mut self, url: &str) -> Self {
        self.base_url = url.trim_end_matches('/').to_string();
        self
    }

    pub async fn chat(&self, request: &ChatRequest) -> Result<ChatResponse> {
        let endpoint = format!("{}/chat/completions", self.base_url);

        debug!(model = %request.model, messages = request.messages.len(), "Moonshot chat request");

        let resp = self
            .client
            .post(&endpoint)
            .bearer_auth(&self.api_key)
            .header("Content-Type", "application/json")
            .json(request)
            .send()
            .await?;

        let status = resp.status();
        if !status.is_success() {
            let message = resp.text().await.unwrap_or_default();
            return Err(MoonshotError::Api {
                status: status.as_u16(),
                message,
            });
        }

        Ok(resp.json().await?)
    }

    /// One completion round-trip: system prompt + user content in, the first
    /// choice's content out.
    pub async fn complete(&self, system_prompt: &str, content: &str) -> Result<String> {
        let request = ChatRequest {
            model: MODEL_V1_8K.to_string(),
            temperature: 0.0,
            stream: false,
            messages: vec![
                Message {
                    role: Role::System,
                    content: system_prompt.to_string(),
                },
                Message {
                    role: Role::User,
                    content: content.to_string(),
                },
            ],
        };

        let response = self.chat(&request).await?;
        response
            .choices
            .into_iter()
            .next()
            .map(|c| c.message.content)
            .ok_or(MoonshotError::EmptyCompletion)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn chat_request_serializes_to_openai_shape() {
        let request = ChatRequest {
            model: MODEL_V1_8K.to_string(),
            temperature: 0.0,
            stream: false,
            messages: vec![Message {
                role: Role::System,
                content: "Translate.".to_string(),
            }],
        };

        let value = serde_json::to_value(&request).unwrap();
        assert_eq!(value["model"], "moonshot-v1-8k");
        assert_eq!(value["messages"][0]["role"], "system");
        assert_eq!(value["temperature"], 0.0);
    }

    #[test]
    fn chat_response_parses_choices() {
        let body = r#"{
            "choices": [
                {"message": {"role": "assistant", "content": "Bitcoin hits new high"}}
            ]
        }"#;
        let response: ChatResponse = serde_json::from_str(body).unwrap();
        assert_eq!(response.choices[0].message.content, "Bitcoin hits new high");
    }
}
