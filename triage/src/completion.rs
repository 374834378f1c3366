//! Completion provider contract and the OpenAI-compatible HTTP client.
//!
//! One call, one hard timeout, structured usage reporting. A timed-out call
//! is abandoned and surfaces as a [`ProviderError`]; the client never
//! retries. The pipeline alone decides what a failure means.

use async_trait::async_trait;
use serde::Deserialize;
use thiserror::Error;
use tracing::debug;

use crate::config::ProviderConfig;

/// Failure modes of a provider call.
#[derive(Debug, Error)]
pub enum ProviderError {
    #[error("provider call timed out")]
    Timeout,

    #[error("provider request failed: {0}")]
    Request(String),

    #[error("provider returned status {status}: {body}")]
    BadStatus { status: u16, body: String },

    #[error("provider response was unparseable: {0}")]
    Parse(String),
}

/// Token usage reported by the provider for one call.
#[derive(Debug, Clone, Copy, Default, Deserialize)]
pub struct TokenUsage {
    #[serde(default)]
    pub prompt_tokens: u64,
    #[serde(default)]
    pub completion_tokens: u64,
    #[serde(default)]
    pub total_tokens: u64,
}

/// A completed provider call: answer text plus actual usage.
#[derive(Debug, Clone)]
pub struct Completion {
    pub text: String,
    pub usage: TokenUsage,
}

/// Seam for the paid text-completion provider.
#[async_trait]
pub trait CompletionProvider: Send + Sync {
    /// Run a single completion bounded by the client's hard timeout.
    async fn complete(
        &self,
        system_instruction: &str,
        user_content: &str,
        max_output_tokens: u32,
    ) -> Result<Completion, ProviderError>;
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<ChatChoice>,
    #[serde(default)]
    usage: TokenUsage,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatMessage,
}

#[derive(Debug, Deserialize)]
struct ChatMessage {
    #[serde(default)]
    content: String,
}

fn extract(resp: ChatResponse) -> Result<Completion, ProviderError> {
    let choice = resp
        .choices
        .into_iter()
        .next()
        .ok_or_else(|| ProviderError::Parse("response contained no choices".to_string()))?;

    Ok(Completion {
        text: choice.message.content,
        usage: resp.usage,
    })
}

/// OpenAI-compatible chat-completions client with a hard per-call timeout.
pub struct ChatCompletionClient {
    client: reqwest::Client,
    base_url: String,
    api_key: String,
    model: String,
}

impl ChatCompletionClient {
    pub fn new(config: &ProviderConfig) -> Self {
        Self {
            client: reqwest::Client::builder()
                .timeout(config.timeout)
                .build()
                .expect("Failed to create HTTP client"),
            base_url: config.base_url.trim_end_matches('/').to_string(),
            api_key: config.api_key.clone(),
            model: config.model.clone(),
        }
    }
}

#[async_trait]
impl CompletionProvider for ChatCompletionClient {
    async fn complete(
        &self,
        system_instruction: &str,
        user_content: &str,
        max_output_tokens: u32,
    ) -> Result<Completion, ProviderError> {
        let request_body = serde_json::json!({
            "model": self.model,
            "messages": [
                {"role": "system", "content": system_instruction},
                {"role": "user", "content": user_content}
            ],
            "max_tokens": max_output_tokens,
            "temperature": 0.2
        });

        let response = self
            .client
            .post(format!("{}/chat/completions", self.base_url))
            .header("Authorization", format!("Bearer {}", self.api_key))
            .header("Content-Type", "application/json")
            .json(&request_body)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    ProviderError::Timeout
                } else {
                    ProviderError::Request(e.to_string())
                }
            })?;

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let body = response.text().await.unwrap_or_default();
            return Err(ProviderError::BadStatus { status, body });
        }

        let resp: ChatResponse = response.json().await.map_err(|e| {
            if e.is_timeout() {
                ProviderError::Timeout
            } else {
                ProviderError::Parse(e.to_string())
            }
        })?;

        let completion = extract(resp)?;
        debug!(
            model = %self.model,
            total_tokens = completion.usage.total_tokens,
            "completion succeeded"
        );
        Ok(completion)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extract_takes_first_choice_and_usage() {
        let resp: ChatResponse = serde_json::from_value(serde_json::json!({
            "choices": [
                {"message": {"role": "assistant", "content": "The answer is 4."}},
                {"message": {"role": "assistant", "content": "ignored"}}
            ],
            "usage": {"prompt_tokens": 30, "completion_tokens": 12, "total_tokens": 42}
        }))
        .unwrap();

        let completion = extract(resp).unwrap();
        assert_eq!(completion.text, "The answer is 4.");
        assert_eq!(completion.usage.total_tokens, 42);
    }

    #[test]
    fn extract_fails_on_empty_choices() {
        let resp: ChatResponse =
            serde_json::from_value(serde_json::json!({"choices": [], "usage": {}})).unwrap();
        assert!(matches!(extract(resp), Err(ProviderError::Parse(_))));
    }

    #[test]
    fn missing_usage_defaults_to_zero() {
        let resp: ChatResponse = serde_json::from_value(serde_json::json!({
            "choices": [{"message": {"content": "hi"}}]
        }))
        .unwrap();
        let completion = extract(resp).unwrap();
        assert_eq!(completion.usage.total_tokens, 0);
    }
}
