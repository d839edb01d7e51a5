//! AI completion provider / AI补全提供方
//!
//! Non-streaming chat completion client. The trait keeps the ranker testable
//! and the concrete backend swappable; the OpenRouter implementation reports
//! output truncation so callers can attempt JSON repair.

use async_trait::async_trait;
use serde::Deserialize;
use std::time::Duration;

use crate::config::ProviderConfig;
use crate::error::SearchError;

/// One completed (non-streaming) response / 单次补全结果
#[derive(Debug, Clone)]
pub struct Completion {
    pub content: String,
    /// The provider stopped at the token limit / 输出被token上限截断
    pub truncated: bool,
}

/// Seam for the completion backend / 补全后端的抽象接口
#[async_trait]
pub trait CompletionProvider: Send + Sync {
    async fn complete(&self, system: &str, prompt: &str) -> Result<Completion, SearchError>;
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatMessage,
    finish_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ChatMessage {
    content: String,
}

/// OpenRouter chat completions client / OpenRouter聊天补全客户端
pub struct OpenRouterProvider {
    client: reqwest::Client,
    base_url: String,
    model: String,
    api_key: String,
    max_tokens: u32,
    temperature: f32,
    timeout: Duration,
}

impl OpenRouterProvider {
    pub fn new(cfg: &ProviderConfig) -> Self {
        let api_key = std::env::var(&cfg.api_key_env).unwrap_or_default();
        if api_key.is_empty() {
            tracing::warn!(
                "No API key in {}, ranked search will use the deterministic fallback",
                cfg.api_key_env
            );
        }

        Self {
            client: reqwest::Client::new(),
            base_url: cfg.base_url.clone(),
            model: cfg.model.clone(),
            api_key,
            max_tokens: cfg.max_tokens,
            temperature: cfg.temperature,
            timeout: Duration::from_secs(cfg.timeout_secs),
        }
    }
}

#[async_trait]
impl CompletionProvider for OpenRouterProvider {
    async fn complete(&self, system: &str, prompt: &str) -> Result<Completion, SearchError> {
        if self.api_key.is_empty() {
            return Err(SearchError::Provider("API key is not configured".to_string()));
        }

        let body = serde_json::json!({
            "model": self.model,
            "messages": [
                { "role": "system", "content": system },
                { "role": "user", "content": prompt },
            ],
            "max_tokens": self.max_tokens,
            "temperature": self.temperature,
            "stream": false,
        });

        tracing::debug!("Calling completion provider, model: {}", self.model);

        let response = self
            .client
            .post(&self.base_url)
            .bearer_auth(&self.api_key)
            .timeout(self.timeout)
            .json(&body)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            return Err(SearchError::Provider(format!(
                "provider returned {}: {}",
                status,
                text.trim()
            )));
        }

        let parsed: ChatResponse = response
            .json()
            .await
            .map_err(|e| SearchError::Provider(format!("unreadable provider response: {}", e)))?;

        let choice = parsed
            .choices
            .into_iter()
            .next()
            .ok_or_else(|| SearchError::Provider("provider returned no choices".to_string()))?;

        let truncated = choice.finish_reason.as_deref() == Some("length");
        if truncated {
            tracing::warn!("Completion was truncated by the token limit");
        }

        Ok(Completion {
            content: choice.message.content,
            truncated,
        })
    }
}
