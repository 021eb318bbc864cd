/// LLM Client: the single point of entry for all model calls in the resolver.
///
/// No other module talks to the Chat Completions API directly. Pipeline stages
/// depend on the [`DocumentRenderer`] and [`DecisionOracle`] traits so tests
/// can substitute scripted doubles.
use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, warn};

use crate::evidence::rasterizer::PageImage;

pub mod prompts;

const MAX_TOKENS: u32 = 2048;
const MAX_RETRIES: u32 = 3;
const REQUEST_TIMEOUT: Duration = Duration::from_secs(120);

#[derive(Debug, Error)]
pub enum LlmError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("API error (status {status}): {message}")]
    Api { status: u16, message: String },

    #[error("Rate limited after {retries} retries")]
    RateLimited { retries: u32 },

    #[error("LLM returned empty content")]
    EmptyContent,
}

/// Turns one rasterized page into free-form descriptive text.
#[async_trait]
pub trait DocumentRenderer: Send + Sync {
    async fn describe_page(&self, page: &PageImage) -> Result<String, LlmError>;
}

/// Answers a decision prompt with a single dash-delimited line.
#[async_trait]
pub trait DecisionOracle: Send + Sync {
    async fn decide(&self, prompt: &str) -> Result<String, LlmError>;
}

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    max_tokens: u32,
    messages: Vec<ChatMessage<'a>>,
}

#[derive(Debug, Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: MessageContent<'a>,
}

#[derive(Debug, Serialize)]
#[serde(untagged)]
enum MessageContent<'a> {
    Text(&'a str),
    Parts(Vec<ContentPart<'a>>),
}

#[derive(Debug, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum ContentPart<'a> {
    Text { text: &'a str },
    ImageUrl { image_url: ImageUrl },
}

#[derive(Debug, Serialize)]
struct ImageUrl {
    url: String,
}

#[derive(Debug, Deserialize)]
pub struct ChatResponse {
    pub choices: Vec<Choice>,
    pub usage: Option<Usage>,
}

#[derive(Debug, Deserialize)]
pub struct Choice {
    pub message: AssistantMessage,
}

#[derive(Debug, Deserialize)]
pub struct AssistantMessage {
    pub content: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct Usage {
    pub prompt_tokens: u32,
    pub completion_tokens: u32,
}

impl ChatResponse {
    /// Extracts the text of the first choice.
    pub fn text(&self) -> Option<&str> {
        self.choices
            .first()
            .and_then(|c| c.message.content.as_deref())
    }
}

#[derive(Debug, Deserialize)]
struct ApiError {
    error: ApiErrorBody,
}

#[derive(Debug, Deserialize)]
struct ApiErrorBody {
    message: String,
}

/// Models used for the two oracle roles.
#[derive(Debug, Clone)]
pub struct ModelSelection {
    pub decision: String,
    pub vision: String,
}

/// Wraps an OpenAI-compatible Chat Completions endpoint with retry logic.
#[derive(Clone)]
pub struct LlmClient {
    client: Client,
    api_key: String,
    base_url: String,
    models: ModelSelection,
}

impl LlmClient {
    pub fn new(api_key: String, base_url: String, models: ModelSelection) -> Result<Self, LlmError> {
        Ok(Self {
            client: Client::builder().timeout(REQUEST_TIMEOUT).build()?,
            api_key,
            base_url: base_url.trim_end_matches('/').to_string(),
            models,
        })
    }

    pub fn models(&self) -> &ModelSelection {
        &self.models
    }

    /// Makes a raw call to the Chat Completions API.
    /// Retries on 429 (rate limit) and 5xx errors with exponential backoff.
    async fn call(&self, model: &str, messages: Vec<ChatMessage<'_>>) -> Result<ChatResponse, LlmError> {
        let request_body = ChatRequest {
            model,
            max_tokens: MAX_TOKENS,
            messages,
        };
        let url = format!("{}/chat/completions", self.base_url);

        let mut last_error: Option<LlmError> = None;

        for attempt in 0..MAX_RETRIES {
            if attempt > 0 {
                // Exponential backoff: 1s, 2s
                let delay = Duration::from_millis(1000 * (1 << (attempt - 1)));
                warn!(
                    "LLM call attempt {} failed, retrying after {}ms...",
                    attempt,
                    delay.as_millis()
                );
                tokio::time::sleep(delay).await;
            }

            let response = self
                .client
                .post(&url)
                .bearer_auth(&self.api_key)
                .json(&request_body)
                .send()
                .await;

            let response = match response {
                Ok(r) => r,
                Err(e) => {
                    last_error = Some(LlmError::Http(e));
                    continue;
                }
            };

            let status = response.status();

            if status.as_u16() == 429 || status.is_server_error() {
                let body = response.text().await.unwrap_or_default();
                warn!("LLM API returned {}: {}", status, body);
                last_error = Some(LlmError::Api {
                    status: status.as_u16(),
                    message: body,
                });
                continue;
            }

            if !status.is_success() {
                let body = response.text().await.unwrap_or_default();
                let message = serde_json::from_str::<ApiError>(&body)
                    .map(|e| e.error.message)
                    .unwrap_or(body);
                return Err(LlmError::Api {
                    status: status.as_u16(),
                    message,
                });
            }

            let chat_response: ChatResponse = response.json().await?;

            if let Some(usage) = &chat_response.usage {
                debug!(
                    "LLM call succeeded: model={}, prompt_tokens={}, completion_tokens={}",
                    model, usage.prompt_tokens, usage.completion_tokens
                );
            }

            return Ok(chat_response);
        }

        Err(last_error.unwrap_or(LlmError::RateLimited {
            retries: MAX_RETRIES,
        }))
    }

    async fn call_text(&self, model: &str, messages: Vec<ChatMessage<'_>>) -> Result<String, LlmError> {
        let response = self.call(model, messages).await?;
        let text = response.text().ok_or(LlmError::EmptyContent)?.trim();
        if text.is_empty() {
            return Err(LlmError::EmptyContent);
        }
        Ok(text.to_string())
    }
}

#[async_trait]
impl DocumentRenderer for LlmClient {
    async fn describe_page(&self, page: &PageImage) -> Result<String, LlmError> {
        let messages = vec![ChatMessage {
            role: "user",
            content: MessageContent::Parts(vec![
                ContentPart::Text {
                    text: prompts::PAGE_ANALYSIS_PROMPT,
                },
                ContentPart::ImageUrl {
                    image_url: ImageUrl {
                        url: page.data_url(),
                    },
                },
            ]),
        }];
        self.call_text(&self.models.vision, messages).await
    }
}

#[async_trait]
impl DecisionOracle for LlmClient {
    async fn decide(&self, prompt: &str) -> Result<String, LlmError> {
        let messages = vec![
            ChatMessage {
                role: "system",
                content: MessageContent::Text(prompts::DECISION_SYSTEM),
            },
            ChatMessage {
                role: "user",
                content: MessageContent::Text(prompt),
            },
        ];
        self.call_text(&self.models.decision, messages).await
    }
}
