//! Inference-service boundary: role-tagged chat completion over HTTP.
//!
//! [`OpenAiClient`] speaks the OpenAI-compatible `/chat/completions` and
//! `/embeddings` endpoints. Every call carries a timeout, and transient
//! failures are retried with exponential backoff.

use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, warn};

pub const DEFAULT_BASE_URL: &str = "https://api.openai.com/v1";

#[derive(Error, Debug)]
pub enum InferenceError {
    #[error("transport error: {0}")]
    Transport(String),
    #[error("call timed out after {0:?}")]
    Timeout(Duration),
    #[error("rate limited: {0}")]
    RateLimited(String),
    #[error("unauthorized ({status})")]
    Unauthorized { status: u16 },
    #[error("server returned {status}: {body}")]
    Server { status: u16, body: String },
    #[error("response carried no content")]
    EmptyResponse,
    #[error("could not decode response: {0}")]
    Decode(String),
}

impl InferenceError {
    /// Whether a retry may succeed.
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Transport(_) | Self::Timeout(_) | Self::RateLimited(_) => true,
            Self::Server { status, .. } => *status >= 500,
            Self::Unauthorized { .. } | Self::EmptyResponse | Self::Decode(_) => false,
        }
    }
}

impl From<reqwest::Error> for InferenceError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_decode() {
            Self::Decode(e.to_string())
        } else {
            Self::Transport(e.to_string())
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
    Assistant,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: Role,
    pub content: String,
}

impl ChatMessage {
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: Role::System,
            content: content.into(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
        }
    }
}

/// Per-request generation settings.
#[derive(Debug, Clone, PartialEq)]
pub struct GenerationParams {
    pub model: String,
    pub temperature: f32,
    /// Ask the service to force a JSON object response.
    pub json_mode: bool,
}

/// A language-model completion service.
#[async_trait]
pub trait InferenceService: Send + Sync {
    /// Complete a message sequence, returning the raw response text.
    async fn complete(
        &self,
        messages: &[ChatMessage],
        params: &GenerationParams,
    ) -> Result<String, InferenceError>;

    /// Check the service is reachable and the credentials are accepted.
    async fn health(&self) -> Result<(), InferenceError>;
}

// ── OpenAI-compatible client ──

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: &'a [ChatMessage],
    temperature: f32,
    #[serde(skip_serializing_if = "Option::is_none")]
    response_format: Option<ResponseFormat>,
}

#[derive(Serialize)]
struct ResponseFormat {
    #[serde(rename = "type")]
    kind: &'static str,
}

#[derive(Deserialize)]
struct ChatResponse {
    choices: Vec<Choice>,
}

#[derive(Deserialize)]
struct Choice {
    message: ResponseMessage,
}

#[derive(Deserialize)]
struct ResponseMessage {
    content: Option<String>,
}

/// HTTP client for an OpenAI-compatible inference service.
pub struct OpenAiClient {
    pub(crate) client: reqwest::Client,
    pub(crate) base_url: String,
    pub(crate) api_key: String,
    pub(crate) timeout: Duration,
    max_retries: u32,
    backoff: Duration,
    pub(crate) embedding_model: String,
}

impl OpenAiClient {
    /// Create a client for `base_url` (e.g. `https://api.openai.com/v1`).
    pub fn new(base_url: impl Into<String>, api_key: impl Into<String>) -> Self {
        let base_url: String = base_url.into();
        Self {
            client: reqwest::Client::new(),
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key: api_key.into(),
            timeout: Duration::from_secs(60),
            max_retries: 2,
            backoff: Duration::from_millis(500),
            embedding_model: crate::embedder::DEFAULT_EMBEDDING_MODEL.to_string(),
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Retries for transient failures, waiting `backoff`, `2 * backoff`, ...
    pub fn with_retries(mut self, max_retries: u32, backoff: Duration) -> Self {
        self.max_retries = max_retries;
        self.backoff = backoff;
        self
    }

    pub fn with_embedding_model(mut self, model: impl Into<String>) -> Self {
        self.embedding_model = model.into();
        self
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Run `call` under the per-call timeout, retrying transient failures.
    pub(crate) async fn with_retry<T, F, Fut>(&self, what: &str, call: F) -> Result<T, InferenceError>
    where
        F: Fn() -> Fut,
        Fut: std::future::Future<Output = Result<T, InferenceError>>,
    {
        let mut attempt = 0;
        loop {
            let result = match tokio::time::timeout(self.timeout, call()).await {
                Ok(r) => r,
                Err(_) => Err(InferenceError::Timeout(self.timeout)),
            };
            match result {
                Ok(v) => return Ok(v),
                Err(e) if e.is_retryable() && attempt < self.max_retries => {
                    let wait = backoff_delay(self.backoff, attempt);
                    attempt += 1;
                    warn!(call = what, attempt, error = %e, wait_ms = wait.as_millis() as u64, "retrying inference call");
                    tokio::time::sleep(wait).await;
                }
                Err(e) => return Err(e),
            }
        }
    }

    async fn send_chat(
        &self,
        messages: &[ChatMessage],
        params: &GenerationParams,
    ) -> Result<String, InferenceError> {
        let url = format!("{}/chat/completions", self.base_url);
        let body = ChatRequest {
            model: &params.model,
            messages,
            temperature: params.temperature,
            response_format: params.json_mode.then_some(ResponseFormat {
                kind: "json_object",
            }),
        };

        debug!(url = %url, model = %params.model, messages = messages.len(), "chat completion");
        let resp = self
            .client
            .post(&url)
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .await?;
        let resp = check_status(resp).await?;
        let parsed: ChatResponse = resp.json().await?;
        parsed
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .filter(|c| !c.trim().is_empty())
            .ok_or(InferenceError::EmptyResponse)
    }
}

/// Map a non-success status to the error taxonomy.
/// Longest wait between two attempts.
const MAX_BACKOFF: Duration = Duration::from_secs(30);

/// Exponential backoff: `base * 2^attempt`, capped at [`MAX_BACKOFF`].
fn backoff_delay(base: Duration, attempt: u32) -> Duration {
    base.saturating_mul(2u32.saturating_pow(attempt)).min(MAX_BACKOFF)
}

pub(crate) async fn check_status(resp: reqwest::Response) -> Result<reqwest::Response, InferenceError> {
    let status = resp.status();
    if status.is_success() {
        return Ok(resp);
    }
    let body = resp.text().await.unwrap_or_default();
    Err(status_error(status.as_u16(), body))
}

fn status_error(status: u16, body: String) -> InferenceError {
    match status {
        401 | 403 => InferenceError::Unauthorized { status },
        429 => InferenceError::RateLimited(body),
        _ => InferenceError::Server { status, body },
    }
}

#[async_trait]
impl InferenceService for OpenAiClient {
    async fn complete(
        &self,
        messages: &[ChatMessage],
        params: &GenerationParams,
    ) -> Result<String, InferenceError> {
        self.with_retry("chat", || self.send_chat(messages, params))
            .await
    }

    async fn health(&self) -> Result<(), InferenceError> {
        let url = format!("{}/models", self.base_url);
        let call = async {
            let resp = self
                .client
                .get(&url)
                .bearer_auth(&self.api_key)
                .send()
                .await?;
            check_status(resp).await.map(|_| ())
        };
        match tokio::time::timeout(self.timeout, call).await {
            Ok(r) => r,
            Err(_) => Err(InferenceError::Timeout(self.timeout)),
        }
    }
}
