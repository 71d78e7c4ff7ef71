/// Agent Invocation - Abstraction over the AI completion provider
///
/// **Core Responsibility:**
/// Send one prompt to a model and return the raw reply text.
///
/// **Critical Architectural Boundary:**
/// - Engine knows HOW to reach the provider (HTTP, auth headers, body shape)
/// - Engine does NOT know scoring rules or pass thresholds
/// - Engine does NOT enforce per-test timeouts (the executor does)
/// - Engine makes exactly one attempt per call, no retries
///
/// Production uses `OpenRouterEngine`, which speaks the OpenAI-compatible
/// chat-completions API. Tests substitute their own `AgentInvoker`.

use crate::error::ProviderError;
use agentcheck_common::types::{TestCategory, ValidationError};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt;
use tracing::debug;

/// Longest provider error body carried into an error message
const MAX_ERROR_BODY_CHARS: usize = 500;

const REFERER: &str = "https://ai-agent-testing-system.com";
const APP_TITLE: &str = "AI Agent Testing System";

/// Provider API key. Read-only, redacted from `Debug`, never serialized.
#[derive(Clone)]
pub struct Credentials(String);

impl Credentials {
    /// Rejects structurally invalid keys (empty or whitespace-only)
    pub fn new(key: impl Into<String>) -> Result<Self, ValidationError> {
        let key = key.into();
        if key.trim().is_empty() {
            return Err(ValidationError::new("API key is required"));
        }
        Ok(Self(key))
    }

    fn expose(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Credentials(<redacted>)")
    }
}

/// System prompt sent ahead of the user prompt for each category
pub fn system_prompt(category: TestCategory) -> &'static str {
    match category {
        TestCategory::PromptUnderstanding => {
            "You are a helpful AI assistant. Respond naturally to user queries."
        }
        TestCategory::ResponseAccuracy => {
            "You are a helpful AI assistant. Provide accurate and relevant information."
        }
        TestCategory::FallbackHandling => {
            "You are a helpful AI assistant. If you don't know something, say so politely."
        }
        TestCategory::TaskExecution => "You are a helpful AI assistant. Execute tasks as requested.",
        TestCategory::Performance => {
            "You are a helpful AI assistant. Provide concise and efficient responses."
        }
    }
}

#[derive(Debug, Clone, Copy)]
pub struct InvocationRequest<'a> {
    pub model: &'a str,
    pub system_prompt: &'a str,
    pub prompt: &'a str,
}

/// Raw reply from the provider, not yet judged
#[derive(Debug, Clone, PartialEq)]
pub struct AgentReply {
    pub content: String,
    pub tokens_used: Option<u32>,
}

#[async_trait]
pub trait AgentInvoker: Send + Sync {
    async fn invoke(
        &self,
        request: InvocationRequest<'_>,
        credentials: &Credentials,
    ) -> Result<AgentReply, ProviderError>;
}

#[derive(Serialize)]
struct ChatMessage<'a> {
    role: &'static str,
    content: &'a str,
}

#[derive(Serialize)]
struct ChatCompletionBody<'a> {
    model: &'a str,
    messages: [ChatMessage<'a>; 2],
}

#[derive(Deserialize)]
struct ChatCompletionResponse {
    #[serde(default)]
    choices: Vec<ChatChoice>,
    usage: Option<ChatUsage>,
}

#[derive(Deserialize)]
struct ChatChoice {
    message: Option<ChatChoiceMessage>,
}

#[derive(Deserialize)]
struct ChatChoiceMessage {
    content: Option<String>,
}

#[derive(Deserialize)]
struct ChatUsage {
    total_tokens: Option<u32>,
}

/// Extract the first choice's content from a chat-completions body
pub fn parse_completion(body: &str) -> Result<AgentReply, ProviderError> {
    let response: ChatCompletionResponse = serde_json::from_str(body)
        .map_err(|e| ProviderError::Malformed(format!("invalid JSON body: {}", e)))?;

    let content = response
        .choices
        .into_iter()
        .next()
        .and_then(|choice| choice.message)
        .and_then(|message| message.content)
        .ok_or_else(|| ProviderError::Malformed("missing choices[0].message.content".to_string()))?;

    Ok(AgentReply {
        content,
        tokens_used: response.usage.and_then(|u| u.total_tokens),
    })
}

fn truncate(body: &str) -> String {
    if body.chars().count() <= MAX_ERROR_BODY_CHARS {
        body.to_string()
    } else {
        let mut cut: String = body.chars().take(MAX_ERROR_BODY_CHARS).collect();
        cut.push_str("...");
        cut
    }
}

/// OpenAI-compatible chat-completions client (OpenRouter by default)
pub struct OpenRouterEngine {
    http: reqwest::Client,
    base_url: String,
}

impl OpenRouterEngine {
    pub fn new(base_url: impl Into<String>) -> Result<Self, ProviderError> {
        let http = reqwest::Client::builder().build()?;
        Ok(Self {
            http,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        })
    }

    fn completions_url(&self) -> String {
        format!("{}/chat/completions", self.base_url)
    }
}

#[async_trait]
impl AgentInvoker for OpenRouterEngine {
    async fn invoke(
        &self,
        request: InvocationRequest<'_>,
        credentials: &Credentials,
    ) -> Result<AgentReply, ProviderError> {
        let body = ChatCompletionBody {
            model: request.model,
            messages: [
                ChatMessage {
                    role: "system",
                    content: request.system_prompt,
                },
                ChatMessage {
                    role: "user",
                    content: request.prompt,
                },
            ],
        };

        debug!(model = request.model, url = %self.completions_url(), "Calling provider");

        let response = self
            .http
            .post(self.completions_url())
            .bearer_auth(credentials.expose())
            .header("HTTP-Referer", REFERER)
            .header("X-Title", APP_TITLE)
            .json(&body)
            .send()
            .await?;

        let status = response.status();
        let text = response.text().await?;

        if !status.is_success() {
            return Err(ProviderError::Status {
                status: status.as_u16(),
                body: truncate(&text),
            });
        }

        parse_completion(&text)
    }
}
