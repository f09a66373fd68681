//! Azure OpenAI chat-completions backend

use async_trait::async_trait;
use poegen_config::LlmSettings;
use poegen_utils::redaction::redact_known;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::debug;

use crate::LlmError;
use crate::http_client::HttpClient;
use crate::types::{LlmBackend, LlmInvocation, LlmResult, Message};

pub(crate) const PROVIDER_NAME: &str = "azure-openai";

/// Backend that posts to `{endpoint}/openai/deployments/{deployment}/chat/completions`.
#[derive(Clone)]
pub(crate) struct AzureOpenAiBackend {
    client: Arc<HttpClient>,
    url: String,
    api_key: String,
    deployment: String,
    temperature: f32,
    max_completion_tokens: u32,
}

impl AzureOpenAiBackend {
    pub fn new_from_settings(settings: &LlmSettings) -> Result<Self, LlmError> {
        let client = HttpClient::new()?;
        Ok(Self {
            client: Arc::new(client),
            url: completions_url(
                &settings.endpoint,
                &settings.deployment,
                &settings.api_version,
            ),
            api_key: settings.api_key.clone(),
            deployment: settings.deployment.clone(),
            temperature: settings.temperature,
            max_completion_tokens: settings.max_completion_tokens,
        })
    }

    fn request_body<'a>(&self, messages: &'a [Message]) -> ChatRequest<'a> {
        ChatRequest {
            messages,
            temperature: self.temperature,
            max_completion_tokens: self.max_completion_tokens,
        }
    }
}

/// Chat-completions URL for a deployment.
pub(crate) fn completions_url(endpoint: &str, deployment: &str, api_version: &str) -> String {
    format!(
        "{}/openai/deployments/{}/chat/completions?api-version={}",
        endpoint.trim().trim_end_matches('/'),
        deployment.trim(),
        api_version.trim()
    )
}

#[async_trait]
impl LlmBackend for AzureOpenAiBackend {
    async fn invoke(&self, inv: LlmInvocation) -> Result<LlmResult, LlmError> {
        debug!(
            provider = PROVIDER_NAME,
            session = %inv.session_id,
            stage = %inv.stage,
            deployment = %self.deployment,
            max_completion_tokens = self.max_completion_tokens,
            timeout_secs = inv.timeout.as_secs(),
            "Invoking Azure OpenAI backend"
        );

        let request = self
            .client
            .post(&self.url)
            .header("api-key", &self.api_key)
            .header("Content-Type", "application/json")
            .json(&self.request_body(&inv.messages));

        let response = self
            .client
            .execute(request, inv.timeout, PROVIDER_NAME)
            .await
            .map_err(|e| scrub(e, &self.api_key))?;

        let body: ChatResponse = response.json().await.map_err(|e| {
            LlmError::Transport(redact_known(
                &format!("Failed to parse Azure OpenAI response: {e}"),
                &self.api_key,
            ))
        })?;

        let result = parse_completion(body, &self.deployment)?;

        debug!(
            provider = PROVIDER_NAME,
            tokens_input = ?result.tokens_input,
            tokens_output = ?result.tokens_output,
            finish_reason = ?result.finish_reason,
            "Azure OpenAI invocation completed"
        );

        Ok(result)
    }
}

fn scrub(err: LlmError, api_key: &str) -> LlmError {
    match err {
        LlmError::Transport(msg) => LlmError::Transport(redact_known(&msg, api_key)),
        other => other,
    }
}

/// Turn a decoded response into a result; empty content is an error.
pub(crate) fn parse_completion(body: ChatResponse, deployment: &str) -> Result<LlmResult, LlmError> {
    let choice = body
        .choices
        .into_iter()
        .next()
        .ok_or_else(|| LlmError::Transport("Azure OpenAI response has no choices".to_string()))?;

    let finish_reason = choice
        .finish_reason
        .unwrap_or_else(|| "unknown".to_string());

    let content = match choice.message.content {
        Some(text) if !text.trim().is_empty() => text,
        _ => return Err(LlmError::EmptyResponse { finish_reason }),
    };

    let mut result = LlmResult::new(
        content,
        PROVIDER_NAME,
        body.model.unwrap_or_else(|| deployment.to_string()),
    )
    .with_finish_reason(finish_reason);

    if let Some(usage) = body.usage {
        result = result.with_tokens(usage.prompt_tokens, usage.completion_tokens);
    }

    Ok(result)
}

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    messages: &'a [Message],
    temperature: f32,
    max_completion_tokens: u32,
}

#[derive(Debug, Deserialize)]
pub(crate) struct ChatResponse {
    model: Option<String>,
    choices: Vec<Choice>,
    usage: Option<Usage>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: ResponseMessage,
    finish_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ResponseMessage {
    content: Option<String>,
}

#[derive(Debug, Deserialize)]
struct Usage {
    prompt_tokens: u64,
    completion_tokens: u64,
}
