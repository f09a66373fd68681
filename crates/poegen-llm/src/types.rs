//! Core types for the model client abstraction

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::Duration;

use poegen_utils::error::LlmError;
use poegen_utils::types::{LlmInfo, StageId};

/// Role of a message in a conversation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
    Assistant,
}

/// A single chat message
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    pub role: Role,
    pub content: String,
}

impl Message {
    #[must_use]
    pub fn new(role: Role, content: impl Into<String>) -> Self {
        Self {
            role,
            content: content.into(),
        }
    }

    #[must_use]
    pub fn system(content: impl Into<String>) -> Self {
        Self::new(Role::System, content)
    }

    #[must_use]
    pub fn user(content: impl Into<String>) -> Self {
        Self::new(Role::User, content)
    }
}

/// Input to a backend invocation
#[derive(Debug, Clone)]
pub struct LlmInvocation {
    /// Session the call belongs to, for log correlation
    pub session_id: String,
    /// Stage being generated
    pub stage: StageId,
    /// Network timeout for this call
    pub timeout: Duration,
    /// Ordered conversation, system prompt first
    pub messages: Vec<Message>,
}

impl LlmInvocation {
    #[must_use]
    pub fn new(
        session_id: impl Into<String>,
        stage: StageId,
        timeout: Duration,
        messages: Vec<Message>,
    ) -> Self {
        Self {
            session_id: session_id.into(),
            stage,
            timeout,
            messages,
        }
    }

    /// Text of every message, in order.
    pub fn prompt_text(&self) -> impl Iterator<Item = &str> {
        self.messages.iter().map(|m| m.content.as_str())
    }
}

/// Result of a successful backend invocation
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LlmResult {
    /// Raw text of the first choice
    pub raw_response: String,
    /// Provider name (e.g. "azure-openai")
    pub provider: String,
    /// Model or deployment that answered
    pub model_used: String,
    pub tokens_input: Option<u64>,
    pub tokens_output: Option<u64>,
    pub finish_reason: Option<String>,
}

impl LlmResult {
    #[must_use]
    pub fn new(
        raw_response: impl Into<String>,
        provider: impl Into<String>,
        model_used: impl Into<String>,
    ) -> Self {
        Self {
            raw_response: raw_response.into(),
            provider: provider.into(),
            model_used: model_used.into(),
            tokens_input: None,
            tokens_output: None,
            finish_reason: None,
        }
    }

    #[must_use]
    pub fn with_tokens(mut self, input: u64, output: u64) -> Self {
        self.tokens_input = Some(input);
        self.tokens_output = Some(output);
        self
    }

    #[must_use]
    pub fn with_finish_reason(mut self, reason: impl Into<String>) -> Self {
        self.finish_reason = Some(reason.into());
        self
    }

    /// Split into raw text and the metadata recorded on a stage result.
    #[must_use]
    pub fn into_parts(self) -> (String, LlmInfo) {
        let info = LlmInfo {
            provider: Some(self.provider),
            model_used: Some(self.model_used),
            tokens_input: self.tokens_input,
            tokens_output: self.tokens_output,
            finish_reason: self.finish_reason,
        };
        (self.raw_response, info)
    }
}

/// Trait for model client implementations
///
/// The orchestrator only sees this trait, so tests substitute a scripted
/// backend for the HTTP one.
#[async_trait]
pub trait LlmBackend: Send + Sync {
    /// Send one prompt and return the model's raw text.
    ///
    /// # Errors
    ///
    /// Returns `LlmError` for transport failures, provider errors (auth,
    /// quota, outage), timeouts, empty completions and oversized prompts.
    async fn invoke(&self, inv: LlmInvocation) -> Result<LlmResult, LlmError>;
}
