//! Prompt-size ceiling wrapper
//!
//! Wraps any `LlmBackend` and rejects prompts whose estimated size exceeds the
//! deployment's context limit before a network call is made.

use async_trait::async_trait;
use tracing::{debug, warn};

use crate::LlmError;
use crate::tokens::estimate_prompt_tokens;
use crate::types::{LlmBackend, LlmInvocation, LlmResult};

pub struct CeilingBackend {
    inner: Box<dyn LlmBackend>,
    ceiling: usize,
}

impl CeilingBackend {
    #[must_use]
    pub fn new(inner: Box<dyn LlmBackend>, ceiling: usize) -> Self {
        debug!(ceiling, "Creating CeilingBackend");
        Self { inner, ceiling }
    }

    #[must_use]
    pub fn ceiling(&self) -> usize {
        self.ceiling
    }
}

#[async_trait]
impl LlmBackend for CeilingBackend {
    async fn invoke(&self, inv: LlmInvocation) -> Result<LlmResult, LlmError> {
        let estimated_tokens = estimate_prompt_tokens(inv.prompt_text());

        if estimated_tokens > self.ceiling {
            warn!(
                session = %inv.session_id,
                stage = %inv.stage,
                estimated_tokens,
                ceiling = self.ceiling,
                "Prompt exceeds token ceiling; not sending"
            );
            return Err(LlmError::PromptTooLarge {
                estimated_tokens,
                ceiling: self.ceiling,
            });
        }

        debug!(
            stage = %inv.stage,
            estimated_tokens,
            ceiling = self.ceiling,
            "Prompt within ceiling"
        );

        self.inner.invoke(inv).await
    }
}
