//! Model client for poegen
//!
//! Every provider implements [`LlmBackend`]; the orchestrator holds an
//! `Arc<dyn LlmBackend>` and never sees HTTP details. The production stack is
//! an Azure OpenAI backend wrapped in a [`CeilingBackend`].

mod azure_backend;
mod ceiling_backend;
pub(crate) mod http_client;
mod tokens;
mod types;

#[cfg(any(test, feature = "test-utils"))]
mod scripted;

pub use ceiling_backend::CeilingBackend;
pub use poegen_utils::error::LlmError;
pub use tokens::{estimate_prompt_tokens, estimate_tokens};
pub use types::{LlmBackend, LlmInvocation, LlmResult, Message, Role};

#[cfg(any(test, feature = "test-utils"))]
pub use scripted::ScriptedBackend;

use poegen_config::LlmSettings;
use std::sync::Arc;

use azure_backend::AzureOpenAiBackend;

/// Create the production backend from resolved settings.
///
/// # Errors
///
/// Returns `LlmError::Misconfiguration` if the HTTP client cannot be built.
pub fn from_settings(settings: &LlmSettings) -> Result<Arc<dyn LlmBackend>, LlmError> {
    let backend = AzureOpenAiBackend::new_from_settings(settings)?;
    Ok(Arc::new(CeilingBackend::new(
        Box::new(backend),
        settings.prompt_token_ceiling,
    )))
}
