//! Scripted backend for tests.
//!
//! Answers invocations from a queue of canned responses and records every
//! invocation it receives. A gated backend parks each call until the test
//! releases it, which lets tests observe a generation while it is in flight.

use async_trait::async_trait;
use std::collections::VecDeque;
use std::sync::Mutex;
use tokio::sync::Notify;

use crate::LlmError;
use crate::types::{LlmBackend, LlmInvocation, LlmResult};

pub struct ScriptedBackend {
    responses: Mutex<VecDeque<Result<String, LlmError>>>,
    invocations: Mutex<Vec<LlmInvocation>>,
    gate: Option<Gate>,
}

struct Gate {
    entered: Notify,
    release: Notify,
}

impl ScriptedBackend {
    /// Backend that answers with `responses` in order.
    #[must_use]
    pub fn new<I, S>(responses: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            responses: Mutex::new(responses.into_iter().map(|r| Ok(r.into())).collect()),
            invocations: Mutex::new(Vec::new()),
            gate: None,
        }
    }

    /// Backend whose calls wait for [`release`](Self::release).
    #[must_use]
    pub fn gated<I, S>(responses: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            gate: Some(Gate {
                entered: Notify::new(),
                release: Notify::new(),
            }),
            ..Self::new(responses)
        }
    }

    /// Queue another successful response.
    pub fn push_response(&self, text: impl Into<String>) {
        self.lock_responses().push_back(Ok(text.into()));
    }

    /// Queue a failure.
    pub fn push_error(&self, err: LlmError) {
        self.lock_responses().push_back(Err(err));
    }

    /// Invocations received so far.
    #[must_use]
    pub fn invocations(&self) -> Vec<LlmInvocation> {
        match self.invocations.lock() {
            Ok(guard) => guard.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }

    #[must_use]
    pub fn call_count(&self) -> usize {
        self.invocations().len()
    }

    /// Wait until a gated call has started.
    pub async fn wait_until_invoked(&self) {
        if let Some(gate) = &self.gate {
            gate.entered.notified().await;
        }
    }

    /// Let one parked call complete.
    pub fn release(&self) {
        if let Some(gate) = &self.gate {
            gate.release.notify_one();
        }
    }

    fn lock_responses(&self) -> std::sync::MutexGuard<'_, VecDeque<Result<String, LlmError>>> {
        match self.responses.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }
}

#[async_trait]
impl LlmBackend for ScriptedBackend {
    async fn invoke(&self, inv: LlmInvocation) -> Result<LlmResult, LlmError> {
        match self.invocations.lock() {
            Ok(mut guard) => guard.push(inv),
            Err(poisoned) => poisoned.into_inner().push(inv),
        }

        if let Some(gate) = &self.gate {
            gate.entered.notify_one();
            gate.release.notified().await;
        }

        let next = self.lock_responses().pop_front();
        match next {
            Some(Ok(text)) => Ok(LlmResult::new(text, "scripted", "scripted-model")
                .with_tokens(0, 0)
                .with_finish_reason("stop")),
            Some(Err(err)) => Err(err),
            None => Err(LlmError::Transport(
                "scripted backend has no response left".to_string(),
            )),
        }
    }
}
