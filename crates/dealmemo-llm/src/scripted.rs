//! Scripted backend for tests.
//!
//! Replays queued results and errors in order, records every invocation,
//! and can delay each call to exercise timeouts and cancellation.

use crate::types::{LlmBackend, LlmInvocation, LlmResult};
use async_trait::async_trait;
use dealmemo_utils::error::LlmError;
use std::collections::VecDeque;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

type Responder = dyn Fn(&LlmInvocation) -> Result<LlmResult, LlmError> + Send + Sync;

#[derive(Default)]
struct Script {
    queue: VecDeque<Result<LlmResult, LlmError>>,
    invocations: Vec<LlmInvocation>,
}

/// A backend that answers from a script instead of the network.
#[derive(Clone)]
pub struct ScriptedBackend {
    provider: &'static str,
    script: Arc<Mutex<Script>>,
    responder: Option<Arc<Responder>>,
    delay: Option<Duration>,
}

impl Default for ScriptedBackend {
    fn default() -> Self {
        Self::new()
    }
}

impl ScriptedBackend {
    #[must_use]
    pub fn new() -> Self {
        Self {
            provider: "scripted",
            script: Arc::new(Mutex::new(Script::default())),
            responder: None,
            delay: None,
        }
    }

    /// Report a different provider name (e.g., to check message tagging).
    #[must_use]
    pub fn with_provider(mut self, provider: &'static str) -> Self {
        self.provider = provider;
        self
    }

    /// Sleep this long before answering each call.
    #[must_use]
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    /// Answer from this closure once the queue is empty.
    #[must_use]
    pub fn with_responder<F>(mut self, responder: F) -> Self
    where
        F: Fn(&LlmInvocation) -> Result<LlmResult, LlmError> + Send + Sync + 'static,
    {
        self.responder = Some(Arc::new(responder));
        self
    }

    /// Queue a response whose only segment is `text`.
    pub fn push_text(&self, text: impl Into<String>) -> &Self {
        let result = LlmResult::from_text(text, self.provider, "scripted-model");
        self.lock().queue.push_back(Ok(result));
        self
    }

    pub fn push_result(&self, result: LlmResult) -> &Self {
        self.lock().queue.push_back(Ok(result));
        self
    }

    pub fn push_error(&self, error: LlmError) -> &Self {
        self.lock().queue.push_back(Err(error));
        self
    }

    /// Every invocation received so far, in call order.
    #[must_use]
    pub fn invocations(&self) -> Vec<LlmInvocation> {
        self.lock().invocations.clone()
    }

    #[must_use]
    pub fn call_count(&self) -> usize {
        self.lock().invocations.len()
    }

    fn lock(&self) -> MutexGuard<'_, Script> {
        self.script.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

#[async_trait]
impl LlmBackend for ScriptedBackend {
    fn provider(&self) -> &'static str {
        self.provider
    }

    async fn invoke(&self, inv: LlmInvocation) -> Result<LlmResult, LlmError> {
        inv.validate()?;
        let next = {
            let mut script = self.lock();
            script.invocations.push(inv.clone());
            script.queue.pop_front()
        };

        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }

        match (next, &self.responder) {
            (Some(answer), _) => answer,
            (None, Some(responder)) => responder(&inv),
            (None, None) => Err(LlmError::Transport(format!(
                "scripted backend has no response for {}",
                inv.phase_name()
            ))),
        }
    }
}
