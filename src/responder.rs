use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, warn};

use crate::config::Persona;
use crate::llm::{ChatMessage, CompletionBackend, CompletionError, CompletionErrorKind, CompletionRequest};

/// Reply used whenever the completion service cannot be used or fails.
pub const FALLBACK_REPLY: &str =
    "Sorry, I can't come up with an answer right now. Please try again later.";

/// Reply used when the completion service reports a rate limit or exhausted quota.
pub const BUSY_REPLY: &str =
    "I'm getting too many requests at the moment. Please wait a little and try again.";

/// Resolved persona, model and sampling settings for every completion request.
#[derive(Debug, Clone, PartialEq)]
pub struct CompletionSettings {
    pub persona: Persona,
    pub system_prompt: String,
    pub model: String,
    pub max_tokens: u32,
    pub temperature: f32,
    pub timeout: Duration,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReplyOutcome {
    Completed,
    /// No API key configured; no request was made.
    Degraded,
    /// The service answered with nothing but whitespace.
    Empty,
    Failed(CompletionErrorKind),
}

/// Text to send back to the user, always trimmed and non-empty.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Reply {
    pub text: String,
    pub outcome: ReplyOutcome,
}

impl Reply {
    fn fallback(outcome: ReplyOutcome) -> Self {
        Self {
            text: FALLBACK_REPLY.to_string(),
            outcome,
        }
    }
}

/// Turns arbitrary user text into a reply via the completion service.
pub struct Responder {
    settings: CompletionSettings,
    api_key: Option<String>,
    backend: Arc<dyn CompletionBackend>,
}

impl Responder {
    pub fn new(
        settings: CompletionSettings,
        api_key: Option<String>,
        backend: Arc<dyn CompletionBackend>,
    ) -> Self {
        let api_key = api_key.filter(|k| !k.trim().is_empty());
        Self {
            settings,
            api_key,
            backend,
        }
    }

    pub fn is_degraded(&self) -> bool {
        self.api_key.is_none()
    }

    fn build_request(&self, text: &str) -> CompletionRequest {
        CompletionRequest {
            model: self.settings.model.clone(),
            messages: vec![
                ChatMessage::system(self.settings.system_prompt.as_str()),
                ChatMessage::user(text),
            ],
            max_tokens: self.settings.max_tokens,
            temperature: self.settings.temperature,
        }
    }

    /// Produce a reply for `text`. Makes at most one call to the backend and
    /// never fails: every error becomes a fallback reply.
    pub async fn reply(&self, text: &str) -> Reply {
        let Some(api_key) = self.api_key.as_deref() else {
            debug!("No completion API key configured, using fallback reply");
            return Reply::fallback(ReplyOutcome::Degraded);
        };

        let request = self.build_request(text);
        let timeout = self.settings.timeout;

        let result = match tokio::time::timeout(timeout, self.backend.complete(api_key, &request)).await {
            Ok(result) => result,
            Err(_) => Err(CompletionError::Timeout(timeout)),
        };

        match result {
            Ok(completion) => {
                let trimmed = completion.trim();
                if trimmed.is_empty() {
                    warn!("Completion API returned an empty answer");
                    Reply::fallback(ReplyOutcome::Empty)
                } else {
                    Reply {
                        text: trimmed.to_string(),
                        outcome: ReplyOutcome::Completed,
                    }
                }
            }
            Err(e) => {
                warn!("Completion request failed: {}", e);
                let kind = e.kind();
                match kind {
                    CompletionErrorKind::RateLimited => Reply {
                        text: BUSY_REPLY.to_string(),
                        outcome: ReplyOutcome::Failed(kind),
                    },
                    _ => Reply::fallback(ReplyOutcome::Failed(kind)),
                }
            }
        }
    }
}
