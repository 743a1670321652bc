//! Text-generation client port.
//!
//! The generators only need "system instruction + prompt in, text out". The
//! trait returns a boxed future so it stays dyn-compatible and the context can
//! hold a `Box<dyn LlmClient>`: the live OpenAI-compatible adapter in
//! production, a scripted one in tests.

mod openai;

use std::future::Future;
use std::pin::Pin;

use thiserror::Error;

pub use openai::OpenAiClient;

/// Errors from the generation service. None are retried.
#[derive(Debug, Error)]
pub enum LlmError {
    #[error("OPENAI_API_KEY environment variable is required")]
    MissingApiKey,

    #[error("generation request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("generation service rejected the API key")]
    Unauthorized,

    #[error("generation service quota or rate limit exceeded: {0}")]
    RateLimited(String),

    #[error("generation service error ({status}): {message}")]
    Api { status: u16, message: String },

    #[error("failed to decode generation response: {0}")]
    Decode(String),
}

/// Boxed future returned by [`LlmClient::complete`].
pub type CompletionFuture<'a> = Pin<Box<dyn Future<Output = Result<String, LlmError>> + Send + 'a>>;

/// One system-plus-user exchange.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompletionRequest {
    pub system: String,
    pub prompt: String,
}

impl CompletionRequest {
    pub fn new(system: impl Into<String>, prompt: impl Into<String>) -> Self {
        Self {
            system: system.into(),
            prompt: prompt.into(),
        }
    }
}

/// Stateless request/response text generation.
pub trait LlmClient: Send + Sync {
    /// Generate text for one request. An empty reply is `Ok("")`.
    fn complete(&self, request: &CompletionRequest) -> CompletionFuture<'_>;
}
