//! Generative AI backend abstraction.

pub mod gemini;

pub use gemini::GeminiClient;

use crate::error::AiError;
use async_trait::async_trait;

/// A single completion request.
#[derive(Debug, Clone, Copy)]
pub struct CompletionRequest<'a> {
    pub model: &'a str,
    pub prompt: &'a str,
    pub system_instruction: &'a str,
    /// Let the model ground its answer in live web search results.
    pub search_grounding: bool,
}

/// Text returned by the model.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Completion {
    pub text: String,
}

/// Abstraction over generative text backends.
#[async_trait]
pub trait GenerativeBackend: Send + Sync {
    async fn generate(&self, request: &CompletionRequest<'_>) -> Result<Completion, AiError>;
}
