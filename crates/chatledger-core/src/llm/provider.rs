//! ModelProvider trait definition.
//!
//! The generative/embedding model is an external collaborator consumed as a
//! black box: text in, text out and text in, vector out. Failures are
//! reported, never retried here.

use chatledger_types::error::ProviderError;
use chatledger_types::llm::{ChatTurn, Completion};

/// Trait for model provider backends.
///
/// Implementations live in chatledger-infra (e.g., `OpenAiCompatProvider`).
pub trait ModelProvider: Send + Sync {
    /// Human-readable provider name (e.g., "openai").
    fn name(&self) -> &str;

    /// Generate the next assistant turn for the given conversation.
    fn complete(
        &self,
        turns: &[ChatTurn],
    ) -> impl std::future::Future<Output = Result<Completion, ProviderError>> + Send;

    /// Embed a text into a dense vector.
    fn embed(
        &self,
        text: &str,
    ) -> impl std::future::Future<Output = Result<Vec<f32>, ProviderError>> + Send;
}
