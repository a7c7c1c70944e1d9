use async_trait::async_trait;
use havruta_core::{CancelToken, ChatMessage, LlmError};
use tokio::sync::mpsc;

/// An LLM completion endpoint behind a capability interface.
///
/// Both calls resolve with the full response text. The streaming variant
/// additionally forwards incremental chunks through `chunks` as they
/// arrive; once `cancel` trips, no further chunk is sent and the call
/// resolves with [`LlmError::Cancelled`].
#[async_trait]
pub trait ChatClient: Send + Sync {
    /// Returns the client's name (e.g. `"openai"`, `"scripted"`).
    fn name(&self) -> &str;

    async fn complete(
        &self,
        messages: &[ChatMessage],
        cancel: &CancelToken,
    ) -> Result<String, LlmError>;

    async fn complete_streaming(
        &self,
        messages: &[ChatMessage],
        chunks: mpsc::UnboundedSender<String>,
        cancel: &CancelToken,
    ) -> Result<String, LlmError>;
}
