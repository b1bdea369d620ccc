use llmfs_domain::config::ModelParameters;
use llmfs_domain::error::Result;
use llmfs_domain::message::Conversation;

/// Trait the filesystem engine uses to talk to the LLM endpoint.
///
/// The engine runs inside synchronous kernel callbacks, so every call blocks
/// until the endpoint answers; the kernel-side library multiplexes other
/// operations onto free threads meanwhile. Tests substitute an in-memory
/// implementation.
pub trait ChatBackend: Send + Sync {
    /// Upstream model identifiers advertised by the endpoint.
    fn models(&self) -> &[String];

    /// One-shot exchange with no surrounding history.
    fn simple_query(
        &self,
        model: &str,
        prompt: &str,
        params: &ModelParameters,
    ) -> Result<String>;

    /// Multi-turn exchange carrying system prompt, context, and the full
    /// conversation history.
    fn conversation_query(
        &self,
        model: &str,
        params: &ModelParameters,
        conversation: &Conversation,
    ) -> Result<String>;

    /// Whether `name` is served by this endpoint.
    fn knows_model(&self, name: &str) -> bool {
        self.models().iter().any(|m| m == name)
    }
}
