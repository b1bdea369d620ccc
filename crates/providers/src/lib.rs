//! LLM endpoint boundary: the [`ChatBackend`] trait the filesystem engine
//! programs against, and the blocking OpenAI-compatible implementation.

pub mod openai;
pub mod traits;

pub use openai::OpenAiChatClient;
pub use traits::ChatBackend;
