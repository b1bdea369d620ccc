//! Shared types for the llmfs workspace: chat messages, model parameters,
//! the layered configuration store, and the common error type.

pub mod config;
pub mod error;
pub mod message;

pub use config::{ConfigStore, ModelParameters, MountConfig};
pub use error::{Error, Result};
pub use message::{Conversation, Message, Role};
