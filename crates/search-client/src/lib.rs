//! Semantic-search boundary: the [`SearchBackend`] trait the filesystem
//! engine programs against, and the ZeroMQ request/reply implementation.

pub mod backend;
pub mod client;

pub use backend::SearchBackend;
pub use client::ZmqSearchClient;
