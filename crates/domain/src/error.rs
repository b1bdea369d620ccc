/// Shared error type used across all llmfs crates.
#[derive(thiserror::Error, Debug)]
pub enum Error {
    #[error("IO: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("HTTP: {0}")]
    Http(String),

    #[error("timeout: {0}")]
    Timeout(String),

    #[error("backend {service}: {message}")]
    Backend { service: String, message: String },

    #[error("config: {0}")]
    Config(String),

    #[error("invalid: {0}")]
    Invalid(String),

    #[error("{0}")]
    Other(String),
}

impl Error {
    /// Shorthand for a backend failure reported by an external service.
    pub fn backend(service: impl Into<String>, message: impl Into<String>) -> Self {
        Error::Backend {
            service: service.into(),
            message: message.into(),
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;
