//! Error types for the LLM gateway.

use thiserror::Error;

/// Result type for gateway operations.
pub type Result<T> = std::result::Result<T, LlmError>;

/// Gateway errors, tagged so callers can distinguish transient transport
/// faults from content faults.
#[derive(Debug, Error)]
pub enum LlmError {
    /// Configuration error (missing API key, unknown provider)
    #[error("Configuration error: {0}")]
    Config(String),

    /// Provider error (connection failed, non-2xx response, quota)
    #[error("Provider error: {0}")]
    Provider(String),

    /// The call exceeded its configured timeout
    #[error("Timed out after {0}s")]
    Timeout(u64),

    /// The model returned content that is not valid structured output
    #[error("Invalid structured output: {0}")]
    InvalidOutput(String),

    /// A tool raised during the tool-calling loop
    #[error("Tool '{name}' failed: {message}")]
    Tool { name: String, message: String },
}

impl LlmError {
    /// True for faults worth surfacing as provider/transport problems
    /// rather than content problems.
    pub fn is_transport(&self) -> bool {
        matches!(self, Self::Provider(_) | Self::Timeout(_))
    }
}
