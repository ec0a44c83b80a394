use thiserror::Error;

/// Why a single punctuation attempt was rejected
///
/// All variants are retryable: the orchestrator retries the batch and falls
/// back to default punctuation once attempts run out.
#[derive(Debug, Error)]
pub enum AttemptError {
    /// The completion request itself failed (network, status, body)
    #[error("completion request failed: {0}")]
    Transport(String),

    /// No `[` ... `]` span in the completion text
    #[error("response does not contain a JSON array")]
    MissingArray,

    #[error("response array is not valid JSON: {0}")]
    Decode(#[from] serde_json::Error),

    #[error("response element {index} is not a string")]
    NonStringElement { index: usize },

    #[error("output length ({actual}) does not match input length ({expected})")]
    LengthMismatch { expected: usize, actual: usize },
}

impl AttemptError {
    /// Wrap a service error, keeping its whole context chain
    pub fn transport(err: &anyhow::Error) -> Self {
        AttemptError::Transport(format!("{:#}", err))
    }

    /// Whether a completion was received and then rejected
    pub fn is_response_error(&self) -> bool {
        !matches!(self, AttemptError::Transport(_))
    }
}
