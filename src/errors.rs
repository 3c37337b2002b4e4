use thiserror::Error;

/// Top-level client error.
/// All variants carry a human-readable message for display/logging.
#[derive(Debug, Error)]
pub enum AppError {
    // ── Transport errors ─────────────────────────────────────────────────────
    #[error("Request to {endpoint} failed: {source}")]
    Transport {
        endpoint: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("{endpoint} answered with status {status}")]
    Status { endpoint: String, status: u16 },

    // ── Payload errors ───────────────────────────────────────────────────────
    #[error("Malformed response from {endpoint}: {message}")]
    MalformedResponse { endpoint: String, message: String },

    #[error("Conversation '{id}' not found")]
    ConversationNotFound { id: String },

    // ── Configuration errors ─────────────────────────────────────────────────
    #[error("Invalid configuration for {key}: {message}")]
    InvalidConfig { key: String, message: String },
}

impl AppError {
    pub fn transport(endpoint: impl Into<String>, source: reqwest::Error) -> Self {
        AppError::Transport { endpoint: endpoint.into(), source }
    }

    pub fn malformed(endpoint: impl Into<String>, message: impl ToString) -> Self {
        AppError::MalformedResponse {
            endpoint: endpoint.into(),
            message: message.to_string(),
        }
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, AppError::ConversationNotFound { .. })
    }

    /// Network-level failures: the request never completed or the server refused it.
    pub fn is_transport(&self) -> bool {
        matches!(self, AppError::Transport { .. } | AppError::Status { .. })
    }
}
