use serde_json::Value;
use thiserror::Error;

/// Failure of a single call to the backend API.
///
/// `Status` means the server answered with a non-success status code and
/// carries whatever body it sent back. `Transport` covers everything that
/// never produced a response: refused connections, DNS, timeouts.
#[derive(Debug, Clone, Error)]
pub enum ApiError {
    #[error("server responded with status {status}")]
    Status { status: u16, body: Value },
    #[error("request failed: {0}")]
    Transport(String),
}

impl ApiError {
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Status { status, .. } => Some(*status),
            Self::Transport(_) => None,
        }
    }

    /// The `message` field of the error payload, when the server sent one.
    pub fn server_message(&self) -> Option<&str> {
        match self {
            Self::Status { body, .. } => body
                .get("message")
                .and_then(Value::as_str)
                .filter(|message| !message.is_empty()),
            Self::Transport(_) => None,
        }
    }

    pub fn has_response(&self) -> bool {
        matches!(self, Self::Status { .. })
    }
}
