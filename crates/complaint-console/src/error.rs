//! Error types for the complaint console

use complaint_client::ClientError;
use thiserror::Error;

/// Result type for console operations
pub type Result<T> = std::result::Result<T, ConsoleError>;

/// Console error types
///
/// Nothing here is fatal: every variant degrades to an inline message via
/// [`ConsoleError::user_message`] and leaves the view in its prior state.
#[derive(Error, Debug)]
pub enum ConsoleError {
    /// Local pre-flight check failed; no request was sent
    #[error("Validation error: {0}")]
    Validation(String),

    /// Session missing or rejected; the session has been torn down
    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    /// Signed in but not permitted
    #[error("Forbidden: {0}")]
    Forbidden(String),

    /// Record does not exist
    #[error("Not found: {0}")]
    NotFound(String),

    /// Record changed since it was locked
    #[error("Conflict: {0}")]
    Conflict(String),

    /// Server refused the request
    #[error("Rejected by server ({status}): {message}")]
    Rejected { status: u16, message: String },

    /// Network or decoding failure
    #[error("Network error: {0}")]
    Transport(String),

    /// A lock acquisition for this complaint is already in flight
    #[error("Lock acquisition already in progress for complaint {0}")]
    LockPending(String),

    /// The lock or edit was released while its request was in flight
    #[error("Edit of complaint {0} was cancelled")]
    Cancelled(String),

    /// No editing affordance is open for this complaint
    #[error("Complaint {0} is not open for editing")]
    NotEditing(String),

    /// The advisory lock ran out before submit
    #[error("Edit lock on complaint {0} expired")]
    LockExpired(String),

    /// A request for this view is already in progress
    #[error("Already in progress: {0}")]
    Busy(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),
}

impl ConsoleError {
    /// Human-readable message for the view's error slot.
    ///
    /// Server-supplied messages win; otherwise `fallback` is used for
    /// remote failures.
    pub fn user_message(&self, fallback: &str) -> String {
        match self {
            ConsoleError::Validation(message) => message.clone(),
            ConsoleError::Unauthorized(_) => "Your session has expired. Please sign in again.".to_string(),
            ConsoleError::Forbidden(message)
            | ConsoleError::NotFound(message)
            | ConsoleError::Conflict(message)
            | ConsoleError::Rejected { message, .. } => {
                if message.is_empty() {
                    fallback.to_string()
                } else {
                    message.clone()
                }
            }
            ConsoleError::Transport(_) | ConsoleError::Config(_) => fallback.to_string(),
            other => other.to_string(),
        }
    }

    /// Whether the session must be torn down
    pub fn is_unauthorized(&self) -> bool {
        matches!(self, ConsoleError::Unauthorized(_))
    }

    /// Whether the server rejected a mutation because the record moved on
    pub fn is_conflict(&self) -> bool {
        matches!(self, ConsoleError::Conflict(_))
    }
}

impl From<ClientError> for ConsoleError {
    fn from(err: ClientError) -> Self {
        match err {
            ClientError::Unauthorized(message) => ConsoleError::Unauthorized(message),
            ClientError::Forbidden(message) => ConsoleError::Forbidden(message),
            ClientError::NotFound(message) => ConsoleError::NotFound(message),
            ClientError::Conflict { message, .. } => ConsoleError::Conflict(message),
            ClientError::Server { status, message } => ConsoleError::Rejected { status, message },
            ClientError::Config(message) => ConsoleError::Config(message),
            other => ConsoleError::Transport(other.to_string()),
        }
    }
}
