//! Error types for the complaint client

use thiserror::Error;

/// Complaint client error
#[derive(Debug, Error)]
pub enum ClientError {
    /// HTTP request failed before a response arrived
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// JSON serialization/deserialization failed
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Session file could not be read or written
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// No session, or the server rejected the bearer token (401)
    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    /// Authenticated but not allowed (403)
    #[error("Forbidden: {0}")]
    Forbidden(String),

    /// Resource not found (404)
    #[error("Not found: {0}")]
    NotFound(String),

    /// The record changed since it was read (409/412)
    #[error("Conflict {status}: {message}")]
    Conflict { status: u16, message: String },

    /// Any other non-success status
    #[error("Server error {status}: {message}")]
    Server { status: u16, message: String },

    /// Invalid client configuration
    #[error("Invalid configuration: {0}")]
    Config(String),
}

impl ClientError {
    /// HTTP status of the failed response, if one arrived
    pub fn status(&self) -> Option<u16> {
        match self {
            ClientError::Unauthorized(_) => Some(401),
            ClientError::Forbidden(_) => Some(403),
            ClientError::NotFound(_) => Some(404),
            ClientError::Conflict { status, .. } | ClientError::Server { status, .. } => {
                Some(*status)
            }
            ClientError::Http(err) => err.status().map(|s| s.as_u16()),
            _ => None,
        }
    }

    /// Message supplied by the server, if any
    pub fn server_message(&self) -> Option<&str> {
        let message = match self {
            ClientError::Unauthorized(m)
            | ClientError::Forbidden(m)
            | ClientError::NotFound(m) => m,
            ClientError::Conflict { message, .. } | ClientError::Server { message, .. } => message,
            _ => return None,
        };
        if message.is_empty() {
            None
        } else {
            Some(message)
        }
    }

    /// Whether the session must be torn down
    pub fn is_unauthorized(&self) -> bool {
        matches!(self, ClientError::Unauthorized(_))
    }
}

/// Extract a human-readable message from an error body.
///
/// The backend answers `{"message": "..."}`, `{"message": ["..", ".."]}` or
/// `{"error": "..."}`; anything else is returned verbatim.
pub(crate) fn extract_message(body: &str) -> String {
    let Ok(value) = serde_json::from_str::<serde_json::Value>(body) else {
        return body.trim().to_string();
    };

    match value.get("message") {
        Some(serde_json::Value::String(message)) => return message.clone(),
        Some(serde_json::Value::Array(messages)) => {
            let joined: Vec<&str> = messages.iter().filter_map(|m| m.as_str()).collect();
            if !joined.is_empty() {
                return joined.join("; ");
            }
        }
        _ => {}
    }

    match value.get("error") {
        Some(serde_json::Value::String(error)) => error.clone(),
        _ => String::new(),
    }
}

/// Result type for client operations
pub type Result<T> = std::result::Result<T, ClientError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extract_message_shapes() {
        assert_eq!(extract_message(r#"{"message":"Complaint is locked"}"#), "Complaint is locked");
        assert_eq!(
            extract_message(r#"{"message":["note too short","note required"]}"#),
            "note too short; note required"
        );
        assert_eq!(extract_message(r#"{"error":"Bad Request"}"#), "Bad Request");
        assert_eq!(extract_message("gateway timeout\n"), "gateway timeout");
        assert_eq!(extract_message(r#"{"statusCode":500}"#), "");
    }

    #[test]
    fn test_status_and_message() {
        let err = ClientError::Conflict { status: 409, message: "version mismatch".into() };
        assert_eq!(err.status(), Some(409));
        assert_eq!(err.server_message(), Some("version mismatch"));

        let err = ClientError::Server { status: 500, message: String::new() };
        assert_eq!(err.server_message(), None);
        assert!(ClientError::Unauthorized("expired".into()).is_unauthorized());
    }
}
