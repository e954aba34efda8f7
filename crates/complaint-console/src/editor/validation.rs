//! Pre-flight checks for edit submissions

use complaint_client::ComplaintStatus;

use crate::error::{ConsoleError, Result};

/// Minimum note length after trimming
pub const MIN_NOTE_LEN: usize = 5;

/// Validate a note, returning its trimmed text
pub fn validate_note(note: &str) -> Result<&str> {
    let trimmed = note.trim();
    if trimmed.is_empty() {
        return Err(ConsoleError::Validation("Note is required".into()));
    }
    if trimmed.chars().count() < MIN_NOTE_LEN {
        return Err(ConsoleError::Validation(format!(
            "Note must be at least {} characters",
            MIN_NOTE_LEN
        )));
    }
    Ok(trimmed)
}

/// Validate a status selection
pub fn validate_status(status: Option<ComplaintStatus>) -> Result<ComplaintStatus> {
    status.ok_or_else(|| ConsoleError::Validation("Please select a status".into()))
}
