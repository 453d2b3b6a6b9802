/// Database models for TaskNotes
///
/// This module contains the row types and their CRUD operations.
///
/// # Models
///
/// - `user`: Accounts and credentials
/// - `task`: User-owned to-do items
/// - `note`: Free-text annotations attached to a task
///
/// Task and note operations always take the requesting user's ID; there is
/// no unscoped accessor.

pub mod note;
pub mod task;
pub mod user;

use validator::ValidationError;

/// Rejects titles that are empty once whitespace is trimmed
pub(crate) fn title_not_blank(title: &str) -> Result<(), ValidationError> {
    if title.trim().is_empty() {
        let mut error = ValidationError::new("blank");
        error.message = Some("Title is required".into());
        return Err(error);
    }
    Ok(())
}
