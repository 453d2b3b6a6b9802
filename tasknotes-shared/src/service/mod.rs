/// Use-case services
///
/// Services sit between the HTTP handlers and the [`Store`](crate::store::Store).
/// They validate input, enforce ownership by always passing the caller's
/// user ID down, and turn storage outcomes into [`ServiceError`]s.
///
/// - [`TaskService`]: task CRUD, filtering and the upcoming/past-due views
/// - [`NoteService`]: notes attached to the caller's tasks
/// - [`AccountService`]: registration, login and token refresh

pub mod account_service;
pub mod note_service;
pub mod task_service;

pub use account_service::{AccountService, LoginInput, RegisterInput, Session};
pub use note_service::NoteService;
pub use task_service::{TaskService, TaskWithNotes, UpdatedTask};

use std::collections::BTreeMap;

use validator::ValidationErrors;

use crate::store::StoreError;

/// Validation messages keyed by field name
pub type FieldErrors = BTreeMap<String, Vec<String>>;

/// Error type for service operations
#[derive(Debug, thiserror::Error)]
pub enum ServiceError {
    /// Entity is missing or owned by someone else
    #[error("{0} not found")]
    NotFound(&'static str),

    #[error("Validation failed")]
    Validation(FieldErrors),

    /// Username or email already in use
    #[error("{0}")]
    Conflict(String),

    #[error("{0}")]
    Unauthorized(String),

    #[error("Storage error: {0}")]
    Store(StoreError),

    /// Hashing or token signing failed
    #[error("Internal error: {0}")]
    Internal(String),
}

pub type ServiceResult<T> = Result<T, ServiceError>;

impl ServiceError {
    /// Validation error for a single field
    pub fn invalid_field(field: &str, message: impl Into<String>) -> Self {
        let mut errors = FieldErrors::new();
        errors.insert(field.to_string(), vec![message.into()]);
        ServiceError::Validation(errors)
    }
}

impl From<StoreError> for ServiceError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::Conflict(field) => {
                ServiceError::Conflict(format!("{} is already taken", capitalize(&field)))
            }
            other => ServiceError::Store(other),
        }
    }
}

impl From<ValidationErrors> for ServiceError {
    fn from(errors: ValidationErrors) -> Self {
        ServiceError::Validation(field_errors(&errors))
    }
}

/// Flattens `validator` output into field → messages
pub fn field_errors(errors: &ValidationErrors) -> FieldErrors {
    errors
        .field_errors()
        .into_iter()
        .map(|(field, errors)| {
            let messages = errors
                .iter()
                .map(|error| match &error.message {
                    Some(message) => message.to_string(),
                    None => format!("Invalid value ({})", error.code),
                })
                .collect();
            (field.to_string(), messages)
        })
        .collect()
}

fn capitalize(word: &str) -> String {
    let mut chars = word.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}
