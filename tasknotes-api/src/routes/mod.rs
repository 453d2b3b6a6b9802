/// API route handlers, one module per resource
///
/// - `health`: health check
/// - `account`: register, login, token refresh
/// - `tasks`: task CRUD, filters and due-date views
/// - `notes`: notes under a task
/// - `notifications`: SSE notification stream

pub mod account;
pub mod health;
pub mod notes;
pub mod notifications;
pub mod tasks;
