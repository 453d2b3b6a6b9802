/// Storage seam between the services and the backing database
///
/// The services talk to storage only through these traits, so the same
/// ownership and validation logic runs against PostgreSQL in production and
/// against [`MemoryStore`] in tests and local development.
///
/// # Implementations
///
/// - [`PgStore`]: delegates to the sqlx model methods in [`crate::models`]
/// - [`MemoryStore`]: `RwLock`-guarded maps with identical semantics
///
/// Every task and note method takes the requesting user's ID. An entity
/// owned by another user is reported exactly like a missing one.

pub mod memory;
pub mod postgres;

pub use memory::MemoryStore;
pub use postgres::PgStore;

use async_trait::async_trait;
use uuid::Uuid;

use crate::models::{
    note::{Note, NoteFields},
    task::{NewTask, Task, TaskChanges, TaskUpdate},
    user::{CreateUser, User},
};
use crate::query::TaskQuery;

/// Error type for store operations
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// A uniqueness rule was violated (e.g., username already taken)
    #[error("Conflict on {0}")]
    Conflict(String),

    /// Underlying database failure
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),
}

pub type StoreResult<T> = Result<T, StoreError>;

/// Account persistence
#[async_trait]
pub trait UserStore: Send + Sync {
    /// Fails with [`StoreError::Conflict`] naming `username` or `email` when
    /// either is already taken (case-insensitive)
    async fn create_user(&self, data: CreateUser) -> StoreResult<User>;

    async fn find_user(&self, id: Uuid) -> StoreResult<Option<User>>;

    async fn find_user_by_username(&self, username: &str) -> StoreResult<Option<User>>;

    async fn record_login(&self, id: Uuid) -> StoreResult<()>;
}

/// Task persistence, always scoped by owner
#[async_trait]
pub trait TaskStore: Send + Sync {
    async fn insert_task(&self, user_id: Uuid, data: &NewTask) -> StoreResult<Task>;

    async fn find_task(&self, id: i64, user_id: Uuid) -> StoreResult<Option<Task>>;

    /// Tasks of `user_id` matching `query`, ordered by ID
    async fn list_tasks(&self, user_id: Uuid, query: &TaskQuery) -> StoreResult<Vec<Task>>;

    /// Applies `data` and reports whether the task was completed before,
    /// read atomically with the write
    async fn update_task(
        &self,
        id: i64,
        user_id: Uuid,
        data: &TaskChanges,
    ) -> StoreResult<Option<TaskUpdate>>;

    /// Deletes the task and all of its notes
    async fn delete_task(&self, id: i64, user_id: Uuid) -> StoreResult<bool>;

    async fn task_exists(&self, id: i64, user_id: Uuid) -> StoreResult<bool>;
}

/// Note persistence, scoped through the owning task's user
#[async_trait]
pub trait NoteStore: Send + Sync {
    /// Returns None when the task is missing or not owned by `user_id`
    async fn insert_note(
        &self,
        task_id: i64,
        user_id: Uuid,
        data: &NoteFields,
    ) -> StoreResult<Option<Note>>;

    async fn list_notes(&self, task_id: i64, user_id: Uuid) -> StoreResult<Vec<Note>>;

    /// Notes of several tasks at once, ordered by ID
    async fn list_notes_for_tasks(&self, task_ids: &[i64], user_id: Uuid)
        -> StoreResult<Vec<Note>>;

    async fn find_note(&self, id: i64, user_id: Uuid) -> StoreResult<Option<Note>>;

    async fn update_note(
        &self,
        id: i64,
        user_id: Uuid,
        data: &NoteFields,
    ) -> StoreResult<Option<Note>>;

    async fn delete_note(&self, id: i64, user_id: Uuid) -> StoreResult<bool>;
}

/// Complete storage backend
#[async_trait]
pub trait Store: UserStore + TaskStore + NoteStore {
    /// Short backend name for logs and health output
    fn backend(&self) -> &'static str;

    /// Verifies the backend is reachable
    async fn ping(&self) -> StoreResult<()>;
}
