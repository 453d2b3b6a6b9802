/// PostgreSQL store
///
/// Thin adapter from the store traits to the sqlx model methods. The only
/// logic here is translating unique-index violations into
/// [`StoreError::Conflict`].

use async_trait::async_trait;
use sqlx::PgPool;
use uuid::Uuid;

use super::{NoteStore, Store, StoreError, StoreResult, TaskStore, UserStore};
use crate::db::pool::health_check;
use crate::models::{
    note::{Note, NoteFields},
    task::{NewTask, Task, TaskChanges, TaskUpdate},
    user::{CreateUser, User},
};
use crate::query::TaskQuery;

/// Store backed by a PostgreSQL connection pool
#[derive(Debug, Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }
}

/// Maps unique-index violations on `users` to a conflict naming the field
fn map_user_conflict(err: sqlx::Error) -> StoreError {
    if let sqlx::Error::Database(db_err) = &err {
        if let Some(constraint) = db_err.constraint() {
            if constraint.contains("username") {
                return StoreError::Conflict("username".to_string());
            }
            if constraint.contains("email") {
                return StoreError::Conflict("email".to_string());
            }
        }
    }
    StoreError::Database(err)
}

#[async_trait]
impl UserStore for PgStore {
    async fn create_user(&self, data: CreateUser) -> StoreResult<User> {
        User::create(&self.pool, data).await.map_err(map_user_conflict)
    }

    async fn find_user(&self, id: Uuid) -> StoreResult<Option<User>> {
        Ok(User::find_by_id(&self.pool, id).await?)
    }

    async fn find_user_by_username(&self, username: &str) -> StoreResult<Option<User>> {
        Ok(User::find_by_username(&self.pool, username).await?)
    }

    async fn record_login(&self, id: Uuid) -> StoreResult<()> {
        User::update_last_login(&self.pool, id).await?;
        Ok(())
    }
}

#[async_trait]
impl TaskStore for PgStore {
    async fn insert_task(&self, user_id: Uuid, data: &NewTask) -> StoreResult<Task> {
        Ok(Task::create(&self.pool, user_id, data).await?)
    }

    async fn find_task(&self, id: i64, user_id: Uuid) -> StoreResult<Option<Task>> {
        Ok(Task::find_for_user(&self.pool, id, user_id).await?)
    }

    async fn list_tasks(&self, user_id: Uuid, query: &TaskQuery) -> StoreResult<Vec<Task>> {
        Ok(Task::list_for_user(&self.pool, user_id, query).await?)
    }

    async fn update_task(
        &self,
        id: i64,
        user_id: Uuid,
        data: &TaskChanges,
    ) -> StoreResult<Option<TaskUpdate>> {
        Ok(Task::update_for_user(&self.pool, id, user_id, data).await?)
    }

    async fn delete_task(&self, id: i64, user_id: Uuid) -> StoreResult<bool> {
        Ok(Task::delete_for_user(&self.pool, id, user_id).await?)
    }

    async fn task_exists(&self, id: i64, user_id: Uuid) -> StoreResult<bool> {
        Ok(Task::exists_for_user(&self.pool, id, user_id).await?)
    }
}

#[async_trait]
impl NoteStore for PgStore {
    async fn insert_note(
        &self,
        task_id: i64,
        user_id: Uuid,
        data: &NoteFields,
    ) -> StoreResult<Option<Note>> {
        Ok(Note::create_for_user(&self.pool, task_id, user_id, data).await?)
    }

    async fn list_notes(&self, task_id: i64, user_id: Uuid) -> StoreResult<Vec<Note>> {
        Ok(Note::list_for_task(&self.pool, task_id, user_id).await?)
    }

    async fn list_notes_for_tasks(
        &self,
        task_ids: &[i64],
        user_id: Uuid,
    ) -> StoreResult<Vec<Note>> {
        Ok(Note::list_for_tasks(&self.pool, task_ids, user_id).await?)
    }

    async fn find_note(&self, id: i64, user_id: Uuid) -> StoreResult<Option<Note>> {
        Ok(Note::find_for_user(&self.pool, id, user_id).await?)
    }

    async fn update_note(
        &self,
        id: i64,
        user_id: Uuid,
        data: &NoteFields,
    ) -> StoreResult<Option<Note>> {
        Ok(Note::update_for_user(&self.pool, id, user_id, data).await?)
    }

    async fn delete_note(&self, id: i64, user_id: Uuid) -> StoreResult<bool> {
        Ok(Note::delete_for_user(&self.pool, id, user_id).await?)
    }
}

#[async_trait]
impl Store for PgStore {
    fn backend(&self) -> &'static str {
        "postgres"
    }

    async fn ping(&self) -> StoreResult<()> {
        Ok(health_check(&self.pool).await?)
    }
}
