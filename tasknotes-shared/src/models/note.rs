/// Note model and database operations
///
/// Notes hang off a task and have no owner column of their own: ownership is
/// always checked by joining through `tasks.user_id`.
///
/// # Schema
///
/// ```sql
/// CREATE TABLE notes (
///     id BIGSERIAL PRIMARY KEY,
///     task_id BIGINT NOT NULL REFERENCES tasks(id) ON DELETE CASCADE,
///     title VARCHAR(200),
///     content VARCHAR(5000),
///     created_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
/// );
/// ```

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::PgPool;
use uuid::Uuid;
use validator::Validate;

/// Free-text note attached to a task
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, sqlx::FromRow)]
pub struct Note {
    pub id: i64,

    /// Owning task
    pub task_id: i64,

    pub title: Option<String>,

    pub content: Option<String>,

    /// Set once at creation
    pub created_at: DateTime<Utc>,
}

/// Title and content of a note, used for both create and update
#[derive(Debug, Clone, Default, Serialize, Deserialize, Validate)]
pub struct NoteFields {
    #[validate(length(max = 200, message = "Title must be at most 200 characters"))]
    pub title: Option<String>,

    #[validate(length(max = 5000, message = "Content must be at most 5000 characters"))]
    pub content: Option<String>,
}

impl Note {
    /// Creates a note under a task owned by `user_id`
    ///
    /// The ownership check and the insert are one statement. Returns None if
    /// the task does not exist or belongs to someone else.
    pub async fn create_for_user(
        pool: &PgPool,
        task_id: i64,
        user_id: Uuid,
        data: &NoteFields,
    ) -> Result<Option<Self>, sqlx::Error> {
        let note = sqlx::query_as::<_, Note>(
            r#"
            INSERT INTO notes (task_id, title, content)
            SELECT t.id, $3, $4
            FROM tasks t
            WHERE t.id = $1 AND t.user_id = $2
            RETURNING id, task_id, title, content, created_at
            "#,
        )
        .bind(task_id)
        .bind(user_id)
        .bind(&data.title)
        .bind(&data.content)
        .fetch_optional(pool)
        .await?;

        Ok(note)
    }

    /// Lists the notes of one task owned by `user_id`, oldest first
    pub async fn list_for_task(
        pool: &PgPool,
        task_id: i64,
        user_id: Uuid,
    ) -> Result<Vec<Self>, sqlx::Error> {
        let notes = sqlx::query_as::<_, Note>(
            r#"
            SELECT n.id, n.task_id, n.title, n.content, n.created_at
            FROM notes n
            JOIN tasks t ON t.id = n.task_id
            WHERE n.task_id = $1 AND t.user_id = $2
            ORDER BY n.id ASC
            "#,
        )
        .bind(task_id)
        .bind(user_id)
        .fetch_all(pool)
        .await?;

        Ok(notes)
    }

    /// Lists the notes of several tasks owned by `user_id` in one round trip
    pub async fn list_for_tasks(
        pool: &PgPool,
        task_ids: &[i64],
        user_id: Uuid,
    ) -> Result<Vec<Self>, sqlx::Error> {
        if task_ids.is_empty() {
            return Ok(Vec::new());
        }

        let notes = sqlx::query_as::<_, Note>(
            r#"
            SELECT n.id, n.task_id, n.title, n.content, n.created_at
            FROM notes n
            JOIN tasks t ON t.id = n.task_id
            WHERE n.task_id = ANY($1) AND t.user_id = $2
            ORDER BY n.id ASC
            "#,
        )
        .bind(task_ids)
        .bind(user_id)
        .fetch_all(pool)
        .await?;

        Ok(notes)
    }

    /// Finds a note by ID through its owning task
    pub async fn find_for_user(
        pool: &PgPool,
        id: i64,
        user_id: Uuid,
    ) -> Result<Option<Self>, sqlx::Error> {
        let note = sqlx::query_as::<_, Note>(
            r#"
            SELECT n.id, n.task_id, n.title, n.content, n.created_at
            FROM notes n
            JOIN tasks t ON t.id = n.task_id
            WHERE n.id = $1 AND t.user_id = $2
            "#,
        )
        .bind(id)
        .bind(user_id)
        .fetch_optional(pool)
        .await?;

        Ok(note)
    }

    /// Replaces title and content of a note reachable by `user_id`
    pub async fn update_for_user(
        pool: &PgPool,
        id: i64,
        user_id: Uuid,
        data: &NoteFields,
    ) -> Result<Option<Self>, sqlx::Error> {
        let note = sqlx::query_as::<_, Note>(
            r#"
            UPDATE notes n
            SET title = $3,
                content = $4
            FROM tasks t
            WHERE n.id = $1 AND t.id = n.task_id AND t.user_id = $2
            RETURNING n.id, n.task_id, n.title, n.content, n.created_at
            "#,
        )
        .bind(id)
        .bind(user_id)
        .bind(&data.title)
        .bind(&data.content)
        .fetch_optional(pool)
        .await?;

        Ok(note)
    }

    /// Deletes a note reachable by `user_id`
    pub async fn delete_for_user(pool: &PgPool, id: i64, user_id: Uuid) -> Result<bool, sqlx::Error> {
        let result = sqlx::query(
            r#"
            DELETE FROM notes n
            USING tasks t
            WHERE n.id = $1 AND t.id = n.task_id AND t.user_id = $2
            "#,
        )
        .bind(id)
        .bind(user_id)
        .execute(pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }
}
