/// Task model and database operations
///
/// A task belongs to exactly one user. Every query here takes the owning
/// user's ID, so a task owned by someone else behaves exactly like a task
/// that does not exist.
///
/// # Schema
///
/// ```sql
/// CREATE TABLE tasks (
///     id BIGSERIAL PRIMARY KEY,
///     user_id UUID NOT NULL REFERENCES users(id) ON DELETE CASCADE,
///     title VARCHAR(200) NOT NULL CHECK (length(btrim(title)) > 0),
///     description VARCHAR(2000),
///     due_date TIMESTAMPTZ,
///     is_completed BOOLEAN NOT NULL DEFAULT FALSE,
///     created_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
/// );
/// ```
///
/// # Example
///
/// ```no_run
/// use tasknotes_shared::models::task::{NewTask, Task};
/// use tasknotes_shared::query::TaskQuery;
/// use sqlx::PgPool;
/// use uuid::Uuid;
///
/// # async fn example(pool: PgPool, user_id: Uuid) -> Result<(), sqlx::Error> {
/// let task = Task::create(&pool, user_id, &NewTask {
///     title: "Pay rent".to_string(),
///     description: None,
///     due_date: None,
/// }).await?;
///
/// let open = Task::list_for_user(&pool, user_id, &TaskQuery {
///     is_completed: Some(false),
///     ..Default::default()
/// }).await?;
/// assert!(open.iter().any(|t| t.id == task.id));
/// # Ok(())
/// # }
/// ```

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{PgPool, Postgres, QueryBuilder};
use uuid::Uuid;
use validator::Validate;

use super::title_not_blank;
use crate::query::TaskQuery;

/// Task model representing a user's to-do item
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, sqlx::FromRow)]
pub struct Task {
    /// Unique task ID
    pub id: i64,

    /// Owning user
    pub user_id: Uuid,

    pub title: String,

    pub description: Option<String>,

    /// When the task is due (UTC)
    pub due_date: Option<DateTime<Utc>>,

    pub is_completed: bool,

    /// Set once at creation
    pub created_at: DateTime<Utc>,
}

/// A task after an update, with its completion flag from just before
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct TaskUpdate {
    #[sqlx(flatten)]
    pub task: Task,

    pub was_completed: bool,
}

impl TaskUpdate {
    /// True only for the update that moved the task from open to completed
    pub fn newly_completed(&self) -> bool {
        !self.was_completed && self.task.is_completed
    }
}

/// Input for creating a task
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct NewTask {
    #[validate(
        custom(function = "title_not_blank"),
        length(max = 200, message = "Title must be at most 200 characters")
    )]
    pub title: String,

    #[validate(length(max = 2000, message = "Description must be at most 2000 characters"))]
    pub description: Option<String>,

    pub due_date: Option<DateTime<Utc>>,
}

/// Replacement values for every mutable task field
///
/// Updates are wholesale: a `None` description or due date clears it.
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct TaskChanges {
    #[validate(
        custom(function = "title_not_blank"),
        length(max = 200, message = "Title must be at most 200 characters")
    )]
    pub title: String,

    #[validate(length(max = 2000, message = "Description must be at most 2000 characters"))]
    pub description: Option<String>,

    pub due_date: Option<DateTime<Utc>>,

    pub is_completed: bool,
}

const TASK_COLUMNS: &str = "id, user_id, title, description, due_date, is_completed, created_at";

impl Task {
    /// Creates a new, not yet completed task
    pub async fn create(pool: &PgPool, user_id: Uuid, data: &NewTask) -> Result<Self, sqlx::Error> {
        let task = sqlx::query_as::<_, Task>(
            r#"
            INSERT INTO tasks (user_id, title, description, due_date)
            VALUES ($1, $2, $3, $4)
            RETURNING id, user_id, title, description, due_date, is_completed, created_at
            "#,
        )
        .bind(user_id)
        .bind(&data.title)
        .bind(&data.description)
        .bind(data.due_date)
        .fetch_one(pool)
        .await?;

        Ok(task)
    }

    /// Finds a task by ID, scoped to its owner
    pub async fn find_for_user(
        pool: &PgPool,
        id: i64,
        user_id: Uuid,
    ) -> Result<Option<Self>, sqlx::Error> {
        let task = sqlx::query_as::<_, Task>(
            r#"
            SELECT id, user_id, title, description, due_date, is_completed, created_at
            FROM tasks
            WHERE id = $1 AND user_id = $2
            "#,
        )
        .bind(id)
        .bind(user_id)
        .fetch_optional(pool)
        .await?;

        Ok(task)
    }

    /// Lists a user's tasks matching `query`, oldest first
    pub async fn list_for_user(
        pool: &PgPool,
        user_id: Uuid,
        query: &TaskQuery,
    ) -> Result<Vec<Self>, sqlx::Error> {
        let mut builder: QueryBuilder<Postgres> =
            QueryBuilder::new(format!("SELECT {TASK_COLUMNS} FROM tasks WHERE user_id = "));
        builder.push_bind(user_id);
        query.push_predicates(&mut builder);
        builder.push(" ORDER BY id ASC");

        let tasks = builder.build_query_as::<Task>().fetch_all(pool).await?;

        Ok(tasks)
    }

    /// Replaces the mutable fields of a task owned by `user_id`
    ///
    /// The row is locked while its previous completion flag is read, so
    /// concurrent updates each see the state the other left behind.
    /// Returns None if the task does not exist or belongs to someone else.
    pub async fn update_for_user(
        pool: &PgPool,
        id: i64,
        user_id: Uuid,
        data: &TaskChanges,
    ) -> Result<Option<TaskUpdate>, sqlx::Error> {
        let update = sqlx::query_as::<_, TaskUpdate>(
            r#"
            WITH previous AS (
                SELECT id, is_completed
                FROM tasks
                WHERE id = $1 AND user_id = $2
                FOR UPDATE
            )
            UPDATE tasks
            SET title = $3,
                description = $4,
                due_date = $5,
                is_completed = $6
            FROM previous
            WHERE tasks.id = previous.id
            RETURNING tasks.id, tasks.user_id, tasks.title, tasks.description,
                      tasks.due_date, tasks.is_completed, tasks.created_at,
                      previous.is_completed AS was_completed
            "#,
        )
        .bind(id)
        .bind(user_id)
        .bind(&data.title)
        .bind(&data.description)
        .bind(data.due_date)
        .bind(data.is_completed)
        .fetch_optional(pool)
        .await?;

        Ok(update)
    }

    /// Deletes a task owned by `user_id`
    ///
    /// ⚠️  This also deletes all of the task's notes due to CASCADE.
    pub async fn delete_for_user(pool: &PgPool, id: i64, user_id: Uuid) -> Result<bool, sqlx::Error> {
        let result = sqlx::query("DELETE FROM tasks WHERE id = $1 AND user_id = $2")
            .bind(id)
            .bind(user_id)
            .execute(pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    /// Checks whether `user_id` owns a task with this ID
    pub async fn exists_for_user(pool: &PgPool, id: i64, user_id: Uuid) -> Result<bool, sqlx::Error> {
        let exists: bool = sqlx::query_scalar(
            "SELECT EXISTS (SELECT 1 FROM tasks WHERE id = $1 AND user_id = $2)",
        )
        .bind(id)
        .bind(user_id)
        .fetch_one(pool)
        .await?;

        Ok(exists)
    }
}
