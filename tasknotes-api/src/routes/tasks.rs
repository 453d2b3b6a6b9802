/// Task endpoints
///
/// Every handler runs behind the JWT layer and only sees the caller's tasks.
/// A task owned by someone else answers exactly like a missing one (404).
///
/// Creating, completing and deleting a task also pushes a message to the
/// owner's notification streams.

use crate::{
    app::AppState,
    dto::{CreateTaskRequest, TaskFilterParams, TaskResponse, UpdateTaskRequest},
    error::ApiResult,
    extract::{AppJson, AppPath, AppQuery},
};
use axum::{extract::State, http::StatusCode};
use chrono::Utc;
use tasknotes_shared::{
    auth::middleware::AuthContext,
    query::TaskQuery,
    service::{TaskWithNotes, UpdatedTask},
};

fn responses(tasks: Vec<TaskWithNotes>) -> Vec<TaskResponse> {
    tasks.into_iter().map(TaskResponse::from).collect()
}

/// `GET /api/task?Title=&IsCompleted=&From=&To=`
///
/// Absent parameters impose no constraint; the supplied ones are combined
/// with AND. Results are ordered by ID.
pub async fn list_tasks(
    State(state): State<AppState>,
    auth: AuthContext,
    AppQuery(params): AppQuery<TaskFilterParams>,
) -> ApiResult<AppJson<Vec<TaskResponse>>> {
    let query = TaskQuery::from(params);
    let tasks = state.tasks.list(auth.user_id, &query).await?;
    Ok(AppJson(responses(tasks)))
}

/// `GET /api/task/upcoming`: open tasks due next week
pub async fn upcoming_tasks(
    State(state): State<AppState>,
    auth: AuthContext,
) -> ApiResult<AppJson<Vec<TaskResponse>>> {
    let tasks = state
        .tasks
        .upcoming(auth.user_id, Utc::now().date_naive())
        .await?;
    Ok(AppJson(responses(tasks)))
}

/// `GET /api/task/past-due`: open tasks that were due last week
pub async fn past_due_tasks(
    State(state): State<AppState>,
    auth: AuthContext,
) -> ApiResult<AppJson<Vec<TaskResponse>>> {
    let tasks = state
        .tasks
        .past_due(auth.user_id, Utc::now().date_naive())
        .await?;
    Ok(AppJson(responses(tasks)))
}

pub async fn get_task(
    State(state): State<AppState>,
    auth: AuthContext,
    AppPath(id): AppPath<i64>,
) -> ApiResult<AppJson<TaskResponse>> {
    let task = state.tasks.get(auth.user_id, id).await?;
    Ok(AppJson(task.into()))
}

/// `POST /api/task` → 201 with the created task
pub async fn create_task(
    State(state): State<AppState>,
    auth: AuthContext,
    AppJson(req): AppJson<CreateTaskRequest>,
) -> ApiResult<(StatusCode, AppJson<TaskResponse>)> {
    let task = state.tasks.create(auth.user_id, req.into()).await?;

    state
        .hub
        .send_to_user(auth.user_id, format!("Task '{}' created", task.title));

    let created = TaskWithNotes {
        task,
        notes: Vec::new(),
    };
    Ok((StatusCode::CREATED, AppJson(created.into())))
}

/// `PUT /api/task/{id}` replaces every mutable field
pub async fn update_task(
    State(state): State<AppState>,
    auth: AuthContext,
    AppPath(id): AppPath<i64>,
    AppJson(req): AppJson<UpdateTaskRequest>,
) -> ApiResult<AppJson<TaskResponse>> {
    let UpdatedTask {
        task,
        newly_completed,
    } = state.tasks.update(auth.user_id, id, req.into()).await?;

    if newly_completed {
        state
            .hub
            .send_to_user(auth.user_id, format!("Task '{}' completed", task.task.title));
    }

    Ok(AppJson(task.into()))
}

/// `DELETE /api/task/{id}` → 204; the task's notes go with it
pub async fn delete_task(
    State(state): State<AppState>,
    auth: AuthContext,
    AppPath(id): AppPath<i64>,
) -> ApiResult<StatusCode> {
    let existing = state.tasks.get(auth.user_id, id).await?;
    state.tasks.delete(auth.user_id, id).await?;

    state.hub.send_to_user(
        auth.user_id,
        format!("Task '{}' deleted", existing.task.title),
    );

    Ok(StatusCode::NO_CONTENT)
}
