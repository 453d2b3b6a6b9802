/// Note endpoints
///
/// Notes are reached through their task's owner: a note under someone
/// else's task is reported as not found.

use crate::{
    app::AppState,
    dto::{NoteRequest, NoteResponse},
    error::ApiResult,
    extract::{AppJson, AppPath},
};
use axum::{extract::State, http::StatusCode};
use tasknotes_shared::auth::middleware::AuthContext;

/// `GET /api/note/task/{taskId}/notes`
pub async fn list_notes(
    State(state): State<AppState>,
    auth: AuthContext,
    AppPath(task_id): AppPath<i64>,
) -> ApiResult<AppJson<Vec<NoteResponse>>> {
    let notes = state.notes.list_for_task(auth.user_id, task_id).await?;
    Ok(AppJson(notes.into_iter().map(NoteResponse::from).collect()))
}

/// `POST /api/note/task/{taskId}` → 201
pub async fn create_note(
    State(state): State<AppState>,
    auth: AuthContext,
    AppPath(task_id): AppPath<i64>,
    AppJson(req): AppJson<NoteRequest>,
) -> ApiResult<(StatusCode, AppJson<NoteResponse>)> {
    let note = state.notes.create(auth.user_id, task_id, req.into()).await?;
    Ok((StatusCode::CREATED, AppJson(note.into())))
}

pub async fn get_note(
    State(state): State<AppState>,
    auth: AuthContext,
    AppPath(id): AppPath<i64>,
) -> ApiResult<AppJson<NoteResponse>> {
    let note = state.notes.get(auth.user_id, id).await?;
    Ok(AppJson(note.into()))
}

pub async fn update_note(
    State(state): State<AppState>,
    auth: AuthContext,
    AppPath(id): AppPath<i64>,
    AppJson(req): AppJson<NoteRequest>,
) -> ApiResult<AppJson<NoteResponse>> {
    let note = state.notes.update(auth.user_id, id, req.into()).await?;
    Ok(AppJson(note.into()))
}

pub async fn delete_note(
    State(state): State<AppState>,
    auth: AuthContext,
    AppPath(id): AppPath<i64>,
) -> ApiResult<StatusCode> {
    state.notes.delete(auth.user_id, id).await?;
    Ok(StatusCode::NO_CONTENT)
}
