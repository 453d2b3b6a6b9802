/// Note use-cases
///
/// Notes have no owner column; ownership is checked through the task they
/// hang off. A note under someone else's task is reported as not found.

use std::sync::Arc;

use tracing::info;
use uuid::Uuid;
use validator::Validate;

use super::{ServiceError, ServiceResult};
use crate::models::note::{Note, NoteFields};
use crate::store::Store;

/// Note service facade over a [`Store`]
#[derive(Clone)]
pub struct NoteService {
    store: Arc<dyn Store>,
}

impl NoteService {
    pub fn new(store: Arc<dyn Store>) -> Self {
        Self { store }
    }

    /// Notes of one of the caller's tasks, ordered by ID
    pub async fn list_for_task(&self, user_id: Uuid, task_id: i64) -> ServiceResult<Vec<Note>> {
        if !self.store.task_exists(task_id, user_id).await? {
            return Err(ServiceError::NotFound("Task"));
        }

        Ok(self.store.list_notes(task_id, user_id).await?)
    }

    pub async fn get(&self, user_id: Uuid, id: i64) -> ServiceResult<Note> {
        self.store
            .find_note(id, user_id)
            .await?
            .ok_or(ServiceError::NotFound("Note"))
    }

    /// Attaches a new note to one of the caller's tasks
    pub async fn create(
        &self,
        user_id: Uuid,
        task_id: i64,
        data: NoteFields,
    ) -> ServiceResult<Note> {
        data.validate()?;

        let note = self
            .store
            .insert_note(task_id, user_id, &data)
            .await?
            .ok_or(ServiceError::NotFound("Task"))?;
        info!(note_id = note.id, task_id, user_id = %user_id, "Note created");

        Ok(note)
    }

    /// Replaces the note's title and content
    pub async fn update(&self, user_id: Uuid, id: i64, data: NoteFields) -> ServiceResult<Note> {
        data.validate()?;

        let note = self
            .store
            .update_note(id, user_id, &data)
            .await?
            .ok_or(ServiceError::NotFound("Note"))?;
        info!(note_id = note.id, user_id = %user_id, "Note updated");

        Ok(note)
    }

    pub async fn delete(&self, user_id: Uuid, id: i64) -> ServiceResult<()> {
        if !self.store.delete_note(id, user_id).await? {
            return Err(ServiceError::NotFound("Note"));
        }

        info!(note_id = id, user_id = %user_id, "Note deleted");
        Ok(())
    }
}
