/// In-memory store
///
/// Mirrors the PostgreSQL semantics: serial IDs starting at 1, ID ordering,
/// case-insensitive username/email uniqueness, cascading task deletion and
/// owner scoping on every task and note operation. Data lives for the
/// lifetime of the process.

use std::collections::BTreeMap;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::RwLock;
use uuid::Uuid;

use super::{NoteStore, Store, StoreError, StoreResult, TaskStore, UserStore};
use crate::models::{
    note::{Note, NoteFields},
    task::{NewTask, Task, TaskChanges, TaskUpdate},
    user::{CreateUser, User},
};
use crate::query::TaskQuery;

#[derive(Debug, Default)]
struct Tables {
    users: BTreeMap<Uuid, User>,
    tasks: BTreeMap<i64, Task>,
    notes: BTreeMap<i64, Note>,
    last_task_id: i64,
    last_note_id: i64,
}

impl Tables {
    fn owned_task(&self, id: i64, user_id: Uuid) -> Option<&Task> {
        self.tasks.get(&id).filter(|task| task.user_id == user_id)
    }

    fn owns_note(&self, note: &Note, user_id: Uuid) -> bool {
        self.owned_task(note.task_id, user_id).is_some()
    }
}

/// Process-local store, cheap to clone
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    tables: Arc<RwLock<Tables>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Total number of notes across all users
    pub async fn note_count(&self) -> usize {
        self.tables.read().await.notes.len()
    }
}

#[async_trait]
impl UserStore for MemoryStore {
    async fn create_user(&self, data: CreateUser) -> StoreResult<User> {
        let mut tables = self.tables.write().await;

        for existing in tables.users.values() {
            if existing.username.to_lowercase() == data.username.to_lowercase() {
                return Err(StoreError::Conflict("username".to_string()));
            }
            if existing.email.to_lowercase() == data.email.to_lowercase() {
                return Err(StoreError::Conflict("email".to_string()));
            }
        }

        let user = User {
            id: Uuid::new_v4(),
            username: data.username,
            email: data.email,
            password_hash: data.password_hash,
            created_at: Utc::now(),
            last_login_at: None,
        };
        tables.users.insert(user.id, user.clone());

        Ok(user)
    }

    async fn find_user(&self, id: Uuid) -> StoreResult<Option<User>> {
        Ok(self.tables.read().await.users.get(&id).cloned())
    }

    async fn find_user_by_username(&self, username: &str) -> StoreResult<Option<User>> {
        let needle = username.to_lowercase();
        let tables = self.tables.read().await;
        Ok(tables
            .users
            .values()
            .find(|user| user.username.to_lowercase() == needle)
            .cloned())
    }

    async fn record_login(&self, id: Uuid) -> StoreResult<()> {
        if let Some(user) = self.tables.write().await.users.get_mut(&id) {
            user.last_login_at = Some(Utc::now());
        }
        Ok(())
    }
}

#[async_trait]
impl TaskStore for MemoryStore {
    async fn insert_task(&self, user_id: Uuid, data: &NewTask) -> StoreResult<Task> {
        let mut tables = self.tables.write().await;
        tables.last_task_id += 1;

        let task = Task {
            id: tables.last_task_id,
            user_id,
            title: data.title.clone(),
            description: data.description.clone(),
            due_date: data.due_date,
            is_completed: false,
            created_at: Utc::now(),
        };
        tables.tasks.insert(task.id, task.clone());

        Ok(task)
    }

    async fn find_task(&self, id: i64, user_id: Uuid) -> StoreResult<Option<Task>> {
        Ok(self.tables.read().await.owned_task(id, user_id).cloned())
    }

    async fn list_tasks(&self, user_id: Uuid, query: &TaskQuery) -> StoreResult<Vec<Task>> {
        let tables = self.tables.read().await;
        Ok(tables
            .tasks
            .values()
            .filter(|task| task.user_id == user_id && query.matches(task))
            .cloned()
            .collect())
    }

    async fn update_task(
        &self,
        id: i64,
        user_id: Uuid,
        data: &TaskChanges,
    ) -> StoreResult<Option<TaskUpdate>> {
        let mut tables = self.tables.write().await;
        let Some(task) = tables
            .tasks
            .get_mut(&id)
            .filter(|task| task.user_id == user_id)
        else {
            return Ok(None);
        };

        let was_completed = task.is_completed;
        task.title = data.title.clone();
        task.description = data.description.clone();
        task.due_date = data.due_date;
        task.is_completed = data.is_completed;

        Ok(Some(TaskUpdate {
            task: task.clone(),
            was_completed,
        }))
    }

    async fn delete_task(&self, id: i64, user_id: Uuid) -> StoreResult<bool> {
        let mut tables = self.tables.write().await;
        if tables.owned_task(id, user_id).is_none() {
            return Ok(false);
        }

        tables.tasks.remove(&id);
        tables.notes.retain(|_, note| note.task_id != id);

        Ok(true)
    }

    async fn task_exists(&self, id: i64, user_id: Uuid) -> StoreResult<bool> {
        Ok(self.tables.read().await.owned_task(id, user_id).is_some())
    }
}

#[async_trait]
impl NoteStore for MemoryStore {
    async fn insert_note(
        &self,
        task_id: i64,
        user_id: Uuid,
        data: &NoteFields,
    ) -> StoreResult<Option<Note>> {
        let mut tables = self.tables.write().await;
        if tables.owned_task(task_id, user_id).is_none() {
            return Ok(None);
        }

        tables.last_note_id += 1;
        let note = Note {
            id: tables.last_note_id,
            task_id,
            title: data.title.clone(),
            content: data.content.clone(),
            created_at: Utc::now(),
        };
        tables.notes.insert(note.id, note.clone());

        Ok(Some(note))
    }

    async fn list_notes(&self, task_id: i64, user_id: Uuid) -> StoreResult<Vec<Note>> {
        self.list_notes_for_tasks(&[task_id], user_id).await
    }

    async fn list_notes_for_tasks(
        &self,
        task_ids: &[i64],
        user_id: Uuid,
    ) -> StoreResult<Vec<Note>> {
        let tables = self.tables.read().await;
        Ok(tables
            .notes
            .values()
            .filter(|note| task_ids.contains(&note.task_id) && tables.owns_note(note, user_id))
            .cloned()
            .collect())
    }

    async fn find_note(&self, id: i64, user_id: Uuid) -> StoreResult<Option<Note>> {
        let tables = self.tables.read().await;
        Ok(tables
            .notes
            .get(&id)
            .filter(|note| tables.owns_note(note, user_id))
            .cloned())
    }

    async fn update_note(
        &self,
        id: i64,
        user_id: Uuid,
        data: &NoteFields,
    ) -> StoreResult<Option<Note>> {
        let mut tables = self.tables.write().await;
        let owned = tables
            .notes
            .get(&id)
            .is_some_and(|note| tables.owns_note(note, user_id));
        if !owned {
            return Ok(None);
        }

        let Some(note) = tables.notes.get_mut(&id) else {
            return Ok(None);
        };
        note.title = data.title.clone();
        note.content = data.content.clone();

        Ok(Some(note.clone()))
    }

    async fn delete_note(&self, id: i64, user_id: Uuid) -> StoreResult<bool> {
        let mut tables = self.tables.write().await;
        let owned = tables
            .notes
            .get(&id)
            .is_some_and(|note| tables.owns_note(note, user_id));
        if owned {
            tables.notes.remove(&id);
        }

        Ok(owned)
    }
}

#[async_trait]
impl Store for MemoryStore {
    fn backend(&self) -> &'static str {
        "memory"
    }

    async fn ping(&self) -> StoreResult<()> {
        Ok(())
    }
}
