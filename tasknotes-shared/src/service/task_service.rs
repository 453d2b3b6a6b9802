/// Task use-cases
///
/// Every operation takes the caller's user ID; a task owned by another user
/// yields [`ServiceError::NotFound`] exactly like a missing one. Tasks are
/// returned together with their notes.

use std::collections::BTreeMap;
use std::sync::Arc;

use chrono::NaiveDate;
use tracing::{debug, info};
use uuid::Uuid;
use validator::Validate;

use super::{ServiceError, ServiceResult};
use crate::models::{
    note::Note,
    task::{NewTask, Task, TaskChanges},
};
use crate::query::TaskQuery;
use crate::store::Store;

/// A task and all of its notes, ordered by note ID
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaskWithNotes {
    pub task: Task,
    pub notes: Vec<Note>,
}

/// Outcome of an update
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UpdatedTask {
    pub task: TaskWithNotes,

    /// The update moved the task from open to completed
    pub newly_completed: bool,
}

/// Task service facade over a [`Store`]
#[derive(Clone)]
pub struct TaskService {
    store: Arc<dyn Store>,
}

impl TaskService {
    pub fn new(store: Arc<dyn Store>) -> Self {
        Self { store }
    }

    /// Creates an open task owned by `user_id`
    pub async fn create(&self, user_id: Uuid, data: NewTask) -> ServiceResult<Task> {
        data.validate()?;

        let task = self.store.insert_task(user_id, &data).await?;
        info!(task_id = task.id, user_id = %user_id, "Task created");

        Ok(task)
    }

    pub async fn get(&self, user_id: Uuid, id: i64) -> ServiceResult<TaskWithNotes> {
        let task = self
            .store
            .find_task(id, user_id)
            .await?
            .ok_or(ServiceError::NotFound("Task"))?;
        let notes = self.store.list_notes(task.id, user_id).await?;

        Ok(TaskWithNotes { task, notes })
    }

    /// Tasks matching every predicate of `query`, ordered by ID
    pub async fn list(&self, user_id: Uuid, query: &TaskQuery) -> ServiceResult<Vec<TaskWithNotes>> {
        let tasks = self.store.list_tasks(user_id, query).await?;
        debug!(user_id = %user_id, count = tasks.len(), "Listed tasks");

        self.attach_notes(user_id, tasks).await
    }

    /// Replaces every mutable field of the task
    pub async fn update(
        &self,
        user_id: Uuid,
        id: i64,
        data: TaskChanges,
    ) -> ServiceResult<UpdatedTask> {
        data.validate()?;

        let update = self
            .store
            .update_task(id, user_id, &data)
            .await?
            .ok_or(ServiceError::NotFound("Task"))?;
        let newly_completed = update.newly_completed();
        let task = update.task;
        let notes = self.store.list_notes(task.id, user_id).await?;
        info!(task_id = task.id, user_id = %user_id, "Task updated");

        Ok(UpdatedTask {
            newly_completed,
            task: TaskWithNotes { task, notes },
        })
    }

    /// Deletes the task and its notes
    ///
    /// A missing or foreign task is [`ServiceError::NotFound`].
    pub async fn delete(&self, user_id: Uuid, id: i64) -> ServiceResult<()> {
        if !self.store.delete_task(id, user_id).await? {
            return Err(ServiceError::NotFound("Task"));
        }

        info!(task_id = id, user_id = %user_id, "Task deleted");
        Ok(())
    }

    pub async fn exists(&self, user_id: Uuid, id: i64) -> ServiceResult<bool> {
        Ok(self.store.task_exists(id, user_id).await?)
    }

    /// Open tasks due in the week after the one containing `today`
    pub async fn upcoming(&self, user_id: Uuid, today: NaiveDate) -> ServiceResult<Vec<TaskWithNotes>> {
        self.list(user_id, &TaskQuery::upcoming(today)).await
    }

    /// Open tasks that were due in the week before the one containing `today`
    pub async fn past_due(&self, user_id: Uuid, today: NaiveDate) -> ServiceResult<Vec<TaskWithNotes>> {
        self.list(user_id, &TaskQuery::past_due(today)).await
    }

    async fn attach_notes(
        &self,
        user_id: Uuid,
        tasks: Vec<Task>,
    ) -> ServiceResult<Vec<TaskWithNotes>> {
        if tasks.is_empty() {
            return Ok(Vec::new());
        }

        let ids: Vec<i64> = tasks.iter().map(|task| task.id).collect();
        let mut by_task: BTreeMap<i64, Vec<Note>> = BTreeMap::new();
        for note in self.store.list_notes_for_tasks(&ids, user_id).await? {
            by_task.entry(note.task_id).or_default().push(note);
        }

        Ok(tasks
            .into_iter()
            .map(|task| {
                let notes = by_task.remove(&task.id).unwrap_or_default();
                TaskWithNotes { task, notes }
            })
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::note::NoteFields;
    use crate::store::{MemoryStore, NoteStore};
    use chrono::{DateTime, Duration, TimeZone, Utc};
    use rand::{rngs::StdRng, Rng, SeedableRng};

    fn service() -> (TaskService, MemoryStore) {
        let store = MemoryStore::new();
        (TaskService::new(Arc::new(store.clone())), store)
    }

    fn new_task(title: &str, due_date: Option<DateTime<Utc>>) -> NewTask {
        NewTask {
            title: title.to_string(),
            description: None,
            due_date,
        }
    }

    fn changes(task: &Task, is_completed: bool) -> TaskChanges {
        TaskChanges {
            title: task.title.clone(),
            description: task.description.clone(),
            due_date: task.due_date,
            is_completed,
        }
    }

    fn open(is_completed: bool) -> TaskQuery {
        TaskQuery {
            is_completed: Some(is_completed),
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn test_pay_rent_moves_between_completion_filters() {
        let (service, _) = service();
        let user = Uuid::new_v4();

        let task = service
            .create(user, new_task("Pay rent", Some(Utc::now() + Duration::days(3))))
            .await
            .unwrap();

        let listed = service.list(user, &open(false)).await.unwrap();
        assert_eq!(listed.len(), 1);
        assert_eq!(listed[0].task.title, "Pay rent");

        let updated = service
            .update(user, task.id, changes(&task, true))
            .await
            .unwrap();
        assert!(updated.newly_completed);

        assert!(service.list(user, &open(false)).await.unwrap().is_empty());
        let done = service.list(user, &open(true)).await.unwrap();
        assert_eq!(done.len(), 1);
        assert_eq!(done[0].task.id, task.id);
    }

    #[tokio::test]
    async fn test_update_of_completed_task_is_not_newly_completed() {
        let (service, _) = service();
        let user = Uuid::new_v4();
        let task = service.create(user, new_task("Done", None)).await.unwrap();

        service.update(user, task.id, changes(&task, true)).await.unwrap();
        let again = service.update(user, task.id, changes(&task, true)).await.unwrap();

        assert!(!again.newly_completed);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_completions_report_one_transition() {
        let (service, _) = service();
        let user = Uuid::new_v4();
        let task = service.create(user, new_task("Pay rent", None)).await.unwrap();

        let handles: Vec<_> = (0..16)
            .map(|_| {
                let service = service.clone();
                let (id, changes) = (task.id, changes(&task, true));
                tokio::spawn(async move { service.update(user, id, changes).await })
            })
            .collect();

        let mut transitions = 0;
        for handle in handles {
            if handle.await.unwrap().unwrap().newly_completed {
                transitions += 1;
            }
        }
        assert_eq!(transitions, 1);
    }

    #[tokio::test]
    async fn test_create_rejects_blank_title() {
        let (service, _) = service();

        let err = service
            .create(Uuid::new_v4(), new_task(" \t", None))
            .await
            .unwrap_err();

        let ServiceError::Validation(errors) = err else {
            panic!("expected validation error");
        };
        assert!(errors.contains_key("title"));
    }

    #[tokio::test]
    async fn test_update_replaces_all_fields() {
        let (service, _) = service();
        let user = Uuid::new_v4();
        let task = service
            .create(
                user,
                NewTask {
                    title: "Old".to_string(),
                    description: Some("details".to_string()),
                    due_date: Some(Utc::now()),
                },
            )
            .await
            .unwrap();

        let updated = service
            .update(
                user,
                task.id,
                TaskChanges {
                    title: "New".to_string(),
                    description: None,
                    due_date: None,
                    is_completed: false,
                },
            )
            .await
            .unwrap()
            .task
            .task;

        assert_eq!(updated.title, "New");
        assert_eq!(updated.description, None);
        assert_eq!(updated.due_date, None);
        assert_eq!(updated.created_at, task.created_at);
    }

    #[tokio::test]
    async fn test_tasks_are_isolated_between_users() {
        let (service, _) = service();
        let alice = Uuid::new_v4();
        let bob = Uuid::new_v4();
        let task = service.create(alice, new_task("Alice's", None)).await.unwrap();

        assert!(matches!(
            service.get(bob, task.id).await,
            Err(ServiceError::NotFound("Task"))
        ));
        assert!(matches!(
            service.update(bob, task.id, changes(&task, true)).await,
            Err(ServiceError::NotFound("Task"))
        ));
        assert!(matches!(
            service.delete(bob, task.id).await,
            Err(ServiceError::NotFound("Task"))
        ));
        assert!(!service.exists(bob, task.id).await.unwrap());
        assert!(service.list(bob, &TaskQuery::default()).await.unwrap().is_empty());

        let still_there = service.get(alice, task.id).await.unwrap();
        assert!(!still_there.task.is_completed);
    }

    #[tokio::test]
    async fn test_delete_removes_notes() {
        let (service, store) = service();
        let user = Uuid::new_v4();
        let task = service.create(user, new_task("With notes", None)).await.unwrap();
        store
            .insert_note(task.id, user, &NoteFields::default())
            .await
            .unwrap();

        service.delete(user, task.id).await.unwrap();

        assert_eq!(store.note_count().await, 0);
        assert!(matches!(
            service.delete(user, task.id).await,
            Err(ServiceError::NotFound("Task"))
        ));
    }

    #[tokio::test]
    async fn test_list_attaches_notes_to_their_task() {
        let (service, store) = service();
        let user = Uuid::new_v4();
        let first = service.create(user, new_task("First", None)).await.unwrap();
        let second = service.create(user, new_task("Second", None)).await.unwrap();
        let note = store
            .insert_note(
                second.id,
                user,
                &NoteFields {
                    title: Some("n".to_string()),
                    content: None,
                },
            )
            .await
            .unwrap()
            .unwrap();

        let listed = service.list(user, &TaskQuery::default()).await.unwrap();

        assert_eq!(listed.len(), 2);
        assert_eq!(listed[0].task.id, first.id);
        assert!(listed[0].notes.is_empty());
        assert_eq!(listed[1].notes, vec![note]);
    }

    #[tokio::test]
    async fn test_upcoming_and_past_due_windows() {
        let (service, _) = service();
        let user = Uuid::new_v4();
        // Wednesday; current week is Sun 2024-06-09 .. Sat 2024-06-15
        let today = NaiveDate::from_ymd_opt(2024, 6, 12).unwrap();
        let at = |y, m, d, h| Some(Utc.with_ymd_and_hms(y, m, d, h, 0, 0).unwrap());

        let next_sunday = service.create(user, new_task("next sun", at(2024, 6, 16, 0))).await.unwrap();
        let next_saturday = service.create(user, new_task("next sat", at(2024, 6, 22, 23))).await.unwrap();
        service.create(user, new_task("two weeks out", at(2024, 6, 23, 0))).await.unwrap();
        service.create(user, new_task("this week", at(2024, 6, 14, 9))).await.unwrap();
        let last_week = service.create(user, new_task("last week", at(2024, 6, 3, 9))).await.unwrap();
        service.create(user, new_task("two weeks ago", at(2024, 6, 1, 23))).await.unwrap();
        service.create(user, new_task("undated", None)).await.unwrap();

        let done = service.create(user, new_task("done next week", at(2024, 6, 18, 9))).await.unwrap();
        service.update(user, done.id, changes(&done, true)).await.unwrap();
        let done_late = service.create(user, new_task("done last week", at(2024, 6, 4, 9))).await.unwrap();
        service.update(user, done_late.id, changes(&done_late, true)).await.unwrap();

        let upcoming: Vec<i64> = service
            .upcoming(user, today)
            .await
            .unwrap()
            .iter()
            .map(|t| t.task.id)
            .collect();
        assert_eq!(upcoming, vec![next_sunday.id, next_saturday.id]);

        let past_due: Vec<i64> = service
            .past_due(user, today)
            .await
            .unwrap()
            .iter()
            .map(|t| t.task.id)
            .collect();
        assert_eq!(past_due, vec![last_week.id]);
    }

    const TITLES: [&str; 6] = [
        "Pay rent",
        "Buy milk",
        "Rent a car",
        "Call mom",
        "Renew passport",
        "Email Bob",
    ];
    const NEEDLES: [&str; 7] = ["rent", "RENT", "mil", "", "  ", "zzz", "o"];

    fn expected(
        query: &TaskQuery,
        title: &str,
        is_completed: bool,
        due: Option<DateTime<Utc>>,
    ) -> bool {
        let title_ok = match query.title.as_deref().map(str::trim) {
            None | Some("") => true,
            Some(needle) => title.to_lowercase().contains(&needle.to_lowercase()),
        };
        let completed_ok = query.is_completed.map_or(true, |c| c == is_completed);
        let due_ok = match (query.from, query.to, due) {
            (None, None, _) => true,
            (_, _, None) => false,
            (from, to, Some(due)) => {
                from.map_or(true, |f| due >= f) && to.map_or(true, |t| due <= t)
            }
        };
        title_ok && completed_ok && due_ok
    }

    #[tokio::test]
    async fn test_filter_returns_exactly_matching_subset() {
        let (service, _) = service();
        let mut rng = StdRng::seed_from_u64(0x7a5c);
        let base = Utc.with_ymd_and_hms(2024, 6, 12, 12, 0, 0).unwrap();
        let users = [Uuid::new_v4(), Uuid::new_v4()];

        let random_date = |rng: &mut StdRng| -> Option<DateTime<Utc>> {
            if rng.gen_bool(0.2) {
                None
            } else {
                Some(base + Duration::hours(rng.gen_range(-240..240)))
            }
        };

        let mut created = Vec::new();
        for _ in 0..60 {
            let owner = users[rng.gen_range(0..users.len())];
            let title = TITLES[rng.gen_range(0..TITLES.len())];
            let due = random_date(&mut rng);
            let task = service.create(owner, new_task(title, due)).await.unwrap();
            let is_completed = rng.gen_bool(0.4);
            if is_completed {
                service.update(owner, task.id, changes(&task, true)).await.unwrap();
            }
            created.push((task.id, owner, title, is_completed, due));
        }

        for _ in 0..200 {
            let user = users[rng.gen_range(0..users.len())];
            let query = TaskQuery {
                title: rng
                    .gen_bool(0.5)
                    .then(|| NEEDLES[rng.gen_range(0..NEEDLES.len())].to_string()),
                is_completed: rng.gen_bool(0.5).then(|| rng.gen_bool(0.5)),
                from: if rng.gen_bool(0.4) { random_date(&mut rng) } else { None },
                to: if rng.gen_bool(0.4) { random_date(&mut rng) } else { None },
                due_before: None,
            };

            let actual: Vec<i64> = service
                .list(user, &query)
                .await
                .unwrap()
                .iter()
                .map(|t| t.task.id)
                .collect();
            let wanted: Vec<i64> = created
                .iter()
                .filter(|(_, owner, title, done, due)| {
                    *owner == user && expected(&query, title, *done, *due)
                })
                .map(|(id, ..)| *id)
                .collect();

            assert_eq!(actual, wanted, "query {:?}", query);
        }
    }
}
