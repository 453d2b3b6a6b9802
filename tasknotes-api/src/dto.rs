/// Request and response bodies
///
/// JSON field names are camelCase. Date fields accept RFC 3339 timestamps,
/// naive `YYYY-MM-DDTHH:MM[:SS]` timestamps (taken as UTC) and plain dates
/// (midnight UTC); an empty string counts as absent. Clients should still send
/// a positive offset in a query string as `%2B`.

use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use serde::{de, Deserialize, Deserializer, Serialize};
use std::str::FromStr;
use tasknotes_shared::{
    models::{
        note::{Note, NoteFields},
        task::{NewTask, TaskChanges},
    },
    query::TaskQuery,
    service::{Session, TaskWithNotes},
};

/// Parses the date formats accepted by the API
///
/// An unescaped `+HH:MM` offset in a query string decodes to ` HH:MM`; that
/// form is read as a positive offset.
pub fn parse_datetime(raw: &str) -> Option<DateTime<Utc>> {
    let raw = raw.trim();

    if let Ok(parsed) = DateTime::parse_from_rfc3339(raw) {
        return Some(parsed.with_timezone(&Utc));
    }

    if let Some((timestamp, offset)) = raw.rsplit_once(' ').filter(|(head, _)| head.contains('T')) {
        if let Ok(parsed) = DateTime::parse_from_rfc3339(&format!("{}+{}", timestamp, offset)) {
            return Some(parsed.with_timezone(&Utc));
        }
    }

    for format in ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%dT%H:%M", "%Y-%m-%d %H:%M:%S"] {
        if let Ok(naive) = NaiveDateTime::parse_from_str(raw, format) {
            return Some(naive.and_utc());
        }
    }

    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .ok()
        .and_then(|date| date.and_hms_opt(0, 0, 0))
        .map(|naive| naive.and_utc())
}

fn optional_datetime<'de, D>(deserializer: D) -> Result<Option<DateTime<Utc>>, D::Error>
where
    D: Deserializer<'de>,
{
    match Option::<String>::deserialize(deserializer)? {
        Some(raw) if !raw.trim().is_empty() => parse_datetime(&raw)
            .map(Some)
            .ok_or_else(|| de::Error::custom(format!("invalid date '{}'", raw))),
        _ => Ok(None),
    }
}

fn optional_from_str<'de, D, T>(deserializer: D) -> Result<Option<T>, D::Error>
where
    D: Deserializer<'de>,
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match Option::<String>::deserialize(deserializer)? {
        Some(raw) if !raw.trim().is_empty() => raw
            .trim()
            .to_ascii_lowercase()
            .parse::<T>()
            .map(Some)
            .map_err(de::Error::custom),
        _ => Ok(None),
    }
}

fn blank_as_none(value: Option<String>) -> Option<String> {
    value.filter(|text| !text.trim().is_empty())
}

/// `GET /api/task` query string
#[derive(Debug, Default, Deserialize)]
pub struct TaskFilterParams {
    #[serde(rename = "Title", alias = "title", default)]
    pub title: Option<String>,

    #[serde(
        rename = "IsCompleted",
        alias = "isCompleted",
        alias = "iscompleted",
        alias = "is_completed",
        default,
        deserialize_with = "optional_from_str"
    )]
    pub is_completed: Option<bool>,

    #[serde(rename = "From", alias = "from", default, deserialize_with = "optional_datetime")]
    pub from: Option<DateTime<Utc>>,

    #[serde(rename = "To", alias = "to", default, deserialize_with = "optional_datetime")]
    pub to: Option<DateTime<Utc>>,
}

impl From<TaskFilterParams> for TaskQuery {
    fn from(params: TaskFilterParams) -> Self {
        TaskQuery {
            title: params.title,
            is_completed: params.is_completed,
            from: params.from,
            to: params.to,
            due_before: None,
        }
    }
}

/// `POST /api/task` body
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateTaskRequest {
    #[serde(default)]
    pub title: String,

    #[serde(default)]
    pub description: Option<String>,

    #[serde(default, deserialize_with = "optional_datetime")]
    pub due_date: Option<DateTime<Utc>>,
}

impl From<CreateTaskRequest> for NewTask {
    fn from(req: CreateTaskRequest) -> Self {
        NewTask {
            title: req.title.trim().to_string(),
            description: blank_as_none(req.description),
            due_date: req.due_date,
        }
    }
}

/// `PUT /api/task/{id}` body; every field is replaced
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateTaskRequest {
    #[serde(default)]
    pub title: String,

    #[serde(default)]
    pub description: Option<String>,

    #[serde(default, deserialize_with = "optional_datetime")]
    pub due_date: Option<DateTime<Utc>>,

    #[serde(default)]
    pub is_completed: bool,
}

impl From<UpdateTaskRequest> for TaskChanges {
    fn from(req: UpdateTaskRequest) -> Self {
        TaskChanges {
            title: req.title.trim().to_string(),
            description: blank_as_none(req.description),
            due_date: req.due_date,
            is_completed: req.is_completed,
        }
    }
}

/// Note create/update body
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NoteRequest {
    #[serde(default)]
    pub title: Option<String>,

    #[serde(default)]
    pub content: Option<String>,
}

impl From<NoteRequest> for NoteFields {
    fn from(req: NoteRequest) -> Self {
        NoteFields {
            title: req.title,
            content: req.content,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NoteResponse {
    pub id: i64,
    pub task_id: i64,
    pub title: Option<String>,
    pub content: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl From<Note> for NoteResponse {
    fn from(note: Note) -> Self {
        NoteResponse {
            id: note.id,
            task_id: note.task_id,
            title: note.title,
            content: note.content,
            created_at: note.created_at,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskResponse {
    pub id: i64,
    pub title: String,
    pub description: Option<String>,
    pub due_date: Option<DateTime<Utc>>,
    pub is_completed: bool,
    pub created_at: DateTime<Utc>,
    pub notes: Vec<NoteResponse>,
}

impl From<TaskWithNotes> for TaskResponse {
    fn from(TaskWithNotes { task, notes }: TaskWithNotes) -> Self {
        TaskResponse {
            id: task.id,
            title: task.title,
            description: task.description,
            due_date: task.due_date,
            is_completed: task.is_completed,
            created_at: task.created_at,
            notes: notes.into_iter().map(NoteResponse::from).collect(),
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RefreshRequest {
    #[serde(default)]
    pub refresh_token: String,
}

/// Returned by register and login
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AccountResponse {
    pub username: String,
    pub email: String,

    /// Access token
    pub token: String,

    pub refresh_token: String,
}

impl From<Session> for AccountResponse {
    fn from(session: Session) -> Self {
        AccountResponse {
            username: session.user.username,
            email: session.user.email,
            token: session.access_token,
            refresh_token: session.refresh_token,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TokenResponse {
    pub token: String,
}
