/// Task query and filter layer
///
/// [`TaskQuery`] describes a conjunction of optional predicates over a user's
/// tasks. The same predicate is rendered two ways: as SQL (for the PostgreSQL
/// store) and as an in-memory check (for the memory store and for tests), and
/// the two must agree.
///
/// # Matching rules
///
/// - `title`: case-insensitive substring match. Empty or whitespace-only
///   values impose no constraint.
/// - `is_completed`: exact match.
/// - `from` / `to`: inclusive due-date bounds. Tasks without a due date never
///   match a bounded query.
/// - `due_before`: exclusive upper bound, used by the week views.
///
/// # Week views
///
/// Weeks start on **Sunday** and are computed on the **UTC** calendar. The
/// "upcoming" view covers the whole of next week and the "past-due" view the
/// whole of last week; both exclude completed tasks.
///
/// # Example
///
/// ```
/// use chrono::NaiveDate;
/// use tasknotes_shared::query::{start_of_week, TaskQuery, WeekWindow};
///
/// // 2025-01-08 is a Wednesday
/// let today = NaiveDate::from_ymd_opt(2025, 1, 8).unwrap();
/// assert_eq!(start_of_week(today), NaiveDate::from_ymd_opt(2025, 1, 5).unwrap());
///
/// let next = WeekWindow::next_week(today);
/// assert_eq!(next.start.date_naive(), NaiveDate::from_ymd_opt(2025, 1, 12).unwrap());
///
/// let upcoming = TaskQuery::upcoming(today);
/// assert_eq!(upcoming.is_completed, Some(false));
/// ```

use chrono::{DateTime, Datelike, Duration, NaiveDate, NaiveTime, TimeZone, Utc};
use sqlx::{Postgres, QueryBuilder};

use crate::models::task::Task;

/// Filter over a single user's tasks. All predicates are ANDed.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TaskQuery {
    /// Title substring (case-insensitive)
    pub title: Option<String>,

    /// Completion state
    pub is_completed: Option<bool>,

    /// Inclusive lower bound on due date
    pub from: Option<DateTime<Utc>>,

    /// Inclusive upper bound on due date
    pub to: Option<DateTime<Utc>>,

    /// Exclusive upper bound on due date
    pub due_before: Option<DateTime<Utc>>,
}

impl TaskQuery {
    /// Tasks due next week that are still open
    pub fn upcoming(today: NaiveDate) -> Self {
        Self::open_within(WeekWindow::next_week(today))
    }

    /// Tasks that were due last week and are still open
    pub fn past_due(today: NaiveDate) -> Self {
        Self::open_within(WeekWindow::previous_week(today))
    }

    fn open_within(window: WeekWindow) -> Self {
        Self {
            is_completed: Some(false),
            from: Some(window.start),
            due_before: Some(window.end),
            ..Default::default()
        }
    }

    /// Returns the title needle if it constrains anything
    pub fn title_needle(&self) -> Option<&str> {
        self.title.as_deref().filter(|t| !t.trim().is_empty())
    }

    fn bounds_due_date(&self) -> bool {
        self.from.is_some() || self.to.is_some() || self.due_before.is_some()
    }

    /// Checks a task against every supplied predicate
    ///
    /// Ownership is not part of the query; callers only pass tasks that
    /// already belong to the requesting user.
    pub fn matches(&self, task: &Task) -> bool {
        if let Some(needle) = self.title_needle() {
            if !task.title.to_lowercase().contains(&needle.to_lowercase()) {
                return false;
            }
        }

        if let Some(completed) = self.is_completed {
            if task.is_completed != completed {
                return false;
            }
        }

        if self.bounds_due_date() {
            let Some(due) = task.due_date else {
                return false;
            };
            if self.from.is_some_and(|from| due < from) {
                return false;
            }
            if self.to.is_some_and(|to| due > to) {
                return false;
            }
            if self.due_before.is_some_and(|end| due >= end) {
                return false;
            }
        }

        true
    }

    /// Appends ` AND <predicate>` clauses for every supplied predicate
    ///
    /// The builder must already contain a `WHERE` clause over the `tasks`
    /// table.
    pub fn push_predicates(&self, builder: &mut QueryBuilder<'_, Postgres>) {
        if let Some(needle) = self.title_needle() {
            builder
                .push(" AND strpos(lower(title), lower(")
                .push_bind(needle.to_string())
                .push(")) > 0");
        }

        if let Some(completed) = self.is_completed {
            builder.push(" AND is_completed = ").push_bind(completed);
        }

        if let Some(from) = self.from {
            builder.push(" AND due_date >= ").push_bind(from);
        }

        if let Some(to) = self.to {
            builder.push(" AND due_date <= ").push_bind(to);
        }

        if let Some(end) = self.due_before {
            builder.push(" AND due_date < ").push_bind(end);
        }
    }
}

/// Returns the Sunday on or before `date`
pub fn start_of_week(date: NaiveDate) -> NaiveDate {
    date - Duration::days(i64::from(date.weekday().num_days_from_sunday()))
}

/// Half-open UTC interval `[start, end)` spanning one Sunday-based week
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WeekWindow {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

impl WeekWindow {
    /// The week containing `date`
    pub fn containing(date: NaiveDate) -> Self {
        let first_day = start_of_week(date);
        Self {
            start: midnight_utc(first_day),
            end: midnight_utc(first_day + Duration::days(7)),
        }
    }

    /// The week after the one containing `today`
    pub fn next_week(today: NaiveDate) -> Self {
        Self::containing(today + Duration::days(7))
    }

    /// The week before the one containing `today`
    pub fn previous_week(today: NaiveDate) -> Self {
        Self::containing(today - Duration::days(7))
    }

    pub fn contains(&self, instant: DateTime<Utc>) -> bool {
        self.start <= instant && instant < self.end
    }
}

fn midnight_utc(date: NaiveDate) -> DateTime<Utc> {
    Utc.from_utc_datetime(&date.and_time(NaiveTime::MIN))
}

#[cfg(test)]
mod tests {
    use super::*;
    use uuid::Uuid;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn at(y: i32, m: u32, d: u32, h: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(y, m, d, h, 0, 0).unwrap()
    }

    fn task(title: &str, due: Option<DateTime<Utc>>, completed: bool) -> Task {
        Task {
            id: 1,
            user_id: Uuid::new_v4(),
            title: title.to_string(),
            description: None,
            due_date: due,
            is_completed: completed,
            created_at: Utc::now(),
        }
    }

    #[test]
    fn test_start_of_week_is_sunday() {
        // Sunday maps to itself
        assert_eq!(start_of_week(date(2025, 1, 5)), date(2025, 1, 5));
        // Saturday maps to the previous Sunday
        assert_eq!(start_of_week(date(2025, 1, 11)), date(2025, 1, 5));
        // Crosses a year boundary
        assert_eq!(start_of_week(date(2025, 1, 1)), date(2024, 12, 29));
    }

    #[test]
    fn test_week_windows() {
        let today = date(2025, 1, 8);

        let next = WeekWindow::next_week(today);
        assert_eq!(next.start, at(2025, 1, 12, 0));
        assert_eq!(next.end, at(2025, 1, 19, 0));

        let previous = WeekWindow::previous_week(today);
        assert_eq!(previous.start, at(2024, 12, 29, 0));
        assert_eq!(previous.end, at(2025, 1, 5, 0));
    }

    #[test]
    fn test_window_includes_late_last_day() {
        let next = WeekWindow::next_week(date(2025, 1, 8));
        assert!(next.contains(at(2025, 1, 18, 23)));
        assert!(!next.contains(at(2025, 1, 19, 0)));
        assert!(next.contains(at(2025, 1, 12, 0)));
    }

    #[test]
    fn test_empty_query_matches_everything() {
        let query = TaskQuery::default();
        assert!(query.matches(&task("anything", None, false)));
        assert!(query.matches(&task("done", Some(Utc::now()), true)));
    }

    #[test]
    fn test_title_match_is_case_insensitive() {
        let query = TaskQuery {
            title: Some("RENT".to_string()),
            ..Default::default()
        };
        assert!(query.matches(&task("Pay rent", None, false)));
        assert!(!query.matches(&task("Buy milk", None, false)));
    }

    #[test]
    fn test_blank_title_is_ignored() {
        let query = TaskQuery {
            title: Some("   ".to_string()),
            ..Default::default()
        };
        assert!(query.title_needle().is_none());
        assert!(query.matches(&task("Pay rent", None, false)));
    }

    #[test]
    fn test_bounds_are_inclusive_and_exclude_undated() {
        let due = at(2025, 3, 1, 12);
        let query = TaskQuery {
            from: Some(due),
            to: Some(due),
            ..Default::default()
        };
        assert!(query.matches(&task("edge", Some(due), false)));
        assert!(!query.matches(&task("undated", None, false)));
        assert!(!query.matches(&task("later", Some(due + Duration::seconds(1)), false)));
    }

    #[test]
    fn test_week_views_exclude_completed() {
        let today = date(2025, 1, 8);
        let due_next_week = at(2025, 1, 14, 9);
        let due_last_week = at(2025, 1, 1, 9);

        let upcoming = TaskQuery::upcoming(today);
        assert!(upcoming.matches(&task("open", Some(due_next_week), false)));
        assert!(!upcoming.matches(&task("done", Some(due_next_week), true)));
        assert!(!upcoming.matches(&task("this week", Some(at(2025, 1, 9, 9)), false)));

        let past_due = TaskQuery::past_due(today);
        assert!(past_due.matches(&task("open", Some(due_last_week), false)));
        assert!(!past_due.matches(&task("done", Some(due_last_week), true)));
        assert!(!past_due.matches(&task("this week", Some(at(2025, 1, 6, 9)), false)));
    }

    #[test]
    fn test_push_predicates_renders_all_clauses() {
        let query = TaskQuery {
            title: Some("rent".to_string()),
            is_completed: Some(false),
            from: Some(at(2025, 1, 1, 0)),
            to: Some(at(2025, 2, 1, 0)),
            due_before: Some(at(2025, 3, 1, 0)),
        };

        let mut builder = QueryBuilder::<Postgres>::new("SELECT id FROM tasks WHERE user_id = ");
        builder.push_bind(Uuid::new_v4());
        query.push_predicates(&mut builder);

        assert_eq!(
            builder.sql(),
            "SELECT id FROM tasks WHERE user_id = $1 \
             AND strpos(lower(title), lower($2)) > 0 \
             AND is_completed = $3 \
             AND due_date >= $4 \
             AND due_date <= $5 \
             AND due_date < $6"
        );
    }
}
