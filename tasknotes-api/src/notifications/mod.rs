/// Real-time notifications
///
/// - `hub`: broadcast hub with per-user audiences
/// - `reminders`: periodic digest of upcoming and past-due tasks
///
/// Clients connect through `GET /api/notifications` (see
/// [`crate::routes::notifications`]).

pub mod hub;
pub mod reminders;

pub use hub::{Audience, Notification, NotificationHub, Subscription};
pub use reminders::ReminderJob;
