/// Periodic due-date reminders
///
/// Every interval, each user with an open notification stream receives a
/// digest of their upcoming and past-due task counts. Users with nothing
/// due are skipped. The job stops when its cancellation token fires.

use std::time::Duration;

use chrono::{NaiveDate, Utc};
use tasknotes_shared::service::TaskService;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info};

use super::hub::NotificationHub;

/// Reminder job configuration and dependencies
#[derive(Clone)]
pub struct ReminderJob {
    hub: NotificationHub,
    tasks: TaskService,
    interval: Duration,
}

fn plural(count: usize, word: &str) -> String {
    if count == 1 {
        format!("1 {}", word)
    } else {
        format!("{} {}s", count, word)
    }
}

/// Digest text, or None when there is nothing to remind about
pub fn digest_message(upcoming: usize, past_due: usize) -> Option<String> {
    match (upcoming, past_due) {
        (0, 0) => None,
        (upcoming, 0) => Some(format!("Reminder: {} due next week.", plural(upcoming, "task"))),
        (0, past_due) => Some(format!(
            "Reminder: {} from last week still open.",
            plural(past_due, "past-due task")
        )),
        (upcoming, past_due) => Some(format!(
            "Reminder: {} due next week and {} from last week still open.",
            plural(upcoming, "task"),
            plural(past_due, "past-due task")
        )),
    }
}

impl ReminderJob {
    pub fn new(hub: NotificationHub, tasks: TaskService, interval: Duration) -> Self {
        Self {
            hub,
            tasks,
            interval,
        }
    }

    /// Runs the job on the tokio runtime until `shutdown` is cancelled
    pub fn spawn(self, shutdown: CancellationToken) -> JoinHandle<()> {
        tokio::spawn(async move { self.run(shutdown).await })
    }

    async fn run(self, shutdown: CancellationToken) {
        info!(interval_secs = self.interval.as_secs(), "Reminder job starting");

        let mut ticker = tokio::time::interval(self.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
        // first tick completes immediately
        ticker.tick().await;

        loop {
            tokio::select! {
                _ = shutdown.cancelled() => {
                    info!("Reminder job shut down");
                    break;
                }
                _ = ticker.tick() => {
                    let sent = self.send_digests(Utc::now().date_naive()).await;
                    debug!(sent, "Reminder digests sent");
                }
            }
        }
    }

    /// Sends one digest to every connected user; returns how many were sent
    pub async fn send_digests(&self, today: NaiveDate) -> usize {
        let mut sent = 0;

        for user_id in self.hub.connected_users() {
            let counts = async {
                let upcoming = self.tasks.upcoming(user_id, today).await?.len();
                let past_due = self.tasks.past_due(user_id, today).await?.len();
                Ok::<_, tasknotes_shared::service::ServiceError>((upcoming, past_due))
            };

            match counts.await {
                Ok((upcoming, past_due)) => {
                    if let Some(message) = digest_message(upcoming, past_due) {
                        self.hub.send_to_user(user_id, message);
                        sent += 1;
                    }
                }
                Err(e) => error!(user_id = %user_id, error = %e, "Failed to build reminder"),
            }
        }

        sent
    }
}
