/// In-process notification hub
///
/// Wraps a `tokio::sync::broadcast` channel. Every message carries an
/// [`Audience`]; a [`Subscription`] only yields messages addressed to
/// everyone or to its own user. Delivery is fire-and-forget: nothing is
/// persisted, a subscriber that falls more than `capacity` messages behind
/// skips the ones it missed, and sending with nobody listening is not an
/// error.
///
/// Messages are single-line: line breaks are folded into spaces on send, since
/// an SSE data field cannot carry a carriage return.
///
/// The hub also counts open subscriptions per user so the reminder job knows
/// who is online.

use std::collections::HashMap;
use std::pin::Pin;
use std::sync::{Arc, Mutex, MutexGuard};
use std::task::{ready, Context, Poll};

use chrono::{DateTime, Utc};
use futures::Stream;
use tokio::sync::broadcast;
use tokio_stream::wrappers::{errors::BroadcastStreamRecvError, BroadcastStream};
use tracing::{debug, warn};
use uuid::Uuid;

/// Who a notification is for
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Audience {
    All,
    User(Uuid),
}

/// A free-text message pushed to connected clients
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notification {
    pub audience: Audience,
    pub message: String,
    pub sent_at: DateTime<Utc>,
}

impl Notification {
    pub fn is_for(&self, user_id: Uuid) -> bool {
        match self.audience {
            Audience::All => true,
            Audience::User(target) => target == user_id,
        }
    }
}

type Registry = Arc<Mutex<HashMap<Uuid, usize>>>;

fn lock(registry: &Registry) -> MutexGuard<'_, HashMap<Uuid, usize>> {
    registry.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

fn single_line(message: &str) -> String {
    message
        .split(['\r', '\n'])
        .filter(|part| !part.is_empty())
        .collect::<Vec<_>>()
        .join(" ")
}

/// Cheap-to-clone handle to the hub
#[derive(Debug, Clone)]
pub struct NotificationHub {
    sender: broadcast::Sender<Arc<Notification>>,
    connected: Registry,
}

impl NotificationHub {
    /// Creates a hub buffering up to `capacity` messages per subscriber
    ///
    /// `capacity` must be non-zero.
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity.max(1));
        Self {
            sender,
            connected: Registry::default(),
        }
    }

    /// Sends to every connected client; returns how many subscriptions got it
    pub fn broadcast(&self, message: impl Into<String>) -> usize {
        self.send(Audience::All, message.into())
    }

    /// Sends to every connection of one user
    pub fn send_to_user(&self, user_id: Uuid, message: impl Into<String>) -> usize {
        self.send(Audience::User(user_id), message.into())
    }

    fn send(&self, audience: Audience, message: String) -> usize {
        let notification = Arc::new(Notification {
            audience,
            message: single_line(&message),
            sent_at: Utc::now(),
        });

        match self.sender.send(notification) {
            Ok(receivers) => {
                debug!(?audience, receivers, "Notification sent");
                receivers
            }
            Err(_) => {
                debug!(?audience, "Notification dropped, no subscribers");
                0
            }
        }
    }

    /// Opens a subscription for `user_id`
    ///
    /// The user counts as connected until the subscription is dropped.
    pub fn subscribe(&self, user_id: Uuid) -> Subscription {
        *lock(&self.connected).entry(user_id).or_insert(0) += 1;

        Subscription {
            inner: BroadcastStream::new(self.sender.subscribe()),
            user_id,
            registry: self.connected.clone(),
        }
    }

    /// Users holding at least one open subscription
    pub fn connected_users(&self) -> Vec<Uuid> {
        let mut users: Vec<Uuid> = lock(&self.connected).keys().copied().collect();
        users.sort();
        users
    }

    pub fn is_connected(&self, user_id: Uuid) -> bool {
        lock(&self.connected).contains_key(&user_id)
    }

    /// Number of open subscriptions across all users
    pub fn subscriber_count(&self) -> usize {
        self.sender.receiver_count()
    }
}

/// Stream of notifications addressed to one user
pub struct Subscription {
    inner: BroadcastStream<Arc<Notification>>,
    user_id: Uuid,
    registry: Registry,
}

impl Subscription {
    pub fn user_id(&self) -> Uuid {
        self.user_id
    }
}

impl Stream for Subscription {
    type Item = Arc<Notification>;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        let this = self.get_mut();
        loop {
            match ready!(Pin::new(&mut this.inner).poll_next(cx)) {
                Some(Ok(notification)) if notification.is_for(this.user_id) => {
                    return Poll::Ready(Some(notification));
                }
                Some(Ok(_)) => continue,
                Some(Err(BroadcastStreamRecvError::Lagged(missed))) => {
                    warn!(user_id = %this.user_id, missed, "Subscriber lagged, notifications skipped");
                    continue;
                }
                None => return Poll::Ready(None),
            }
        }
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        let mut connected = lock(&self.registry);
        if let Some(count) = connected.get_mut(&self.user_id) {
            *count -= 1;
            if *count == 0 {
                connected.remove(&self.user_id);
            }
        }
    }
}
