/// Server-sent notification stream
///
/// ```text
/// GET /api/notifications
/// Accept: text/event-stream
/// Authorization: Bearer <token>        (or ?access_token=<token>)
/// ```
///
/// Each notification arrives as an event named `message` whose data is the
/// free-text message. A keep-alive comment goes out every 15 seconds. The
/// stream ends when the server shuts down. The connection counts toward [`NotificationHub::connected_users`] until the
/// client goes away.
///
/// [`NotificationHub::connected_users`]: crate::notifications::NotificationHub::connected_users

use crate::app::AppState;
use axum::{
    extract::State,
    response::sse::{Event, KeepAlive, Sse},
};
use futures::{Stream, StreamExt};
use std::{convert::Infallible, time::Duration};
use tasknotes_shared::auth::middleware::AuthContext;
use tracing::info;

pub const KEEP_ALIVE_INTERVAL: Duration = Duration::from_secs(15);

pub async fn stream(
    State(state): State<AppState>,
    auth: AuthContext,
) -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    info!(user_id = %auth.user_id, "Notification stream opened");

    let events = state
        .hub
        .subscribe(auth.user_id)
        .take_until(state.shutdown.clone().cancelled_owned())
        .map(|notification| {
            Ok::<_, Infallible>(Event::default().event("message").data(&notification.message))
        });

    Sse::new(events).keep_alive(KeepAlive::new().interval(KEEP_ALIVE_INTERVAL))
}
