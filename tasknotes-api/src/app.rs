/// Application state and router builder
///
/// This module defines the shared application state and provides
/// a function to build the Axum router with all routes and middleware.
///
/// # Example
///
/// ```no_run
/// use std::sync::Arc;
/// use tasknotes_api::{app::{build_router, AppState}, config::Config};
/// use tasknotes_shared::store::MemoryStore;
///
/// # async fn example() -> anyhow::Result<()> {
/// let config = Config::from_env()?;
/// let state = AppState::new(Arc::new(MemoryStore::new()), config);
/// let app = build_router(state);
/// # Ok(())
/// # }
/// ```

use crate::{
    config::Config, error::ApiError, middleware::security::SecurityHeadersLayer,
    notifications::NotificationHub,
};
use axum::{
    extract::{Request, State},
    http::{header, HeaderValue, Method},
    middleware::Next,
    response::Response,
    routing::{get, post},
    Router,
};
use std::sync::Arc;
use tasknotes_shared::{
    auth::middleware::{authenticate, authenticate_stream},
    service::{AccountService, NoteService, TaskService},
    store::Store,
};
use tokio_util::sync::CancellationToken;
use tower_http::{
    cors::CorsLayer,
    trace::{DefaultOnResponse, TraceLayer},
};
use tracing::{Level, Span};

/// Shared application state
///
/// Cloned for each request handler via Axum's `State` extractor; every
/// field is reference-counted.
#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn Store>,
    pub tasks: TaskService,
    pub notes: NoteService,
    pub accounts: AccountService,
    pub hub: NotificationHub,
    pub config: Arc<Config>,

    /// Cancelled on server shutdown; ends open notification streams
    pub shutdown: CancellationToken,
}

impl AppState {
    /// Creates the services and notification hub over `store`
    pub fn new(store: Arc<dyn Store>, config: Config) -> Self {
        let hub = NotificationHub::new(config.notifications.capacity);

        Self {
            tasks: TaskService::new(store.clone()),
            notes: NoteService::new(store.clone()),
            accounts: AccountService::new(store.clone(), config.jwt.secret.as_str()),
            hub,
            store,
            config: Arc::new(config),
            shutdown: CancellationToken::new(),
        }
    }

    pub fn jwt_secret(&self) -> &str {
        &self.config.jwt.secret
    }
}

/// Builds the complete Axum router with all routes and middleware
///
/// ```text
/// /
/// ├── GET  /health
/// └── /api/
///     ├── /account/                      (public)
///     │   ├── POST /register
///     │   ├── POST /login
///     │   └── POST /refresh
///     ├── /task/                         (authenticated)
///     │   ├── GET, POST  /
///     │   ├── GET        /upcoming
///     │   ├── GET        /past-due
///     │   └── GET, PUT, DELETE /:id
///     ├── /note/                         (authenticated)
///     │   ├── GET        /task/:task_id/notes
///     │   ├── POST       /task/:task_id
///     │   └── GET, PUT, DELETE /:id
///     └── GET /notifications             (authenticated, SSE)
/// ```
pub fn build_router(state: AppState) -> Router {
    use crate::routes;

    let health_routes = Router::new().route("/health", get(routes::health::health_check));

    let account_routes = Router::new()
        .route("/register", post(routes::account::register))
        .route("/login", post(routes::account::login))
        .route("/refresh", post(routes::account::refresh));

    let task_routes = Router::new()
        .route(
            "/",
            get(routes::tasks::list_tasks).post(routes::tasks::create_task),
        )
        .route("/upcoming", get(routes::tasks::upcoming_tasks))
        .route("/past-due", get(routes::tasks::past_due_tasks))
        .route(
            "/:id",
            get(routes::tasks::get_task)
                .put(routes::tasks::update_task)
                .delete(routes::tasks::delete_task),
        );

    let note_routes = Router::new()
        .route("/task/:task_id/notes", get(routes::notes::list_notes))
        .route("/task/:task_id", post(routes::notes::create_note))
        .route(
            "/:id",
            get(routes::notes::get_note)
                .put(routes::notes::update_note)
                .delete(routes::notes::delete_note),
        );

    let protected_routes = Router::new()
        .nest("/task", task_routes)
        .nest("/note", note_routes)
        .layer(axum::middleware::from_fn_with_state(
            state.clone(),
            jwt_auth_layer,
        ));

    let stream_routes = Router::new()
        .route("/notifications", get(routes::notifications::stream))
        .layer(axum::middleware::from_fn_with_state(
            state.clone(),
            stream_auth_layer,
        ));

    let api_routes = Router::new()
        .nest("/account", account_routes)
        .merge(protected_routes)
        .merge(stream_routes);

    let cors = if state.config.api.cors_origins.iter().any(|origin| origin == "*") {
        CorsLayer::permissive()
    } else {
        let origins: Vec<HeaderValue> = state
            .config
            .api
            .cors_origins
            .iter()
            .filter_map(|origin| origin.parse().ok())
            .collect();

        CorsLayer::new()
            .allow_origin(origins)
            .allow_methods([
                Method::GET,
                Method::POST,
                Method::PUT,
                Method::DELETE,
                Method::OPTIONS,
            ])
            .allow_headers([header::AUTHORIZATION, header::CONTENT_TYPE])
            .allow_credentials(true)
            .max_age(std::time::Duration::from_secs(3600))
    };

    Router::new()
        .merge(health_routes)
        .nest("/api", api_routes)
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(request_span)
                .on_response(DefaultOnResponse::new().level(Level::INFO)),
        )
        .layer(cors)
        .layer(SecurityHeadersLayer::new(state.config.api.production))
        .with_state(state)
}

/// Request span with the path only; the query string may carry a token
fn request_span(req: &Request) -> Span {
    tracing::info_span!(
        "request",
        method = %req.method(),
        path = %req.uri().path(),
        version = ?req.version(),
    )
}

/// JWT authentication middleware layer
///
/// Validates the `Authorization: Bearer` token and injects an `AuthContext`
/// into request extensions.
async fn jwt_auth_layer(
    State(state): State<AppState>,
    mut req: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let auth = authenticate(req.headers(), state.jwt_secret())?;

    req.extensions_mut().insert(auth);

    Ok(next.run(req).await)
}

/// Authentication for the notification stream
///
/// EventSource clients cannot set headers, so the `access_token` query
/// parameter is accepted here as well.
async fn stream_auth_layer(
    State(state): State<AppState>,
    mut req: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let auth = authenticate_stream(req.headers(), req.uri(), state.jwt_secret())?;

    req.extensions_mut().insert(auth);

    Ok(next.run(req).await)
}
