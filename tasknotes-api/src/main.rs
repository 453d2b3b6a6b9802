//! # TaskNotes API Server
//!
//! Serves the task and note REST API plus the SSE notification stream.
//!
//! ## Usage
//!
//! ```bash
//! DATABASE_URL=postgresql://localhost/tasknotes JWT_SECRET=... cargo run -p tasknotes-api
//! STORE_BACKEND=memory JWT_SECRET=... cargo run -p tasknotes-api
//! ```

use std::sync::Arc;

use anyhow::Context;
use tasknotes_api::{
    app::{build_router, AppState},
    config::{Config, StoreBackend},
    notifications::ReminderJob,
};
use tasknotes_shared::{
    db::{
        migrations::{ensure_database_exists, run_migrations},
        pool::{create_pool, DatabaseConfig},
    },
    store::{MemoryStore, PgStore, Store},
};
use tokio_util::sync::CancellationToken;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

fn init_tracing() {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "tasknotes_api=debug,tower_http=debug".into());

    let json = std::env::var("LOG_FORMAT")
        .map(|format| format.eq_ignore_ascii_case("json"))
        .unwrap_or(false);

    let registry = tracing_subscriber::registry().with(filter);
    if json {
        registry.with(tracing_subscriber::fmt::layer().json()).init();
    } else {
        registry.with(tracing_subscriber::fmt::layer()).init();
    }
}

async fn open_store(config: &Config) -> anyhow::Result<Arc<dyn Store>> {
    match config.store.backend {
        StoreBackend::Memory => {
            tracing::warn!("Using in-memory store, data is lost on restart");
            Ok(Arc::new(MemoryStore::new()))
        }
        StoreBackend::Postgres => {
            let url = config
                .store
                .database_url
                .clone()
                .context("DATABASE_URL is required for the postgres backend")?;

            ensure_database_exists(&url)
                .await
                .context("Failed to create database")?;

            let pool = create_pool(DatabaseConfig {
                url,
                max_connections: config.store.max_connections,
                ..DatabaseConfig::default()
            })
            .await
            .context("Failed to connect to database")?;

            run_migrations(&pool)
                .await
                .context("Failed to run migrations")?;

            Ok(Arc::new(PgStore::new(pool)))
        }
    }
}

async fn shutdown_signal(shutdown: CancellationToken) {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "Failed to listen for shutdown signal");
    }
    tracing::info!("Shutdown signal received");
    shutdown.cancel();
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_tracing();

    tracing::info!(
        "TaskNotes API Server v{} starting...",
        env!("CARGO_PKG_VERSION")
    );

    let config = Config::from_env().context("Failed to load configuration")?;
    let store = open_store(&config).await?;
    tracing::info!(store = store.backend(), "Store ready");

    let bind_address = config.bind_address();
    let reminder_interval = config.notifications.reminder_interval();
    let state = AppState::new(store, config);

    let shutdown = state.shutdown.clone();
    let reminders = reminder_interval.map(|interval| {
        ReminderJob::new(state.hub.clone(), state.tasks.clone(), interval).spawn(shutdown.clone())
    });

    let app = build_router(state);
    let listener = tokio::net::TcpListener::bind(&bind_address)
        .await
        .with_context(|| format!("Failed to bind {}", bind_address))?;
    tracing::info!("Server listening on http://{}", bind_address);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal(shutdown.clone()))
        .await
        .context("Server error")?;

    shutdown.cancel();
    if let Some(handle) = reminders {
        if let Err(e) = handle.await {
            tracing::error!(error = %e, "Reminder job panicked");
        }
    }

    tracing::info!("Server stopped");
    Ok(())
}
