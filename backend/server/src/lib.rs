//! User record API.
//!
//! Small REST surface over a single relational `users` table, consumed by the
//! `records` client which discovers this server by probing `/health`.
//!
//!
//!
//! # Startup
//! - Load config from the environment, every option has a default
//! - Bind the listener on `PORT`, falling forward one port at a time while the port is taken
//! - Kick off the database bring-up in the background once bound
//! - Requests that need the database wait on that same bring-up instead of starting another
//! - `/health` never waits, it reports `database: "down"` until a pool exists
//!
//!
//!
//! # Shutdown
//! - Ctrl+C or SIGTERM stops accepting connections
//! - In-flight requests drain, then the pool is closed
//!
//!
//!
//! # Routes
//!
//! | Method | Path | Response |
//! |---|---|---|
//! | GET | `/health` | `{uptime, status, timestamp, database}` |
//! | GET | `/users` | all records |
//! | POST | `/users` | `{message, id}` or 400 `{message, errors}` |
//! | GET | `/users/:id` | one record or 404 |
//! | PUT | `/users/:id` | `{message}`, 400 or 404 |
//! | DELETE | `/users/:id` | `{message}` or 404 |
//! | GET | `/metrics` | `{users_total, timestamp}` |
//! | GET | `/debug/pingdb` | `{ok}` |
//!
//!
//!
//! # Setup
//!
//! Run against a local SQLite file.
//! ```sh
//! DATABASE_URL=sqlite://records.db?mode=rwc RUST_LOG=info cargo run --bin records-server
//! ```
//!
//! Run against MySQL.
//! ```sh
//! DB_HOST=127.0.0.1 DB_PORT=3306 DB_USER=root DB_NAME=webdb cargo run --bin records-server
//! ```
//!
//! Generate docs in `target/doc/server/index.html`.
//! ```sh
//! cargo doc
//! ```
use std::{future::pending, sync::Arc, time::Duration};

use axum::{
    Router,
    http::{Method, header::CONTENT_TYPE},
    routing::get,
};

use signal::{
    ctrl_c,
    unix::{SignalKind, signal},
};
use tokio::signal;
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};
use tracing::{error, info};
use tracing_subscriber::{EnvFilter, fmt};

pub mod config;
pub mod database;
pub mod error;
pub mod listener;
pub mod routes;
pub mod state;
pub mod users;

use config::Config;
use error::ServerError;
use listener::ListenerBringUp;
use routes::{
    create_user_handler, delete_user_handler, favicon_handler, get_user_handler, health_handler,
    list_users_handler, metrics_handler, ping_db_handler, root_handler, update_user_handler,
};
use state::AppState;

pub async fn start_server() -> Result<(), ServerError> {
    fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    info!("Loading config...");
    let config = Config::load()?;

    info!("Initializing state...");
    let state = AppState::new(config);

    let mut bring_up = ListenerBringUp::new(state.config.host.clone());
    let listener = bring_up
        .start(state.config.port, state.config.max_port_fallback)
        .await?;

    info!("DB config => {}", state.database.config().describe());
    spawn_database_bring_up(state.clone());

    info!("Starting server...");
    axum::serve(listener, app(state.clone()))
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    state.database.close().await;
    info!("Server shutting down...");

    Ok(())
}

pub fn app(state: Arc<AppState>) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PUT,
            Method::DELETE,
            Method::OPTIONS,
        ])
        .allow_headers([CONTENT_TYPE])
        .max_age(Duration::from_secs(60 * 60));

    Router::new()
        .route("/", get(root_handler))
        .route("/favicon.ico", get(favicon_handler))
        .route("/health", get(health_handler))
        .route("/users", get(list_users_handler).post(create_user_handler))
        .route(
            "/users/:id",
            get(get_user_handler)
                .put(update_user_handler)
                .delete(delete_user_handler),
        )
        .route("/metrics", get(metrics_handler))
        .route("/debug/pingdb", get(ping_db_handler))
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}

/// Eager bring-up right after bind. Failure leaves the listener up.
pub fn spawn_database_bring_up(state: Arc<AppState>) {
    tokio::spawn(async move {
        if let Err(e) = state.database.ensure_pool().await {
            error!("Failed to initialize database (startup): {e}");
        }
    });
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = ctrl_c().await {
            error!("Failed to install Ctrl+C handler: {e}");
            pending::<()>().await;
        }

        info!("Received Ctrl+C, shutting down");
    };

    #[cfg(unix)]
    let terminate = async {
        match signal(SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(e) => {
                error!("Failed to install signal handler: {e}");
                pending::<()>().await;
            }
        }

        info!("Received terminate signal, shutting down");
    };

    #[cfg(not(unix))]
    let terminate = pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
