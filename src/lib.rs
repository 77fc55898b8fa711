//! Idea board backend.
//!
//! Users post short text ideas and upvote the ideas of others; the list
//! view sorts by newest or by popularity. One Postgres table holds
//! everything, the client polls.
//!
//!
//!
//! # General Infrastructure
//! - `ideaboard` binary: the HTTP API, stateless, safe to restart any time
//! - `migrate` binary: runs once per deployment before the API starts,
//!   brings the schema up to date, exits 0/1
//! - Postgres is the only stateful component; the API holds a bounded
//!   connection pool and the upvote counter relies on the database's
//!   atomic server-side increment
//!
//!
//!
//! # Environment
//!
//! | Variable       | Default | Meaning                        |
//! |----------------|---------|--------------------------------|
//! | `DATABASE_URL` | —       | Postgres connection string     |
//! | `DATABASE_SSL` | `false` | Require TLS to the database    |
//! | `PORT`         | `4000`  | Listening port                 |
//! | `RUST_LOG`     | —       | Standard `EnvFilter` directives |
//!
//!
//!
//! # Abuse Limits
//!
//! Requests are throttled per client address (30 per 10 s window) and
//! request bodies are capped at 100 KB before any parsing happens. Both
//! are availability safeguards for a public board, not security
//! boundaries.

use std::{net::SocketAddr, time::Duration};

use axum::{
    Router,
    extract::DefaultBodyLimit,
    http::{Method, header::CONTENT_TYPE},
    middleware,
    routing::{get, post},
};

use signal::{
    ctrl_c,
    unix::{SignalKind, signal},
};
use tokio::{net::TcpListener, signal};
use tower_http::cors::{Any, CorsLayer};
use tracing::info;
use tracing_subscriber::{EnvFilter, fmt};

pub mod config;
pub mod database;
pub mod error;
pub mod ideas;
pub mod migrate;
pub mod rate_limit;
pub mod routes;
pub mod state;

use rate_limit::rate_limit_middleware;
use routes::{create_idea_handler, health_handler, list_ideas_handler, upvote_handler};
use state::State;

pub const BODY_LIMIT_BYTES: usize = 100 * 1024;

pub async fn start_server() {
    fmt().with_env_filter(EnvFilter::from_default_env()).init();

    info!("Initializing state...");
    let state = State::new();

    info!("Starting server...");

    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers([CONTENT_TYPE])
        .max_age(Duration::from_secs(60 * 60));

    let app = Router::new()
        .route("/api/health", get(health_handler))
        .route("/api/ideas", post(create_idea_handler).get(list_ideas_handler))
        .route("/api/ideas/{id}/upvote", post(upvote_handler))
        .layer(middleware::from_fn_with_state(
            state.clone(),
            rate_limit_middleware,
        ))
        .layer(DefaultBodyLimit::max(BODY_LIMIT_BYTES))
        .layer(cors)
        .with_state(state.clone());

    let address = format!("0.0.0.0:{}", state.config.port);
    info!("Binding to {address}");

    let listener = TcpListener::bind(&address).await.unwrap();
    info!("Server running on {address}");

    axum::serve(
        listener,
        // the rate limiter keys on the peer address
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(shutdown_signal())
    .await
    .unwrap();

    // in-flight requests have drained by now
    state.pool.close().await;
    println!("Server shutting down...");
}

async fn shutdown_signal() {
    let ctrl_c = async {
        ctrl_c().await.expect("Failed to install Ctrl+C handler");

        info!("Received Ctrl+C, shutting down");
    };

    #[cfg(unix)]
    let terminate = async {
        signal(SignalKind::terminate())
            .expect("Failed to install signal handler")
            .recv()
            .await;

        info!("Received terminate signal, shutting down");
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
