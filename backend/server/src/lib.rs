//! Anonymous "next partner" video chat backend.
//!
//! Pairs browser sessions that asked for the same filters and relays their
//! WebRTC negotiation (offers, answers, ICE candidates) between them. Media
//! never passes through here.
//!
//!
//!
//! # Matchmaking
//!
//! - Client opens `GET /ws`, gets `connected` with its session id
//! - Client sends `find-partner` with up to five facets
//! - Facets collapse into a [signature](crate::signature), one FIFO queue per signature
//! - Someone already waiting under the same signature: both get `partner-found`
//! - Nobody waiting: join the queue, `partner-dummy` after the fallback delay
//! - `find-partner` again at any time means "next", the old partner gets `partner-left`
//! - Closing the socket tells the partner `partner-disconnected`
//!
//! See [pairing] for the state machine and [fallback] for the delayed check.
//!
//!
//!
//! # Signaling
//!
//! `signal` frames are forwarded as-is to the addressed session, tagged with
//! the sender's id. Payloads are never parsed. Unknown recipients are dropped
//! silently, the sender finds out through `partner-disconnected`.
//!
//!
//!
//! # HTTP
//!
//! | Route | |
//! |---|---|
//! | `GET /health` | liveness |
//! | `GET /api/online-count` | open sessions |
//! | `POST /api/login` | login log |
//! | `GET/POST /api/admin/rules` | house rules text |
//!
//!
//!
//! # Setup
//!
//! Run with debug logs.
//! ```sh
//! RUST_LOG=server=debug cargo run -p nextchat
//! ```
//!
//! Smoke test against a running server.
//! ```sh
//! cargo run -p tester -- --url ws://127.0.0.1:10000/ws
//! ```
//!
//! ## Environment
//!
//! - `PORT`: listen port, default 10000
//! - `CORS_ORIGIN`: comma separated origins, default `*`
//! - `FALLBACK_DELAY_MS`: wait before `partner-dummy`, default 3000
//! - `FALLBACK_MESSAGE`: text sent with `partner-dummy`
//! - `LOG_RETENTION_DAYS`: login log retention, default 30
use std::{sync::Arc, time::Duration};

use axum::{
    Router,
    http::{HeaderValue, Method, header::CONTENT_TYPE},
    routing::{get, post},
};
use tokio::{net::TcpListener, signal::ctrl_c};
use tower_http::cors::{AllowOrigin, Any, CorsLayer};
use tracing::{error, info};
use tracing_subscriber::{EnvFilter, fmt};

pub mod config;
pub mod database;
pub mod error;
pub mod fallback;
pub mod pairing;
pub mod presence;
pub mod queue;
pub mod registry;
pub mod relay;
pub mod routes;
pub mod signature;
pub mod socket;
pub mod state;
pub mod utils;

use config::{ANY_ORIGIN, Config};
use routes::{
    get_rules_handler, health_handler, login_handler, online_count_handler, set_rules_handler,
};
use socket::socket_handler;
use state::AppState;

pub async fn start_server() -> anyhow::Result<()> {
    fmt().with_env_filter(EnvFilter::from_default_env()).init();

    info!("Loading config...");
    let config = Config::load()?;

    info!("Initializing state...");
    let state = AppState::new(config);

    info!("Starting server...");
    let app = router(state.clone());

    let address = format!("0.0.0.0:{}", state.config.port);
    info!("Binding to {address}");

    let listener = TcpListener::bind(&address).await?;
    info!("Server running on {address}");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Server shutting down...");
    Ok(())
}

pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/health", get(health_handler))
        .route("/api/online-count", get(online_count_handler))
        .route("/api/login", post(login_handler))
        .route(
            "/api/admin/rules",
            get(get_rules_handler).post(set_rules_handler),
        )
        .route("/ws", get(socket_handler))
        .layer(cors(&state.config.cors_origins))
        .with_state(state)
}

fn cors(origins: &[String]) -> CorsLayer {
    let layer = CorsLayer::new()
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers([CONTENT_TYPE])
        .max_age(Duration::from_secs(60 * 60));

    if origins.iter().any(|origin| origin == ANY_ORIGIN) {
        return layer.allow_origin(Any);
    }

    layer.allow_origin(AllowOrigin::list(
        origins
            .iter()
            .filter_map(|origin| HeaderValue::from_str(origin).ok()),
    ))
}

async fn shutdown_signal() {
    let ctrl_c = async {
        match ctrl_c().await {
            Ok(()) => info!("Received Ctrl+C, shutting down"),
            Err(e) => {
                error!("Failed to install Ctrl+C handler: {e}");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(unix)]
    let terminate = async {
        use tokio::signal::unix::{SignalKind, signal};

        match signal(SignalKind::terminate()) {
            Ok(mut terminate) => {
                terminate.recv().await;
                info!("Received terminate signal, shutting down");
            }
            Err(e) => {
                error!("Failed to install signal handler: {e}");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
