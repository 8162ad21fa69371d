//! Router assembly: the `/api/v1` endpoints, the `/ws` upgrade, the static
//! frontend, plus CORS and per-request tracing.

use std::sync::Arc;

use axum::{
    routing::{get, post},
    Router,
};
use tower_http::{
    cors::{Any, CorsLayer},
    services::{ServeDir, ServeFile},
    trace::{DefaultMakeSpan, DefaultOnRequest, DefaultOnResponse, TraceLayer},
};
use tracing::Level;

use crate::state::AppState;

pub mod http;
pub mod ws;

/// Directory the frontend bundle is served from; unknown paths get its `index.html`.
const STATIC_DIR: &str = "./static";

fn api_routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/health", get(http::http_health))
        .route("/levels", get(http::http_get_levels))
        .route("/session", post(http::http_post_session))
        // challenges
        .route("/challenge/next", post(http::http_post_next_challenge))
        .route("/challenge/:id", get(http::http_get_challenge))
        // editor
        .route("/validate", post(http::http_post_validate))
        .route("/run", post(http::http_post_run))
        .route("/edit", post(http::http_post_edit))
        .route("/solution", post(http::http_post_solution))
        // progress
        .route("/complete", post(http::http_post_complete))
        .route("/progress", get(http::http_get_progress))
        .route("/leaderboard", get(http::http_get_leaderboard))
        .route("/mentor", post(http::http_post_mentor))
}

pub fn build_router(state: Arc<AppState>) -> Router {
    let frontend = ServeDir::new(STATIC_DIR)
        .append_index_html_on_directories(true)
        .not_found_service(ServeFile::new(format!("{}/index.html", STATIC_DIR)));

    let cors = CorsLayer::new().allow_origin(Any).allow_methods(Any).allow_headers(Any);

    let trace = TraceLayer::new_for_http()
        .make_span_with(DefaultMakeSpan::new().level(Level::INFO))
        .on_request(DefaultOnRequest::new().level(Level::DEBUG))
        .on_response(DefaultOnResponse::new().level(Level::INFO));

    Router::new()
        .route("/ws", get(ws::ws_upgrade))
        .nest("/api/v1", api_routes())
        .with_state(state)
        .layer(cors)
        .layer(trace)
        .fallback_service(frontend)
}
