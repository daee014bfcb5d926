pub mod routes;
pub mod state;
pub mod ws;

use axum::{extract::DefaultBodyLimit, routing::{get, post}, Router};
use crate::adapters::http::state::HttpState;
use crate::adapters::http::ws::ws_handler;

pub fn router(state: HttpState) -> Router {
    let upload_limit = state.config.max_upload_bytes;
    Router::new()
        .route("/api/config", get(routes::get_config))
        .route("/api/cameras", get(routes::list_cameras))
        .route("/api/image", get(routes::get_image))
        .route(
            "/api/image",
            post(routes::submit_image).layer(DefaultBodyLimit::max(upload_limit)),
        )
        .route("/api/capture", post(routes::capture))
        .route("/api/results", get(routes::get_results))
        .route("/api/overlay.jpg", get(routes::get_overlay))
        .route("/ws/results", get(ws_handler))
        .with_state(state)
}
