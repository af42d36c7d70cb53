pub mod age;
pub mod auth;
pub mod config;
pub mod error;
pub mod files;
pub mod middleware;
pub mod rooms;
pub mod state;
pub mod views;

use axum::{
    Router,
    extract::DefaultBodyLimit,
    middleware::from_fn_with_state,
    routing::{get, post},
};

pub use config::{AgeGate, Config, RoomCreation};
pub use error::ApiError;
pub use state::{AppState, AppStateInner};

use crate::middleware::{require_admin, require_age};

/// Multipart framing on top of the file bytes themselves.
const MULTIPART_SLACK: u64 = 1024 * 1024;

/// Build the full HTTP surface. Tracing and other outer layers are added by
/// the binary.
pub fn router(state: AppState) -> Router {
    let public_routes = Router::new()
        .route("/", get(rooms::index))
        .route("/rooms", post(rooms::create_room))
        .route("/r/{room}/upload", post(files::upload_file))
        .route("/age", get(age::interstitial).post(age::confirm))
        .route("/admin", get(auth::login_page).post(auth::login))
        .route("/admin/logout", post(auth::logout))
        .route("/api/rooms", get(rooms::list_rooms_json))
        .route("/healthz", get(health));

    let gallery_routes = Router::new()
        .route("/r/{room}", get(rooms::room_page))
        .route_layer(from_fn_with_state(state.clone(), require_age));

    let mut raw_routes = Router::new()
        .route("/file/{room}/{name}", get(files::serve_file))
        .route("/api/rooms/{room}/files", get(rooms::list_files_json));
    if state.config.age_gate_raw_files {
        raw_routes = raw_routes.route_layer(from_fn_with_state(state.clone(), require_age));
    }

    let admin_routes = Router::new()
        .route("/delete/{room}/{name}", post(files::delete_file))
        .route("/delete-room/{room}", post(rooms::delete_room))
        .route_layer(from_fn_with_state(state.clone(), require_admin));

    let body_limit = state.config.max_upload_bytes.saturating_add(MULTIPART_SLACK);

    Router::new()
        .merge(public_routes)
        .merge(gallery_routes)
        .merge(raw_routes)
        .merge(admin_routes)
        .layer(DefaultBodyLimit::max(
            usize::try_from(body_limit).unwrap_or(usize::MAX),
        ))
        .with_state(state)
}

async fn health() -> &'static str {
    "ok"
}
