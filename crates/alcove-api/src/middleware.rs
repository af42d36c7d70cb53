use std::collections::HashMap;

use alcove_store::RoomName;
use axum::{
    extract::{Path, Request, State},
    middleware::Next,
    response::{IntoResponse, Redirect, Response},
};
use axum_extra::extract::cookie::CookieJar;
use tracing::{debug, warn};

use crate::age::{age_confirmed, interstitial_url};
use crate::auth::Viewer;
use crate::error::ApiError;
use crate::state::AppState;

/// Reject the request unless it carries a valid admin credential.
///
/// Runs on every mutating route, whatever the rendered page showed.
pub async fn require_admin(viewer: Viewer, req: Request, next: Next) -> Result<Response, ApiError> {
    if !viewer.admin {
        warn!("Unauthorized {} {}", req.method(), req.uri().path());
        return Err(ApiError::Unauthorized);
    }
    Ok(next.run(req).await)
}

/// Send visitors who have not confirmed their age to the interstitial,
/// remembering where they were headed.
pub async fn require_age(
    State(state): State<AppState>,
    jar: CookieJar,
    Path(params): Path<HashMap<String, String>>,
    req: Request,
    next: Next,
) -> Response {
    let room = params.get("room").and_then(|r| RoomName::parse(r).ok());
    if age_confirmed(&state.config, &jar, room.as_ref()) {
        return next.run(req).await;
    }

    let target = req
        .uri()
        .path_and_query()
        .map(|pq| pq.as_str())
        .unwrap_or("/");
    debug!("Age gate redirect for {}", target);
    Redirect::to(&interstitial_url(target, room.as_ref())).into_response()
}
