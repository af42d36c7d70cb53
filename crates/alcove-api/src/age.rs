use alcove_store::RoomName;
use alcove_types::api::{AgeForm, AgeQuery};
use axum::{
    Form,
    extract::{Query, State},
    response::{IntoResponse, Redirect},
};
use axum_extra::extract::cookie::CookieJar;
use tracing::debug;

use crate::auth::session_cookie;
use crate::config::{AgeGate, Config};
use crate::error::ApiError;
use crate::state::AppState;
use crate::views::{AgePage, encode_query, render};

pub const AGE_COOKIE: &str = "alcove_age";

pub fn age_cookie_name(room: &RoomName) -> String {
    format!("{}_{}", AGE_COOKIE, room)
}

/// Whether the visitor already passed the interstitial for `room`.
pub fn age_confirmed(config: &Config, jar: &CookieJar, room: Option<&RoomName>) -> bool {
    let has = |name: &str| jar.get(name).is_some_and(|c| c.value() == "1");
    match config.age_gate {
        AgeGate::Off => true,
        AgeGate::Global => has(AGE_COOKIE),
        AgeGate::PerRoom => match room {
            Some(room) => has(&age_cookie_name(room)),
            None => has(AGE_COOKIE),
        },
    }
}

pub fn interstitial_url(next: &str, room: Option<&RoomName>) -> String {
    let mut url = format!("/age?next={}", encode_query(next));
    if let Some(room) = room {
        url.push_str("&room=");
        url.push_str(room.as_str());
    }
    url
}

/// Only site-local paths survive; anything else becomes `/`.
pub(crate) fn safe_next(next: Option<&str>) -> String {
    match next {
        Some(path)
            if path.starts_with('/')
                && !path.starts_with("//")
                && !path.contains('\\')
                && !path.chars().any(char::is_control) =>
        {
            path.to_string()
        }
        _ => "/".to_string(),
    }
}

/// GET /age
pub async fn interstitial(Query(query): Query<AgeQuery>) -> Result<impl IntoResponse, ApiError> {
    let room = query
        .room
        .as_deref()
        .and_then(|r| RoomName::parse(r).ok())
        .map(|r| r.to_string())
        .unwrap_or_default();
    render(&AgePage {
        next: safe_next(query.next.as_deref()),
        room,
    })
}

/// POST /age
pub async fn confirm(
    State(state): State<AppState>,
    jar: CookieJar,
    Form(form): Form<AgeForm>,
) -> impl IntoResponse {
    let next = safe_next(form.next.as_deref());
    let room = form.room.as_deref().and_then(|r| RoomName::parse(r).ok());

    if form.confirm != "yes" {
        return (jar, Redirect::to(&interstitial_url(&next, room.as_ref())));
    }

    let name = match (state.config.age_gate, &room) {
        (AgeGate::PerRoom, Some(room)) => age_cookie_name(room),
        _ => AGE_COOKIE.to_string(),
    };
    debug!("Age confirmed ({})", name);
    let cookie = session_cookie(name, "1", state.config.cookie_max_age_secs);
    (jar.add(cookie), Redirect::to(&next))
}
