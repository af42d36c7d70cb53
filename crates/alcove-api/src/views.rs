use alcove_store::RoomName;
use alcove_types::api::AckResponse;
use alcove_types::{FileKind, FileMeta};
use askama::Template;
use axum::{
    Json,
    http::{HeaderMap, header},
    response::{Html, IntoResponse, Redirect, Response},
};
use percent_encoding::{AsciiSet, NON_ALPHANUMERIC, utf8_percent_encode};

use crate::error::ApiError;

/// Characters left alone when a file name becomes a URL path segment.
const SEGMENT: &AsciiSet = &NON_ALPHANUMERIC.remove(b'.').remove(b'-').remove(b'_');

pub fn encode_segment(raw: &str) -> String {
    utf8_percent_encode(raw, SEGMENT).to_string()
}

pub fn encode_query(raw: &str) -> String {
    utf8_percent_encode(raw, NON_ALPHANUMERIC).to_string()
}

pub fn render<T: Template>(page: &T) -> Result<Html<String>, ApiError> {
    Ok(Html(page.render()?))
}

/// True when the client asked for JSON instead of an HTML redirect.
pub fn wants_json(headers: &HeaderMap) -> bool {
    headers
        .get(header::ACCEPT)
        .and_then(|v| v.to_str().ok())
        .is_some_and(|v| v.contains("application/json"))
}

/// `{"ok":true}` for API clients, otherwise a 303 to `location`.
pub fn ack_or_redirect(headers: &HeaderMap, location: &str) -> Response {
    if wants_json(headers) {
        Json(AckResponse { ok: true }).into_response()
    } else {
        Redirect::to(location).into_response()
    }
}

#[derive(Template)]
#[template(path = "index.html")]
pub struct IndexPage {
    pub rooms: Vec<String>,
    pub admin: bool,
    pub can_create: bool,
    pub token_query: String,
}

/// One gallery entry with its URLs precomputed.
pub struct FileTile {
    pub name: String,
    pub size_label: String,
    pub mime: String,
    pub kind: &'static str,
    pub modified: String,
    pub raw_url: String,
    pub download_url: String,
    pub delete_url: String,
}

impl FileTile {
    pub fn new(room: &RoomName, meta: &FileMeta, token_query: &str) -> Self {
        let segment = encode_segment(&meta.name);
        let raw_url = format!("/file/{}/{}", room, segment);
        let kind = match meta.kind() {
            FileKind::Image => "image",
            FileKind::Video => "video",
            FileKind::Audio => "audio",
            FileKind::Other => "other",
        };
        Self {
            name: meta.name.clone(),
            size_label: meta.size_label(),
            mime: meta.mime.clone(),
            kind,
            modified: meta.modified.format("%Y-%m-%d %H:%M UTC").to_string(),
            download_url: format!("{}?download=1", raw_url),
            delete_url: format!("/delete/{}/{}{}", room, segment, token_query),
            raw_url,
        }
    }
}

#[derive(Template)]
#[template(path = "room.html")]
pub struct RoomPage {
    pub room: String,
    pub files: Vec<FileTile>,
    pub admin: bool,
    pub token_query: String,
    pub max_upload: String,
}

#[derive(Template)]
#[template(path = "age.html")]
pub struct AgePage {
    pub next: String,
    pub room: String,
}

#[derive(Template)]
#[template(path = "login.html")]
pub struct LoginPage {
    pub admin: bool,
    pub next: String,
    pub failed: bool,
}
