use serde::{Deserialize, Serialize};

use crate::models::FileMeta;

// -- Rooms --

#[derive(Debug, Default, Deserialize)]
pub struct CreateRoomForm {
    #[serde(default)]
    pub name: String,
}

/// Typed confirmation for a room-wide delete. Must equal the room name.
#[derive(Debug, Default, Deserialize)]
pub struct DeleteRoomForm {
    #[serde(default)]
    pub confirm: String,
}

#[derive(Debug, Serialize)]
pub struct RoomListResponse {
    pub rooms: Vec<String>,
}

#[derive(Debug, Serialize)]
pub struct FileListResponse {
    pub room: String,
    pub files: Vec<FileMeta>,
}

/// Acknowledgement for API-style clients instead of a redirect.
#[derive(Debug, Serialize)]
pub struct AckResponse {
    pub ok: bool,
}

// -- Uploads --

#[derive(Debug, Serialize)]
pub struct UploadResponse {
    pub ok: bool,
    pub room: String,
    pub file: FileMeta,
}

#[derive(Debug, Default, Deserialize)]
pub struct FileQuery {
    #[serde(default)]
    pub download: Option<String>,
}

// -- Age gate --

#[derive(Debug, Default, Deserialize)]
pub struct AgeQuery {
    #[serde(default)]
    pub next: Option<String>,
    #[serde(default)]
    pub room: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct AgeForm {
    #[serde(default)]
    pub confirm: String,
    #[serde(default)]
    pub next: Option<String>,
    #[serde(default)]
    pub room: Option<String>,
}

// -- Admin --

/// A missing password is treated like a wrong one.
#[derive(Debug, Default, Deserialize)]
pub struct LoginForm {
    #[serde(default)]
    pub password: String,
    #[serde(default)]
    pub next: Option<String>,
}

/// Query-string admin token, honoured only when the deployment enables it.
#[derive(Debug, Default, Deserialize)]
pub struct AdminQuery {
    #[serde(default)]
    pub admin: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct NextQuery {
    #[serde(default)]
    pub next: Option<String>,
}
