use alcove_store::{RoomName, StoreError};
use alcove_types::api::{CreateRoomForm, DeleteRoomForm, FileListResponse, RoomListResponse};
use alcove_types::human_size;
use axum::{
    Form, Json,
    extract::{Path, State},
    http::HeaderMap,
    response::{IntoResponse, Redirect, Response},
};
use tracing::info;

use crate::auth::Viewer;
use crate::config::RoomCreation;
use crate::error::ApiError;
use crate::state::AppState;
use crate::views::{FileTile, IndexPage, RoomPage, ack_or_redirect, render};

/// GET /
pub async fn index(
    State(state): State<AppState>,
    viewer: Viewer,
) -> Result<impl IntoResponse, ApiError> {
    let rooms = state.store.list_rooms().await?;
    render(&IndexPage {
        rooms: rooms.into_iter().map(|r| r.to_string()).collect(),
        can_create: viewer.admin || state.config.room_creation == RoomCreation::Open,
        admin: viewer.admin,
        token_query: viewer.token_query,
    })
}

/// POST /rooms
pub async fn create_room(
    State(state): State<AppState>,
    viewer: Viewer,
    Form(form): Form<CreateRoomForm>,
) -> Result<Redirect, ApiError> {
    if state.config.room_creation == RoomCreation::AdminOnly && !viewer.admin {
        return Err(ApiError::Unauthorized);
    }

    let room = state.store.ensure_room(form.name.trim()).await?;
    info!("Room {} ready", room);
    Ok(Redirect::to(&format!("/r/{}{}", room, viewer.token_query)))
}

/// GET /r/{room}
pub async fn room_page(
    State(state): State<AppState>,
    viewer: Viewer,
    Path(room): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let room = RoomName::parse(&room).map_err(|_| ApiError::NotFound)?;
    if !state.store.room_exists(&room).await {
        return Err(ApiError::NotFound);
    }

    let files = state
        .store
        .list_files(&room)
        .await?
        .iter()
        .map(|meta| FileTile::new(&room, meta, &viewer.token_query))
        .collect();

    render(&RoomPage {
        room: room.to_string(),
        files,
        admin: viewer.admin,
        token_query: viewer.token_query,
        max_upload: human_size(state.config.max_upload_bytes),
    })
}

/// POST /delete-room/{room}
///
/// The form must repeat the room name exactly. A room that is already gone
/// counts as deleted.
pub async fn delete_room(
    State(state): State<AppState>,
    viewer: Viewer,
    headers: HeaderMap,
    Path(room): Path<String>,
    Form(form): Form<DeleteRoomForm>,
) -> Result<Response, ApiError> {
    let room = RoomName::parse(&room)?;
    if form.confirm != room.as_str() {
        return Err(ApiError::ConfirmationMismatch);
    }

    match state.store.delete_room(&room).await {
        Ok(()) => {}
        Err(StoreError::NotFound) => info!("Room {} was already deleted", room),
        Err(e) => return Err(e.into()),
    }
    Ok(ack_or_redirect(&headers, &format!("/{}", viewer.token_query)))
}

/// GET /api/rooms
pub async fn list_rooms_json(
    State(state): State<AppState>,
) -> Result<Json<RoomListResponse>, ApiError> {
    let rooms = state.store.list_rooms().await?;
    Ok(Json(RoomListResponse {
        rooms: rooms.into_iter().map(|r| r.to_string()).collect(),
    }))
}

/// GET /api/rooms/{room}/files
pub async fn list_files_json(
    State(state): State<AppState>,
    Path(room): Path<String>,
) -> Result<Json<FileListResponse>, ApiError> {
    let room = RoomName::parse(&room).map_err(|_| ApiError::NotFound)?;
    if !state.store.room_exists(&room).await {
        return Err(ApiError::NotFound);
    }
    let files = state.store.list_files(&room).await?;
    Ok(Json(FileListResponse {
        room: room.to_string(),
        files,
    }))
}
