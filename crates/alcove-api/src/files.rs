use alcove_store::{RoomName, StoreError};
use alcove_types::api::{FileQuery, UploadResponse};
use axum::{
    Json,
    body::Body,
    extract::{Multipart, Path, Query, Request, State},
    http::{HeaderMap, HeaderValue, StatusCode, header},
    response::{IntoResponse, Redirect, Response},
};
use tower::ServiceExt;
use tower_http::services::ServeFile;
use tracing::debug;

use crate::auth::Viewer;
use crate::error::{ApiError, multipart_error};
use crate::state::AppState;
use crate::views::{ack_or_redirect, wants_json};

/// POST /r/{room}/upload, a multipart form with a `file` part.
pub async fn upload_file(
    State(state): State<AppState>,
    viewer: Viewer,
    headers: HeaderMap,
    Path(room): Path<String>,
    mut multipart: Multipart,
) -> Result<Response, ApiError> {
    let room = RoomName::parse(&room).map_err(|_| ApiError::NotFound)?;
    if !state.store.room_exists(&room).await {
        return Err(ApiError::NotFound);
    }

    let limit = state.store.max_upload_bytes();
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| multipart_error(e, limit))?
    {
        if field.name() != Some("file") {
            continue;
        }
        let file_name = field.file_name().map(str::to_string);
        // Browsers send an empty, unnamed part when nothing was picked.
        if file_name.as_deref() == Some("") {
            continue;
        }
        let content_type = field.content_type().map(str::to_string);

        let meta = state
            .store
            .save_upload(&room, field, file_name.as_deref(), content_type.as_deref())
            .await?;

        if wants_json(&headers) {
            let body = UploadResponse {
                ok: true,
                room: room.to_string(),
                file: meta,
            };
            return Ok((StatusCode::CREATED, Json(body)).into_response());
        }
        return Ok(Redirect::to(&format!("/r/{}{}", room, viewer.token_query)).into_response());
    }

    Err(ApiError::BadRequest("no file part in upload".into()))
}

/// GET /file/{room}/{name}
///
/// Streams the stored bytes with a content type inferred from the name.
/// Range and conditional requests are handled by `ServeFile`.
pub async fn serve_file(
    State(state): State<AppState>,
    Path((room, name)): Path<(String, String)>,
    Query(query): Query<FileQuery>,
    req: Request,
) -> Result<Response, ApiError> {
    let room = RoomName::parse(&room).map_err(|_| ApiError::NotFound)?;
    let (path, meta) = state
        .store
        .stat_file(&room, &name)
        .await
        .map_err(|e| match e {
            StoreError::InvalidName(_) => ApiError::NotFound,
            other => other.into(),
        })?;

    let res = match ServeFile::new(&path).oneshot(req).await {
        Ok(res) => res,
        Err(never) => match never {},
    };
    let mut res = res.map(Body::new);

    let headers = res.headers_mut();
    headers.insert(
        header::X_CONTENT_TYPE_OPTIONS,
        HeaderValue::from_static("nosniff"),
    );
    if matches!(query.download.as_deref(), Some("1") | Some("true")) {
        debug!("Download of {}/{}", room, meta.name);
        let disposition = format!("attachment; filename=\"{}\"", meta.name.replace('"', ""));
        let value = HeaderValue::from_str(&disposition)
            .unwrap_or_else(|_| HeaderValue::from_static("attachment"));
        headers.insert(header::CONTENT_DISPOSITION, value);
    }
    Ok(res)
}

/// POST /delete/{room}/{name}
pub async fn delete_file(
    State(state): State<AppState>,
    viewer: Viewer,
    headers: HeaderMap,
    Path((room, name)): Path<(String, String)>,
) -> Result<Response, ApiError> {
    let room = RoomName::parse(&room)?;
    state.store.delete_file(&room, &name).await?;
    Ok(ack_or_redirect(
        &headers,
        &format!("/r/{}{}", room, viewer.token_query),
    ))
}
