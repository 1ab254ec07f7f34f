//! `file.v1.FileService`: workspace read, write and edit.

use axum::extract::rejection::JsonRejection;
use axum::extract::State;
use axum::{Extension, Json};
use sandbox_core::SessionId;
use tracing::{info, warn};

use super::error::RpcError;
use super::messages::{
    EditRequest, EditResponse, Empty, ReadRequest, ReadResponse, WriteRequest,
};
use crate::state::AppState;

pub async fn read(
    State(state): State<AppState>,
    Extension(session_id): Extension<SessionId>,
    payload: Result<Json<ReadRequest>, JsonRejection>,
) -> Result<Json<ReadResponse>, RpcError> {
    let Json(req) = payload?;
    info!(path = %req.path, "reading file");

    let content = state
        .files
        .read(&session_id, &req.path)
        .await
        .inspect_err(|e| warn!(path = %req.path, error = %e, "failed to read file"))?;
    Ok(Json(ReadResponse { content }))
}

pub async fn write(
    State(state): State<AppState>,
    Extension(session_id): Extension<SessionId>,
    payload: Result<Json<WriteRequest>, JsonRejection>,
) -> Result<Json<Empty>, RpcError> {
    let Json(req) = payload?;
    info!(path = %req.path, content_length = req.content.len(), "writing file");

    state
        .files
        .write(&session_id, &req.path, &req.content)
        .await
        .inspect_err(|e| warn!(path = %req.path, error = %e, "failed to write file"))?;
    Ok(Json(Empty {}))
}

pub async fn edit(
    State(state): State<AppState>,
    Extension(session_id): Extension<SessionId>,
    payload: Result<Json<EditRequest>, JsonRejection>,
) -> Result<Json<EditResponse>, RpcError> {
    let Json(req) = payload?;
    info!(path = %req.path, content_length = req.content.len(), "editing file");

    let outcome = state
        .files
        .edit(&session_id, &req.path, &req.content)
        .await
        .inspect_err(|e| warn!(path = %req.path, error = %e, "failed to edit file"))?;
    Ok(Json(EditResponse {
        path: outcome.path,
        content: outcome.content,
    }))
}
