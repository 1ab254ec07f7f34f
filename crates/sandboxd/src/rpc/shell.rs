//! `shell.v1.ShellService`: bounded command execution.

use axum::extract::rejection::JsonRejection;
use axum::extract::State;
use axum::{Extension, Json};
use sandbox_core::SessionId;
use tracing::{info, warn};

use super::error::RpcError;
use super::messages::{ExecuteRequest, ExecuteResponse};
use crate::state::AppState;

/// Failures still return the partial output, in the error body's `output`.
pub async fn execute(
    State(state): State<AppState>,
    Extension(session_id): Extension<SessionId>,
    payload: Result<Json<ExecuteRequest>, JsonRejection>,
) -> Result<Json<ExecuteResponse>, RpcError> {
    let Json(req) = payload?;
    info!(command = %req.command, "executing command");

    match state.shell.execute(&session_id, &req.command).await {
        Ok(output) => Ok(Json(ExecuteResponse { output })),
        Err(e) => {
            warn!(command = %req.command, error = %e, "command execution failed");
            Err(e.into())
        }
    }
}
