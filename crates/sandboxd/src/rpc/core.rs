//! `core.v1.CoreService`: sandbox session lifecycle.

use axum::extract::State;
use axum::{Extension, Json};
use sandbox_core::SessionId;
use tracing::info;

use super::error::RpcError;
use super::messages::{Empty, InitSandboxResponse};
use crate::state::AppState;

pub async fn init_sandbox(
    State(state): State<AppState>,
) -> Result<Json<InitSandboxResponse>, RpcError> {
    info!("initializing sandbox");
    let issued = state.sessions.init_sandbox().await?;
    info!(sandbox_id = %issued.session_id, "sandbox initialized successfully");

    Ok(Json(InitSandboxResponse {
        sandbox_id: issued.session_id.to_string(),
        api_key: issued.credential.expose().to_string(),
        created_at: issued.created_at,
    }))
}

/// Revoke the caller's own credential. Workspace contents are left alone.
pub async fn destroy_sandbox(
    State(state): State<AppState>,
    Extension(session_id): Extension<SessionId>,
) -> Result<Json<Empty>, RpcError> {
    state.sessions.destroy_sandbox(&session_id).await?;
    Ok(Json(Empty {}))
}
