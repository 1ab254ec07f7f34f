//! HTTP routing: procedure table, access gate and request deadline.

use std::time::Duration;

use axum::extract::{Request, State};
use axum::http::Uri;
use axum::middleware::{self, Next};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::Router;
use sandbox_core::{Admission, API_KEY_HEADER};

use crate::rpc::{self, procedures, Code, RpcError};
use crate::state::AppState;

/// Build the full application.
///
/// Every procedure except Execute is bounded by `request_timeout`; Execute
/// carries its own deadline in the shell executor.
pub fn router(state: AppState, request_timeout: Duration) -> Router {
    let procedures_api = Router::new()
        .route(procedures::INIT_SANDBOX, post(rpc::core::init_sandbox))
        .route(procedures::DESTROY_SANDBOX, post(rpc::core::destroy_sandbox))
        .route(procedures::FILE_READ, post(rpc::file::read))
        .route(procedures::FILE_WRITE, post(rpc::file::write))
        .route(procedures::FILE_EDIT, post(rpc::file::edit))
        .layer(middleware::from_fn_with_state(request_timeout, enforce_deadline))
        .route(procedures::SHELL_EXECUTE, post(rpc::shell::execute))
        .route_layer(middleware::from_fn_with_state(state.clone(), authenticate));

    Router::new()
        .route("/health", get(health))
        .merge(procedures_api)
        .fallback(unknown_procedure)
        .with_state(state)
}

async fn health() -> &'static str {
    "OK"
}

async fn unknown_procedure(uri: Uri) -> RpcError {
    RpcError::unimplemented(uri.path())
}

/// Run the access gate. On success the resolved `SessionId` rides along in
/// the request extensions for the handler to extract.
async fn authenticate(
    State(state): State<AppState>,
    mut req: Request,
    next: Next,
) -> Result<Response, RpcError> {
    let procedure = req.uri().path().to_owned();
    let presented = req
        .headers()
        .get(API_KEY_HEADER)
        .and_then(|v| v.to_str().ok())
        .map(str::to_owned);

    let admission = state.gate.admit(&procedure, presented.as_deref()).await?;
    if let Admission::Authenticated(session_id) = admission {
        req.extensions_mut().insert(session_id);
    }
    Ok(next.run(req).await)
}

async fn enforce_deadline(State(limit): State<Duration>, req: Request, next: Next) -> Response {
    match tokio::time::timeout(limit, next.run(req)).await {
        Ok(response) => response,
        Err(_elapsed) => RpcError::new(
            Code::DeadlineExceeded,
            format!("request exceeded {}s", limit.as_secs_f64()),
        )
        .into_response(),
    }
}
