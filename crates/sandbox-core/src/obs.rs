//! Structured observability hooks for sandbox lifecycle events.
//!
//! This module provides:
//! - Session-scoped tracing spans via [`session_span`]
//! - Emission functions for key events: sandbox created/destroyed,
//!   authentication accepted/rejected, shell command finished
//!
//! Credentials only ever appear in masked form.

use tracing::{debug, info, warn};

use crate::gate::mask_credential;
use crate::store::{Credential, SessionId};

/// Span tagged with the caller's session id, for use with
/// [`tracing::Instrument`].
///
/// ```ignore
/// files.read(&sid, "notes.txt").instrument(session_span(&sid, "file.read")).await
/// ```
pub fn session_span(session_id: &SessionId, op: &'static str) -> tracing::Span {
    tracing::info_span!("sandbox.op", op = op, sandbox_id = %session_id)
}

/// Emit event: new sandbox session issued.
pub fn emit_sandbox_created(session_id: &SessionId, credential: &Credential) {
    info!(
        event = "sandbox.created",
        sandbox_id = %session_id,
        api_key_prefix = %credential.masked(),
    );
}

/// Emit event: sandbox session revoked.
pub fn emit_sandbox_destroyed(session_id: &SessionId) {
    info!(event = "sandbox.destroyed", sandbox_id = %session_id);
}

/// Emit event: a call passed the access gate.
pub fn emit_auth_accepted(procedure: &str, session_id: &SessionId) {
    debug!(
        event = "auth.accepted",
        procedure = %procedure,
        sandbox_id = %session_id,
        "authentication successful"
    );
}

/// Emit event: a call was rejected by the access gate (warning level).
///
/// `presented` is the raw header value, or `None` when it was absent.
pub fn emit_auth_rejected(procedure: &str, reason: &str, presented: Option<&str>) {
    match presented {
        Some(raw) => warn!(
            event = "auth.rejected",
            procedure = %procedure,
            reason = %reason,
            api_key_prefix = %mask_credential(raw),
            "authentication failed"
        ),
        None => warn!(
            event = "auth.rejected",
            procedure = %procedure,
            reason = %reason,
            "authentication failed"
        ),
    }
}

/// Emit event: shell command finished (any outcome).
pub fn emit_shell_finished(
    exit_code: Option<i32>,
    duration_ms: u64,
    output_len: usize,
    timed_out: bool,
) {
    info!(
        event = "shell.finished",
        exit_code = ?exit_code,
        duration_ms = duration_ms,
        output_length = output_len,
        timed_out = timed_out,
    );
}
