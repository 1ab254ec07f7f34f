//! Connect error mapping for the RPC surface.

use axum::extract::rejection::JsonRejection;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use sandbox_core::{ExecError, FileError, GateError, SessionError};
use thiserror::Error;
use tracing::error;

use super::messages::ErrorBody;

/// Connect error codes used by this service.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Code {
    InvalidArgument,
    Unauthenticated,
    PermissionDenied,
    NotFound,
    ResourceExhausted,
    DeadlineExceeded,
    Unimplemented,
    Internal,
}

impl Code {
    pub const fn as_str(self) -> &'static str {
        match self {
            Code::InvalidArgument => "invalid_argument",
            Code::Unauthenticated => "unauthenticated",
            Code::PermissionDenied => "permission_denied",
            Code::NotFound => "not_found",
            Code::ResourceExhausted => "resource_exhausted",
            Code::DeadlineExceeded => "deadline_exceeded",
            Code::Unimplemented => "unimplemented",
            Code::Internal => "internal",
        }
    }

    /// HTTP status for this code, per the Connect protocol mapping.
    pub const fn status(self) -> StatusCode {
        match self {
            Code::InvalidArgument => StatusCode::BAD_REQUEST,
            Code::Unauthenticated => StatusCode::UNAUTHORIZED,
            Code::PermissionDenied => StatusCode::FORBIDDEN,
            Code::NotFound => StatusCode::NOT_FOUND,
            Code::ResourceExhausted => StatusCode::TOO_MANY_REQUESTS,
            Code::DeadlineExceeded => StatusCode::GATEWAY_TIMEOUT,
            Code::Unimplemented => StatusCode::NOT_IMPLEMENTED,
            Code::Internal => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    pub fn from_str_lossy(code: &str) -> Self {
        match code {
            "invalid_argument" => Code::InvalidArgument,
            "unauthenticated" => Code::Unauthenticated,
            "permission_denied" => Code::PermissionDenied,
            "not_found" => Code::NotFound,
            "resource_exhausted" => Code::ResourceExhausted,
            "deadline_exceeded" => Code::DeadlineExceeded,
            "unimplemented" => Code::Unimplemented,
            _ => Code::Internal,
        }
    }
}

impl std::fmt::Display for Code {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A failed RPC as it goes over the wire.
#[derive(Debug, Error)]
#[error("{code}: {message}")]
pub struct RpcError {
    pub code: Code,
    pub message: String,
    /// Partial command output for failed Execute calls.
    pub output: Option<String>,
}

impl RpcError {
    pub fn new(code: Code, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            output: None,
        }
    }

    pub fn with_output(mut self, output: Option<String>) -> Self {
        self.output = output;
        self
    }

    pub fn unimplemented(procedure: &str) -> Self {
        Self::new(Code::Unimplemented, format!("unknown procedure {procedure}"))
    }

    pub fn into_body(self) -> ErrorBody {
        ErrorBody {
            code: self.code.as_str().to_string(),
            message: self.message,
            output: self.output,
        }
    }
}

impl From<ErrorBody> for RpcError {
    fn from(body: ErrorBody) -> Self {
        Self {
            code: Code::from_str_lossy(&body.code),
            message: body.message,
            output: body.output,
        }
    }
}

impl IntoResponse for RpcError {
    fn into_response(self) -> Response {
        if self.code == Code::Internal {
            error!(message = %self.message, "rpc failed with internal error");
        }
        let status = self.code.status();
        (status, Json(self.into_body())).into_response()
    }
}

impl From<GateError> for RpcError {
    fn from(err: GateError) -> Self {
        let code = if err.is_unauthenticated() {
            Code::Unauthenticated
        } else {
            Code::Internal
        };
        Self::new(code, err.to_string())
    }
}

impl From<SessionError> for RpcError {
    fn from(err: SessionError) -> Self {
        Self::new(Code::Internal, err.to_string())
    }
}

impl From<FileError> for RpcError {
    fn from(err: FileError) -> Self {
        let code = match &err {
            FileError::NotFound { .. } => Code::NotFound,
            FileError::TooLarge { .. } => Code::ResourceExhausted,
            FileError::InvalidPath { .. } => Code::InvalidArgument,
            FileError::PathEscape { .. } => Code::PermissionDenied,
            FileError::Io { .. } => Code::Internal,
        };
        Self::new(code, err.to_string())
    }
}

impl From<ExecError> for RpcError {
    fn from(err: ExecError) -> Self {
        let code = if err.is_timeout() {
            Code::DeadlineExceeded
        } else {
            Code::Internal
        };
        let output = err.partial_output().map(str::to_string);
        Self::new(code, err.to_string()).with_output(output)
    }
}

impl From<JsonRejection> for RpcError {
    fn from(rejection: JsonRejection) -> Self {
        Self::new(Code::InvalidArgument, rejection.body_text())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sandbox_core::FailureReason;
    use std::time::Duration;

    #[test]
    fn file_errors_map_per_kind() {
        let cases = [
            (FileError::NotFound { path: "a".into() }, Code::NotFound),
            (
                FileError::TooLarge {
                    subject: "content",
                    size: 2,
                    max: 1,
                },
                Code::ResourceExhausted,
            ),
            (
                FileError::InvalidPath {
                    path: "".into(),
                    reason: "empty",
                },
                Code::InvalidArgument,
            ),
            (
                FileError::PathEscape {
                    path: "../x".into(),
                },
                Code::PermissionDenied,
            ),
        ];
        for (err, code) in cases {
            assert_eq!(RpcError::from(err).code, code);
        }
    }

    #[test]
    fn gate_errors_are_unauthenticated() {
        assert_eq!(
            RpcError::from(GateError::MissingCredential).code.status(),
            StatusCode::UNAUTHORIZED
        );
        assert_eq!(
            RpcError::from(GateError::InvalidCredential).code,
            Code::Unauthenticated
        );
    }

    #[test]
    fn exec_timeout_keeps_output() {
        let err = RpcError::from(ExecError::Failed {
            reason: FailureReason::TimedOut {
                limit: Duration::from_secs(1),
            },
            output: "partial".into(),
        });
        assert_eq!(err.code, Code::DeadlineExceeded);
        assert_eq!(err.output.as_deref(), Some("partial"));
    }

    #[test]
    fn exec_failure_without_output_has_none() {
        let err = RpcError::from(ExecError::Failed {
            reason: FailureReason::NonZeroExit { code: 1 },
            output: String::new(),
        });
        assert_eq!(err.code, Code::Internal);
        assert_eq!(err.output, None);
    }

    #[test]
    fn body_round_trips_code() {
        let body = RpcError::new(Code::PermissionDenied, "nope").into_body();
        assert_eq!(body.code, "permission_denied");
        assert_eq!(RpcError::from(body).code, Code::PermissionDenied);
    }
}
