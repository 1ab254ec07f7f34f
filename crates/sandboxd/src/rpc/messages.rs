//! Wire messages, protobuf-JSON style (camelCase field names).
//!
//! Shared by the server handlers and [`crate::client::SandboxClient`].

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Procedure paths, `/<package>.<Service>/<Method>`.
pub mod procedures {
    pub const INIT_SANDBOX: &str = "/core.v1.CoreService/InitSandbox";
    pub const DESTROY_SANDBOX: &str = "/core.v1.CoreService/DestroySandbox";
    pub const FILE_READ: &str = "/file.v1.FileService/Read";
    pub const FILE_WRITE: &str = "/file.v1.FileService/Write";
    pub const FILE_EDIT: &str = "/file.v1.FileService/Edit";
    pub const SHELL_EXECUTE: &str = "/shell.v1.ShellService/Execute";
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Empty {}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InitSandboxResponse {
    pub sandbox_id: String,
    pub api_key: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ReadRequest {
    pub path: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ReadResponse {
    pub content: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct WriteRequest {
    pub path: String,
    pub content: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct EditRequest {
    pub path: String,
    pub content: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct EditResponse {
    pub path: String,
    pub content: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ExecuteRequest {
    pub command: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ExecuteResponse {
    pub output: String,
}

/// Connect error body. `output` is only set for failed Execute calls that
/// produced something before failing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorBody {
    pub code: String,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub output: Option<String>,
}
