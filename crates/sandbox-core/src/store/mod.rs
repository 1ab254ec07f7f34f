//! Credential storage for sandbox sessions.
//!
//! A [`CredentialStore`] maps opaque session ids to bearer credentials and
//! back. The two directions are mutual inverses at all times: a credential
//! verifies if and only if its session has not been deleted.
//!
//! Backends:
//! - [`memory::MemoryCredentialStore`] — process-local, never fails, lost on
//!   restart.
//! - [`file::FileCredentialStore`] — the same index mirrored to a JSON
//!   snapshot that survives restarts.

mod index;

pub mod file;
pub mod memory;

use std::fmt;
use std::path::PathBuf;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

pub use file::FileCredentialStore;
pub use memory::MemoryCredentialStore;

/// Opaque identifier of a sandbox session.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SessionId(String);

impl SessionId {
    pub fn new(id: impl Into<String>) -> Self {
        SessionId(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Bearer secret proving the right to act for a session.
///
/// `Debug` only ever prints the masked form.
#[derive(Clone, PartialEq, Eq)]
pub struct Credential(String);

impl Credential {
    pub fn new(value: impl Into<String>) -> Self {
        Credential(value.into())
    }

    /// The full secret. Callers must not log this.
    pub fn expose(&self) -> &str {
        &self.0
    }

    pub fn masked(&self) -> String {
        crate::gate::mask_credential(&self.0)
    }
}

impl fmt::Debug for Credential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Credential({})", self.masked())
    }
}

/// Public view of a live session. Never carries the credential.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionRecord {
    pub session_id: SessionId,
    pub created_at: DateTime<Utc>,
}

/// Errors from credential store backends.
///
/// The in-memory backend never produces these.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("credential snapshot io error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("corrupt credential snapshot at {path}: {source}")]
    Decode {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("failed to encode credential snapshot: {0}")]
    Encode(#[from] serde_json::Error),

    #[error("credential snapshot task failed: {0}")]
    Task(#[from] tokio::task::JoinError),
}

/// Result type for credential store operations.
pub type StoreResult<T> = std::result::Result<T, StoreError>;

/// Session-id/credential mapping shared by every privileged call.
///
/// Guarantees:
/// - `store` replaces any prior credential for the session; the old
///   credential stops verifying.
/// - `verify` never mutates and never blocks other readers.
/// - `delete` is a no-op for unknown sessions.
#[async_trait]
pub trait CredentialStore: Send + Sync {
    /// Bind `credential` to `session_id`, stamping the creation time.
    async fn store(
        &self,
        session_id: &SessionId,
        credential: &Credential,
    ) -> StoreResult<SessionRecord>;

    /// Resolve a presented credential. `Ok(None)` when unknown.
    async fn verify(&self, credential: &str) -> StoreResult<Option<SessionId>>;

    /// Remove a session and its credential.
    async fn delete(&self, session_id: &SessionId) -> StoreResult<()>;

    /// Fetch the public record for a live session.
    async fn lookup(&self, session_id: &SessionId) -> StoreResult<Option<SessionRecord>>;

    /// Number of live sessions.
    async fn len(&self) -> StoreResult<usize>;

    async fn is_empty(&self) -> StoreResult<bool> {
        Ok(self.len().await? == 0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn credential_debug_is_masked() {
        let cred = Credential::new("sk_0123456789abcdef");
        let dbg = format!("{cred:?}");
        assert_eq!(dbg, "Credential(sk_01234...)");
        assert!(!dbg.contains("89abcdef"));
    }

    #[test]
    fn session_id_serializes_transparently() {
        let id = SessionId::new("abc-123");
        assert_eq!(serde_json::to_string(&id).unwrap(), "\"abc-123\"");
        assert_eq!(id.to_string(), "abc-123");
    }

    #[test]
    fn store_error_display_names_path() {
        let err = StoreError::Io {
            path: PathBuf::from("/var/lib/sandbox/sessions.json"),
            source: std::io::Error::new(std::io::ErrorKind::PermissionDenied, "denied"),
        };
        assert!(err.to_string().contains("/var/lib/sandbox/sessions.json"));
    }
}
