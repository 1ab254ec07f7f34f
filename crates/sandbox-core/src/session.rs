//! Sandbox session issuance and teardown.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use rand::rngs::OsRng;
use rand::RngCore;
use thiserror::Error;

use crate::obs;
use crate::store::{Credential, CredentialStore, SessionId, StoreError};

/// Literal prefix that makes credentials recognizable in logs and configs.
pub const CREDENTIAL_PREFIX: &str = "sk_";

/// Number of random bytes behind each credential.
pub const CREDENTIAL_BYTES: usize = 32;

/// Errors from session issuance.
#[derive(Debug, Error)]
pub enum SessionError {
    #[error("failed to generate {what}: {source}")]
    Generation {
        what: &'static str,
        #[source]
        source: rand::Error,
    },

    #[error("failed to store credential: {0}")]
    Store(#[from] StoreError),
}

pub type SessionResult<T> = std::result::Result<T, SessionError>;

/// Result of a successful `init_sandbox`.
#[derive(Debug, Clone)]
pub struct IssuedSession {
    pub session_id: SessionId,
    pub credential: Credential,
    pub created_at: DateTime<Utc>,
}

/// Issues and revokes sandbox sessions against a [`CredentialStore`].
#[derive(Clone)]
pub struct SessionService {
    store: Arc<dyn CredentialStore>,
}

impl SessionService {
    pub fn new(store: Arc<dyn CredentialStore>) -> Self {
        Self { store }
    }

    pub fn store(&self) -> &Arc<dyn CredentialStore> {
        &self.store
    }

    /// Create a fresh session id and credential and persist the pair.
    ///
    /// Uniqueness comes from the OS random source; there is no counter.
    /// A failing random source fails this call only and is not retried.
    pub async fn init_sandbox(&self) -> SessionResult<IssuedSession> {
        let session_id = generate_session_id()?;
        let credential = generate_credential()?;

        let record = self.store.store(&session_id, &credential).await?;
        obs::emit_sandbox_created(&record.session_id, &credential);

        Ok(IssuedSession {
            session_id: record.session_id,
            credential,
            created_at: record.created_at,
        })
    }

    /// Revoke a session. Unknown ids are not an error.
    pub async fn destroy_sandbox(&self, session_id: &SessionId) -> SessionResult<()> {
        self.store.delete(session_id).await?;
        obs::emit_sandbox_destroyed(session_id);
        Ok(())
    }
}

fn random_bytes<const N: usize>(what: &'static str) -> SessionResult<[u8; N]> {
    let mut buf = [0u8; N];
    OsRng
        .try_fill_bytes(&mut buf)
        .map_err(|source| SessionError::Generation { what, source })?;
    Ok(buf)
}

/// 128-bit random (v4) UUID string.
pub fn generate_session_id() -> SessionResult<SessionId> {
    let bytes = random_bytes::<16>("session id")?;
    let id = uuid::Builder::from_random_bytes(bytes).into_uuid();
    Ok(SessionId::new(id.hyphenated().to_string()))
}

/// `sk_` followed by 32 random bytes, hex encoded.
pub fn generate_credential() -> SessionResult<Credential> {
    let bytes = random_bytes::<CREDENTIAL_BYTES>("credential")?;
    Ok(Credential::new(format!(
        "{CREDENTIAL_PREFIX}{}",
        hex::encode(bytes)
    )))
}
