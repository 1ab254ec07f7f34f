use async_trait::async_trait;
use parking_lot::RwLock;

use super::index::CredentialIndex;
use super::{Credential, CredentialStore, SessionId, SessionRecord, StoreResult};

/// In-memory credential store behind a multi-reader/single-writer lock.
///
/// Contents are lost when the process exits, which invalidates every issued
/// credential.
#[derive(Debug, Default)]
pub struct MemoryCredentialStore {
    index: RwLock<CredentialIndex>,
}

impl MemoryCredentialStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl CredentialStore for MemoryCredentialStore {
    async fn store(
        &self,
        session_id: &SessionId,
        credential: &Credential,
    ) -> StoreResult<SessionRecord> {
        Ok(self.index.write().insert(session_id, credential))
    }

    async fn verify(&self, credential: &str) -> StoreResult<Option<SessionId>> {
        Ok(self.index.read().verify(credential))
    }

    async fn delete(&self, session_id: &SessionId) -> StoreResult<()> {
        self.index.write().remove(session_id);
        Ok(())
    }

    async fn lookup(&self, session_id: &SessionId) -> StoreResult<Option<SessionRecord>> {
        Ok(self.index.read().lookup(session_id))
    }

    async fn len(&self) -> StoreResult<usize> {
        Ok(self.index.read().len())
    }
}
