//! Bidirectional credential index shared by the store backends.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::{Credential, SessionId, SessionRecord};

#[derive(Debug, Clone)]
struct Entry {
    credential: String,
    created_at: DateTime<Utc>,
}

/// One persisted row of the index.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub(crate) struct SnapshotEntry {
    pub session_id: SessionId,
    pub credential: String,
    pub created_at: DateTime<Utc>,
}

/// `credential -> session` and `session -> credential` kept in lockstep.
///
/// Not synchronized; backends wrap it in a lock.
#[derive(Debug, Clone, Default)]
pub(crate) struct CredentialIndex {
    by_credential: HashMap<String, SessionId>,
    by_session: HashMap<SessionId, Entry>,
}

impl CredentialIndex {
    pub fn insert(&mut self, session_id: &SessionId, credential: &Credential) -> SessionRecord {
        self.insert_at(session_id, credential.expose(), Utc::now())
    }

    fn insert_at(
        &mut self,
        session_id: &SessionId,
        credential: &str,
        created_at: DateTime<Utc>,
    ) -> SessionRecord {
        if let Some(previous) = self.by_session.remove(session_id) {
            self.by_credential.remove(&previous.credential);
        }
        // A credential already bound elsewhere moves to this session.
        if let Some(owner) = self.by_credential.remove(credential) {
            self.by_session.remove(&owner);
        }

        self.by_credential
            .insert(credential.to_string(), session_id.clone());
        self.by_session.insert(
            session_id.clone(),
            Entry {
                credential: credential.to_string(),
                created_at,
            },
        );

        SessionRecord {
            session_id: session_id.clone(),
            created_at,
        }
    }

    pub fn verify(&self, credential: &str) -> Option<SessionId> {
        self.by_credential.get(credential).cloned()
    }

    /// Returns `true` when something was removed.
    pub fn remove(&mut self, session_id: &SessionId) -> bool {
        match self.by_session.remove(session_id) {
            Some(entry) => {
                self.by_credential.remove(&entry.credential);
                true
            }
            None => false,
        }
    }

    pub fn lookup(&self, session_id: &SessionId) -> Option<SessionRecord> {
        self.by_session.get(session_id).map(|entry| SessionRecord {
            session_id: session_id.clone(),
            created_at: entry.created_at,
        })
    }

    pub fn len(&self) -> usize {
        self.by_session.len()
    }

    pub fn snapshot(&self) -> Vec<SnapshotEntry> {
        let mut rows: Vec<SnapshotEntry> = self
            .by_session
            .iter()
            .map(|(session_id, entry)| SnapshotEntry {
                session_id: session_id.clone(),
                credential: entry.credential.clone(),
                created_at: entry.created_at,
            })
            .collect();
        rows.sort_by(|a, b| {
            a.created_at
                .cmp(&b.created_at)
                .then_with(|| a.session_id.cmp(&b.session_id))
        });
        rows
    }

    pub fn restore(rows: Vec<SnapshotEntry>) -> Self {
        let mut index = Self::default();
        for row in rows {
            index.insert_at(&row.session_id, &row.credential, row.created_at);
        }
        index
    }
}
