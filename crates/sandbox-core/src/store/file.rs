use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use parking_lot::RwLock;
use tempfile::NamedTempFile;

use super::index::{CredentialIndex, SnapshotEntry};
use super::{Credential, CredentialStore, SessionId, SessionRecord, StoreError, StoreResult};

/// Credential store mirrored to a JSON snapshot on disk.
///
/// Reads are served from memory and never wait on disk. Mutations are
/// serialized by `writer`: each one is applied to a copy of the index, the
/// copy is written atomically (temp file in the same directory, then
/// rename) on the blocking pool, and only then swapped in. A failed write
/// leaves the live index untouched, so the file always matches some
/// committed state.
#[derive(Debug)]
pub struct FileCredentialStore {
    path: PathBuf,
    index: RwLock<CredentialIndex>,
    writer: tokio::sync::Mutex<()>,
}

impl FileCredentialStore {
    /// Open the snapshot at `path`, creating parent directories if needed.
    /// A missing or empty file starts an empty store.
    pub fn open(path: impl AsRef<Path>) -> StoreResult<Self> {
        let path = path.as_ref().to_path_buf();
        let index = load_snapshot(&path)?;
        tracing::debug!(path = %path.display(), sessions = index.len(), "credential snapshot loaded");
        Ok(Self {
            path,
            index: RwLock::new(index),
            writer: tokio::sync::Mutex::new(()),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    async fn commit<T, F>(&self, mutate: F) -> StoreResult<T>
    where
        F: FnOnce(&mut CredentialIndex) -> (T, bool) + Send,
    {
        let _writer = self.writer.lock().await;
        let mut next = self.index.read().clone();
        let (value, changed) = mutate(&mut next);
        if changed {
            let path = self.path.clone();
            let rows = next.snapshot();
            tokio::task::spawn_blocking(move || write_snapshot(&path, &rows)).await??;
            *self.index.write() = next;
        }
        Ok(value)
    }
}

fn load_snapshot(path: &Path) -> StoreResult<CredentialIndex> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent).map_err(|source| StoreError::Io {
            path: parent.to_path_buf(),
            source,
        })?;
    }

    let bytes = match fs::read(path) {
        Ok(bytes) => bytes,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(CredentialIndex::default()),
        Err(source) => {
            return Err(StoreError::Io {
                path: path.to_path_buf(),
                source,
            })
        }
    };
    if bytes.iter().all(u8::is_ascii_whitespace) {
        return Ok(CredentialIndex::default());
    }

    let rows: Vec<SnapshotEntry> =
        serde_json::from_slice(&bytes).map_err(|source| StoreError::Decode {
            path: path.to_path_buf(),
            source,
        })?;
    Ok(CredentialIndex::restore(rows))
}

fn write_snapshot(path: &Path, rows: &[SnapshotEntry]) -> StoreResult<()> {
    let json = serde_json::to_vec_pretty(rows)?;
    let dir = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    let io_err = |source: std::io::Error| StoreError::Io {
        path: path.to_path_buf(),
        source,
    };

    // NamedTempFile is created 0600, which the persisted file keeps.
    let mut tmp = NamedTempFile::new_in(dir).map_err(io_err)?;
    tmp.write_all(&json).map_err(io_err)?;
    tmp.as_file().sync_all().map_err(io_err)?;
    tmp.persist(path).map_err(|e| io_err(e.error))?;
    Ok(())
}

#[async_trait]
impl CredentialStore for FileCredentialStore {
    async fn store(
        &self,
        session_id: &SessionId,
        credential: &Credential,
    ) -> StoreResult<SessionRecord> {
        self.commit(|index| (index.insert(session_id, credential), true))
            .await
    }

    async fn verify(&self, credential: &str) -> StoreResult<Option<SessionId>> {
        Ok(self.index.read().verify(credential))
    }

    async fn delete(&self, session_id: &SessionId) -> StoreResult<()> {
        self.commit(|index| ((), index.remove(session_id))).await
    }

    async fn lookup(&self, session_id: &SessionId) -> StoreResult<Option<SessionRecord>> {
        Ok(self.index.read().lookup(session_id))
    }

    async fn len(&self) -> StoreResult<usize> {
        Ok(self.index.read().len())
    }
}
