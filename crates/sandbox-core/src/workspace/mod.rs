//! Workspace-scoped file access with a maximum-size policy.
//!
//! # Modules
//!
//! - [`path`]  — `Workspace` root and caller path confinement
//! - [`error`] — `FileError` / `FileResult`

pub mod error;
pub mod path;

use tokio::io::AsyncReadExt;
use tracing::{debug, Instrument};

use crate::obs::session_span;
use crate::store::SessionId;

pub use error::{FileError, FileResult};
pub use path::Workspace;

/// Result of an edit: the caller's path and the content now on disk.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EditOutcome {
    pub path: String,
    pub content: String,
}

/// Read/write/edit confined to one [`Workspace`].
///
/// Stateless apart from its fixed configuration; concurrent calls on the
/// same path are not coordinated and the last writer wins.
#[derive(Debug, Clone)]
pub struct FileService {
    workspace: Workspace,
    max_file_size: u64,
}

impl FileService {
    pub fn new(workspace: Workspace, max_file_size: u64) -> Self {
        Self {
            workspace,
            max_file_size,
        }
    }

    pub fn workspace(&self) -> &Workspace {
        &self.workspace
    }

    pub fn max_file_size(&self) -> u64 {
        self.max_file_size
    }

    /// Read a file as text. Invalid UTF-8 is replaced, not rejected.
    pub async fn read(&self, session_id: &SessionId, path: &str) -> FileResult<String> {
        self.read_inner(path)
            .instrument(session_span(session_id, "file.read"))
            .await
    }

    /// Create or truncate a file, creating parent directories.
    pub async fn write(&self, session_id: &SessionId, path: &str, content: &str) -> FileResult<()> {
        self.write_inner(path, content)
            .instrument(session_span(session_id, "file.write"))
            .await
    }

    /// Replace the whole content of an existing file. Never creates files.
    pub async fn edit(
        &self,
        session_id: &SessionId,
        path: &str,
        content: &str,
    ) -> FileResult<EditOutcome> {
        self.edit_inner(path, content)
            .instrument(session_span(session_id, "file.edit"))
            .await
    }

    async fn read_inner(&self, path: &str) -> FileResult<String> {
        let full = self.workspace.resolve(path)?;

        let file = tokio::fs::File::open(&full)
            .await
            .map_err(|e| FileError::io("open", path, e))?;
        let meta = file
            .metadata()
            .await
            .map_err(|e| FileError::io("stat", path, e))?;
        if meta.is_dir() {
            return Err(FileError::Io {
                op: "read",
                path: path.to_string(),
                source: std::io::Error::new(std::io::ErrorKind::Other, "is a directory"),
            });
        }
        self.check_size("file", meta.len())?;

        // The file may grow between stat and read; never buffer past the limit.
        let mut bytes = Vec::with_capacity(meta.len() as usize);
        file.take(self.max_file_size.saturating_add(1))
            .read_to_end(&mut bytes)
            .await
            .map_err(|e| FileError::io("read", path, e))?;
        self.check_size("file", bytes.len() as u64)?;

        debug!(path = %path, content_length = bytes.len(), "file read");
        Ok(String::from_utf8_lossy(&bytes).into_owned())
    }

    async fn write_inner(&self, path: &str, content: &str) -> FileResult<()> {
        self.check_size("content", content.len() as u64)?;
        let full = self.workspace.resolve(path)?;

        if let Some(parent) = full.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|e| FileError::io("create directories for", path, e))?;
        }
        tokio::fs::write(&full, content.as_bytes())
            .await
            .map_err(|e| FileError::io("write", path, e))?;

        debug!(path = %path, content_length = content.len(), "file written");
        Ok(())
    }

    async fn edit_inner(&self, path: &str, content: &str) -> FileResult<EditOutcome> {
        self.check_size("content", content.len() as u64)?;
        let full = self.workspace.resolve(path)?;

        // No `create`: a missing target surfaces as NotFound instead of a new file.
        let mut file = tokio::fs::OpenOptions::new()
            .write(true)
            .truncate(true)
            .open(&full)
            .await
            .map_err(|e| FileError::io("open", path, e))?;
        tokio::io::AsyncWriteExt::write_all(&mut file, content.as_bytes())
            .await
            .map_err(|e| FileError::io("write", path, e))?;
        tokio::io::AsyncWriteExt::flush(&mut file)
            .await
            .map_err(|e| FileError::io("write", path, e))?;

        debug!(path = %path, content_length = content.len(), "file edited");
        Ok(EditOutcome {
            path: path.to_string(),
            content: content.to_string(),
        })
    }

    fn check_size(&self, subject: &'static str, size: u64) -> FileResult<()> {
        if size > self.max_file_size {
            return Err(FileError::TooLarge {
                subject,
                size,
                max: self.max_file_size,
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const MAX: u64 = 100;

    fn service() -> (tempfile::TempDir, FileService) {
        let dir = tempfile::tempdir().unwrap();
        let ws = Workspace::open(dir.path()).unwrap();
        (dir, FileService::new(ws, MAX))
    }

    fn sid() -> SessionId {
        SessionId::new("sandbox-test")
    }

    #[tokio::test]
    async fn write_read_edit_cycle() {
        let (_dir, svc) = service();
        svc.write(&sid(), "test/example.txt", "Hello, World!")
            .await
            .unwrap();
        assert!(svc.workspace().root().join("test/example.txt").is_file());

        assert_eq!(
            svc.read(&sid(), "test/example.txt").await.unwrap(),
            "Hello, World!"
        );

        let edited = svc
            .edit(&sid(), "test/example.txt", "Hello, Updated World!")
            .await
            .unwrap();
        assert_eq!(edited.path, "test/example.txt");
        assert_eq!(edited.content, "Hello, Updated World!");
        assert_eq!(
            svc.read(&sid(), "test/example.txt").await.unwrap(),
            "Hello, Updated World!"
        );
    }

    #[tokio::test]
    async fn read_missing_is_not_found() {
        let (_dir, svc) = service();
        let err = svc.read(&sid(), "nonexistent.txt").await.unwrap_err();
        assert!(matches!(err, FileError::NotFound { .. }));
    }

    #[tokio::test]
    async fn read_oversized_file_is_too_large() {
        let (_dir, svc) = service();
        std::fs::write(
            svc.workspace().root().join("big.bin"),
            vec![b'x'; MAX as usize + 1],
        )
        .unwrap();
        let err = svc.read(&sid(), "big.bin").await.unwrap_err();
        assert!(matches!(err, FileError::TooLarge { size, .. } if size == MAX + 1));
    }

    #[tokio::test]
    async fn read_directory_is_io_error() {
        let (_dir, svc) = service();
        std::fs::create_dir(svc.workspace().root().join("sub")).unwrap();
        let err = svc.read(&sid(), "sub").await.unwrap_err();
        assert!(matches!(err, FileError::Io { .. }));
    }

    #[tokio::test]
    async fn read_invalid_utf8_is_lossy() {
        let (_dir, svc) = service();
        std::fs::write(svc.workspace().root().join("bin"), [0x66, 0xff, 0x6f]).unwrap();
        assert_eq!(svc.read(&sid(), "bin").await.unwrap(), "f\u{fffd}o");
    }

    #[tokio::test]
    async fn write_over_limit_leaves_no_trace() {
        let (_dir, svc) = service();
        let content = "a".repeat(MAX as usize + 1);
        let err = svc.write(&sid(), "nested/large.txt", &content).await.unwrap_err();
        assert!(matches!(err, FileError::TooLarge { .. }));
        assert!(!svc.workspace().root().join("nested").exists());
    }

    #[tokio::test]
    async fn edit_missing_creates_nothing() {
        let (_dir, svc) = service();
        let err = svc.edit(&sid(), "ghost.txt", "boo").await.unwrap_err();
        assert!(matches!(err, FileError::NotFound { .. }));
        assert!(!svc.workspace().root().join("ghost.txt").exists());
    }

    #[tokio::test]
    async fn edit_over_limit_keeps_old_content() {
        let (_dir, svc) = service();
        svc.write(&sid(), "keep.txt", "original").await.unwrap();
        let err = svc
            .edit(&sid(), "keep.txt", &"z".repeat(MAX as usize + 1))
            .await
            .unwrap_err();
        assert!(matches!(err, FileError::TooLarge { .. }));
        assert_eq!(svc.read(&sid(), "keep.txt").await.unwrap(), "original");
    }

    #[tokio::test]
    async fn traversal_rejected_before_io() {
        let (dir, svc) = service();
        let err = svc
            .write(&sid(), "../escaped.txt", "nope")
            .await
            .unwrap_err();
        assert!(matches!(err, FileError::PathEscape { .. }));
        assert!(!dir.path().parent().unwrap().join("escaped.txt").exists());
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn write_through_dangling_link_creates_nothing_outside() {
        let (_dir, svc) = service();
        let outside = tempfile::tempdir().unwrap();
        let target = outside.path().join("planted.txt");
        std::os::unix::fs::symlink(&target, svc.workspace().root().join("link")).unwrap();

        let err = svc.write(&sid(), "link", "pwned").await.unwrap_err();
        assert!(matches!(err, FileError::PathEscape { .. }));
        assert!(!target.exists());
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn edit_through_link_leaves_outside_file_alone() {
        let (_dir, svc) = service();
        let outside = tempfile::tempdir().unwrap();
        let target = outside.path().join("config.txt");
        std::fs::write(&target, "original").unwrap();
        std::os::unix::fs::symlink(&target, svc.workspace().root().join("link")).unwrap();

        let err = svc.edit(&sid(), "link", "pwned").await.unwrap_err();
        assert!(matches!(err, FileError::PathEscape { .. }));
        assert_eq!(std::fs::read_to_string(&target).unwrap(), "original");
    }
}
