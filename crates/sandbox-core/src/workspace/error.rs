//! Error types for workspace file operations.

/// Errors produced by the file service. Paths are always the caller's
/// relative path, never the resolved host path.
#[derive(Debug, thiserror::Error)]
pub enum FileError {
    #[error("file not found: {path}")]
    NotFound { path: String },

    #[error("{subject} too large: {size} bytes (max: {max})")]
    TooLarge {
        subject: &'static str,
        size: u64,
        max: u64,
    },

    #[error("invalid path {path:?}: {reason}")]
    InvalidPath { path: String, reason: &'static str },

    #[error("path escapes workspace: {path}")]
    PathEscape { path: String },

    #[error("failed to {op} {path}: {source}")]
    Io {
        op: &'static str,
        path: String,
        #[source]
        source: std::io::Error,
    },
}

impl FileError {
    pub(crate) fn io(op: &'static str, path: &str, source: std::io::Error) -> Self {
        if source.kind() == std::io::ErrorKind::NotFound {
            FileError::NotFound {
                path: path.to_string(),
            }
        } else {
            FileError::Io {
                op,
                path: path.to_string(),
                source,
            }
        }
    }
}

/// Result type for file operations.
pub type FileResult<T> = std::result::Result<T, FileError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn io_not_found_becomes_not_found() {
        let err = FileError::io(
            "read",
            "a.txt",
            std::io::Error::new(std::io::ErrorKind::NotFound, "gone"),
        );
        assert!(matches!(err, FileError::NotFound { ref path } if path == "a.txt"));
    }

    #[test]
    fn too_large_message() {
        let err = FileError::TooLarge {
            subject: "content",
            size: 200,
            max: 100,
        };
        assert_eq!(err.to_string(), "content too large: 200 bytes (max: 100)");
    }
}
