//! Confinement of caller paths to the workspace root.
//!
//! Resolution is join-then-check: the caller path is made relative (a
//! leading `/` is ignored), joined onto the canonical root and cleaned
//! lexically. The result must stay under the root. Every component of it
//! that already exists is then inspected: a symlink is accepted only when
//! its target resolves to a path under the root, so links pointing outside
//! (including dangling ones whose target does not exist yet) are refused.
//! The check and the later OS call are not atomic; a concurrent symlink
//! swap inside the workspace can still race it.

use std::io;
use std::path::{Component, Path, PathBuf};

use super::error::{FileError, FileResult};

/// A canonical directory that all file and shell operations are rooted at.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Workspace {
    root: PathBuf,
}

impl Workspace {
    /// Create `root` if missing and pin its canonical form.
    pub fn open(root: impl AsRef<Path>) -> io::Result<Self> {
        let root = root.as_ref();
        std::fs::create_dir_all(root)?;
        Ok(Self {
            root: root.canonicalize()?,
        })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Map a caller-supplied relative path to a host path under the root.
    pub fn resolve(&self, relative: &str) -> FileResult<PathBuf> {
        if relative.trim().is_empty() {
            return Err(invalid(relative, "empty path"));
        }
        if relative.contains('\0') {
            return Err(invalid(relative, "path contains NUL byte"));
        }

        let stripped: PathBuf = Path::new(relative)
            .components()
            .filter(|c| !matches!(c, Component::RootDir | Component::Prefix(_)))
            .collect();
        let cleaned = PathBuf::from(path_clean::clean(self.root.join(stripped)));

        if !cleaned.starts_with(&self.root) {
            return Err(FileError::PathEscape {
                path: relative.to_string(),
            });
        }
        if cleaned == self.root {
            return Err(invalid(relative, "path names the workspace root"));
        }

        self.check_links(&cleaned, relative)?;
        Ok(cleaned)
    }

    /// Walk the existing prefix of `cleaned` below the root and refuse any
    /// symlink that does not resolve inside it.
    fn check_links(&self, cleaned: &Path, relative: &str) -> FileResult<()> {
        let escape = || FileError::PathEscape {
            path: relative.to_string(),
        };
        let below_root = cleaned.strip_prefix(&self.root).map_err(|_| escape())?;

        let mut current = self.root.clone();
        for component in below_root.components() {
            current.push(component);
            let meta = match std::fs::symlink_metadata(&current) {
                Ok(meta) => meta,
                Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(()),
                Err(e) => return Err(FileError::io("resolve", relative, e)),
            };
            if !meta.file_type().is_symlink() {
                continue;
            }
            match current.canonicalize() {
                Ok(target) if target.starts_with(&self.root) => {}
                Ok(_) => return Err(escape()),
                // Dangling: the target is unknown until something creates it.
                Err(e) if e.kind() == io::ErrorKind::NotFound => return Err(escape()),
                Err(e) => return Err(FileError::io("resolve", relative, e)),
            }
        }
        Ok(())
    }
}

fn invalid(path: &str, reason: &'static str) -> FileError {
    FileError::InvalidPath {
        path: path.to_string(),
        reason,
    }
}
