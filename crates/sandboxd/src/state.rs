//! Shared handler state and its construction from [`Config`].

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use sandbox_core::{
    AccessGate, CredentialStore, FileCredentialStore, FileService, MemoryCredentialStore,
    SessionService, ShellExecutor, StoreError, Workspace,
};
use thiserror::Error;
use tracing::info;

use crate::config::{Config, StoreBackend};

#[derive(Debug, Error)]
pub enum StartupError {
    #[error("failed to prepare workspace {}: {source}", path.display())]
    Workspace {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to open credential store: {0}")]
    Store(#[from] StoreError),

    #[error("store.path is required for the file backend")]
    MissingStorePath,
}

/// Services shared by every request. Cheap to clone.
#[derive(Clone)]
pub struct AppState {
    pub sessions: SessionService,
    pub gate: AccessGate,
    pub files: Arc<FileService>,
    pub shell: Arc<ShellExecutor>,
}

impl AppState {
    pub fn new(
        store: Arc<dyn CredentialStore>,
        workspace: Workspace,
        max_file_size: u64,
        shell_timeout: Duration,
    ) -> Self {
        let shell = ShellExecutor::new(&workspace, shell_timeout);
        Self {
            sessions: SessionService::new(store.clone()),
            gate: AccessGate::new(store),
            files: Arc::new(FileService::new(workspace, max_file_size)),
            shell: Arc::new(shell),
        }
    }

    /// Create the workspace directory, open the configured store and wire
    /// the services together.
    pub fn from_config(config: &Config) -> Result<Self, StartupError> {
        let root = &config.sandbox.workspace_dir;
        let workspace = Workspace::open(root).map_err(|source| StartupError::Workspace {
            path: root.clone(),
            source,
        })?;
        info!(workspace = %workspace.root().display(), "workspace ready");

        let store = open_store(config)?;
        Ok(Self::new(
            store,
            workspace,
            config.sandbox.max_file_size,
            config.shell_timeout(),
        ))
    }
}

fn open_store(config: &Config) -> Result<Arc<dyn CredentialStore>, StartupError> {
    match config.store.backend {
        StoreBackend::Memory => {
            info!(backend = "memory", "credential store ready");
            Ok(Arc::new(MemoryCredentialStore::new()))
        }
        StoreBackend::File => {
            let path = config
                .store
                .path
                .as_ref()
                .ok_or(StartupError::MissingStorePath)?;
            let store = FileCredentialStore::open(path)?;
            info!(backend = "file", path = %path.display(), "credential store ready");
            Ok(Arc::new(store))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config_in(dir: &std::path::Path) -> Config {
        let mut config = Config::default();
        config.sandbox.workspace_dir = dir.join("ws");
        config
    }

    #[tokio::test]
    async fn from_config_creates_workspace() {
        let dir = tempfile::tempdir().unwrap();
        let state = AppState::from_config(&config_in(dir.path())).unwrap();
        assert!(dir.path().join("ws").is_dir());
        assert_eq!(state.files.max_file_size(), 104_857_600);
        assert_eq!(state.shell.timeout(), Duration::from_secs(300));
        assert!(state.sessions.store().is_empty().await.unwrap());
    }

    #[tokio::test]
    async fn file_backend_survives_rebuild() {
        let dir = tempfile::tempdir().unwrap();
        let mut config = config_in(dir.path());
        config.store.backend = StoreBackend::File;
        config.store.path = Some(dir.path().join("sessions.json"));

        let issued = AppState::from_config(&config)
            .unwrap()
            .sessions
            .init_sandbox()
            .await
            .unwrap();

        let rebuilt = AppState::from_config(&config).unwrap();
        assert_eq!(
            rebuilt
                .sessions
                .store()
                .verify(issued.credential.expose())
                .await
                .unwrap(),
            Some(issued.session_id)
        );
    }

    #[test]
    fn file_backend_without_path_fails() {
        let dir = tempfile::tempdir().unwrap();
        let mut config = config_in(dir.path());
        config.store.backend = StoreBackend::File;
        assert!(matches!(
            AppState::from_config(&config),
            Err(StartupError::MissingStorePath)
        ));
    }
}
