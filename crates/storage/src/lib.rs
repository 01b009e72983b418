mod config;

pub use config::{
    ConfigError, ViewerConfig, ENV_CAPTURE_DELAY_MS, ENV_EXPORT_FILE_NAME, ENV_HTTP_TIMEOUT_SECS,
    ENV_NEAREST_THRESHOLD_PX,
};

use directories::ProjectDirs;
use scriptorium_core::SessionSnapshot;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

const SESSION_SCHEMA_VERSION: u32 = 1;

#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    #[error("unable to resolve local data directory")]
    NoDataDirectory,
    #[error("invalid session name: {0:?}")]
    InvalidSessionName(String),
    #[error("session not found: {0}")]
    SessionNotFound(String),
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("serialization error: {0}")]
    Serde(#[from] serde_json::Error),
}

#[derive(Debug, Clone)]
pub struct Storage {
    root: PathBuf,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct SessionEnvelope {
    version: u32,
    session: SessionSnapshot,
}

impl Storage {
    pub fn from_default_project() -> Result<Self, StorageError> {
        let dirs = ProjectDirs::from("org", "Scriptorium", "Scriptorium")
            .ok_or(StorageError::NoDataDirectory)?;

        Ok(Self { root: dirs.data_local_dir().to_path_buf() })
    }

    pub fn with_root(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn config_path(&self) -> PathBuf {
        self.root.join("config.json")
    }

    /// Stored configuration, or defaults when none was saved
    pub fn load_config(&self) -> Result<ViewerConfig, StorageError> {
        let path = self.config_path();
        if !path.exists() {
            return Ok(ViewerConfig::default());
        }

        Ok(ViewerConfig::from_file(path)?)
    }

    pub fn save_config(&self, config: &ViewerConfig) -> Result<(), StorageError> {
        fs::create_dir_all(&self.root)?;
        config.save_to_file(self.config_path())?;
        Ok(())
    }

    pub fn save_session(&self, name: &str, snapshot: &SessionSnapshot) -> Result<PathBuf, StorageError> {
        let path = self.session_path(name)?;
        fs::create_dir_all(self.sessions_dir())?;
        save_session_file(&path, snapshot)?;
        tracing::debug!(name, path = %path.display(), "saved session");
        Ok(path)
    }

    pub fn load_session(&self, name: &str) -> Result<SessionSnapshot, StorageError> {
        let path = self.session_path(name)?;
        if !path.exists() {
            return Err(StorageError::SessionNotFound(name.to_string()));
        }
        load_session_file(&path)
    }

    /// Names of all saved sessions, sorted
    pub fn list_sessions(&self) -> Result<Vec<String>, StorageError> {
        let dir = self.sessions_dir();
        if !dir.exists() {
            return Ok(Vec::new());
        }

        let mut names = Vec::new();
        for entry in fs::read_dir(dir)? {
            let path = entry?.path();
            if path.extension().is_some_and(|ext| ext == "json") {
                if let Some(stem) = path.file_stem().and_then(|s| s.to_str()) {
                    names.push(stem.to_string());
                }
            }
        }
        names.sort();
        Ok(names)
    }

    fn sessions_dir(&self) -> PathBuf {
        self.root.join("sessions")
    }

    fn session_path(&self, name: &str) -> Result<PathBuf, StorageError> {
        let valid = !name.is_empty()
            && name.chars().all(|c| c.is_alphanumeric() || matches!(c, '-' | '_' | '.'))
            && !name.starts_with('.');
        if !valid {
            return Err(StorageError::InvalidSessionName(name.to_string()));
        }
        Ok(self.sessions_dir().join(format!("{name}.json")))
    }
}

/// Read a session file from an arbitrary location
pub fn load_session_file(path: &Path) -> Result<SessionSnapshot, StorageError> {
    let bytes = fs::read(path)?;
    let envelope: SessionEnvelope = serde_json::from_slice(&bytes)?;
    if envelope.version != SESSION_SCHEMA_VERSION {
        tracing::warn!(
            path = %path.display(),
            version = envelope.version,
            expected = SESSION_SCHEMA_VERSION,
            "session written by a different schema version"
        );
    }
    Ok(envelope.session)
}

pub fn save_session_file(path: &Path, snapshot: &SessionSnapshot) -> Result<(), StorageError> {
    let envelope = SessionEnvelope { version: SESSION_SCHEMA_VERSION, session: snapshot.clone() };
    let bytes = serde_json::to_vec_pretty(&envelope)?;
    fs::write(path, bytes)?;
    Ok(())
}
