use anyhow::{Context, Result};
use log::warn;
use std::{
    fs,
    path::{Path, PathBuf},
    sync::{RwLock, RwLockReadGuard, RwLockWriteGuard},
};

use super::state::PersistedSession;

/// JSON file holding the session across restarts.
///
/// Only `SessionManager` writes through it; observers call
/// [`SessionStore::read_from_disk`] when they are told the session changed.
pub struct SessionStore {
    path: PathBuf,
    data: RwLock<PersistedSession>,
}

impl SessionStore {
    pub fn new(path: PathBuf) -> Result<Self> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).with_context(|| {
                format!("failed to create session directory {}", parent.display())
            })?;
        }

        let data = if path.exists() {
            read_file(&path)?
        } else {
            PersistedSession::default()
        };

        Ok(Self {
            path,
            data: RwLock::new(data),
        })
    }

    pub fn load(&self) -> PersistedSession {
        self.read_guard().clone()
    }

    pub fn save(&self, session: &PersistedSession) -> Result<()> {
        let mut guard = self.write_guard();
        self.persist(session)?;
        *guard = session.clone();
        Ok(())
    }

    /// Reads the file again, picking up writes made by another process.
    pub fn read_from_disk(&self) -> Result<PersistedSession> {
        let data = if self.path.exists() {
            read_file(&self.path)?
        } else {
            PersistedSession::default()
        };
        *self.write_guard() = data.clone();
        Ok(data)
    }

    fn persist(&self, data: &PersistedSession) -> Result<()> {
        let serialized = serde_json::to_string_pretty(data)?;
        fs::write(&self.path, serialized)
            .with_context(|| format!("Failed to write session to {}", self.path.display()))
    }

    fn read_guard(&self) -> RwLockReadGuard<'_, PersistedSession> {
        match self.data.read() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }

    fn write_guard(&self) -> RwLockWriteGuard<'_, PersistedSession> {
        match self.data.write() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }
}

fn read_file(path: &Path) -> Result<PersistedSession> {
    let contents = fs::read_to_string(path)
        .with_context(|| format!("Failed to read session from {}", path.display()))?;
    Ok(serde_json::from_str(&contents).unwrap_or_else(|err| {
        warn!("Discarding unreadable session file {}: {err}", path.display());
        PersistedSession::default()
    }))
}
