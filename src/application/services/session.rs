//! Persisted wizard positions, one per tree key.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use chrono::Utc;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::application::{ApplicationError, ApplicationResult, IoResultExt};
use crate::domain::{Position, TreeKey};
use crate::infrastructure::traits::FileSystem;

/// File name of the session store inside the data directory.
pub const SESSION_FILE: &str = "sessions.json";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SavedPosition {
    pub choices: Vec<usize>,
    /// RFC 3339 timestamp of the last write
    pub saved_at: String,
}

/// JSON file mapping tree key -> last wizard position.
pub struct SessionStore {
    fs: Arc<dyn FileSystem>,
    path: PathBuf,
}

impl SessionStore {
    pub fn new(fs: Arc<dyn FileSystem>, path: PathBuf) -> Self {
        Self { fs, path }
    }

    /// Store located at `<data_dir>/sessions.json`.
    pub fn in_dir(fs: Arc<dyn FileSystem>, data_dir: &Path) -> Self {
        Self::new(fs, data_dir.join(SESSION_FILE))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// A corrupt store is treated as empty; it is overwritten on the next save.
    fn read_all(&self) -> ApplicationResult<BTreeMap<String, SavedPosition>> {
        if !self.fs.exists(&self.path) {
            return Ok(BTreeMap::new());
        }
        let content = self
            .fs
            .read_to_string(&self.path)
            .with_path_context("read session store", &self.path)?;
        match serde_json::from_str(&content) {
            Ok(all) => Ok(all),
            Err(e) => {
                warn!(
                    "ignoring unreadable session store {}: {}",
                    self.path.display(),
                    e
                );
                Ok(BTreeMap::new())
            }
        }
    }

    fn write_all(&self, all: &BTreeMap<String, SavedPosition>) -> ApplicationResult<()> {
        let content =
            serde_json::to_string_pretty(all).map_err(|e| ApplicationError::OperationFailed {
                context: format!("serialize session store {}", self.path.display()),
                source: Box::new(e),
            })?;
        self.fs
            .ensure_parent(&self.path)
            .with_path_context("create directory for", &self.path)?;
        self.fs
            .write(&self.path, &content)
            .with_path_context("write session store", &self.path)
    }

    pub fn load(&self, key: TreeKey) -> ApplicationResult<Option<Position>> {
        let all = self.read_all()?;
        Ok(all.get(key.as_str()).map(|saved| Position {
            tree: key,
            choices: saved.choices.clone(),
        }))
    }

    pub fn saved_at(&self, key: TreeKey) -> ApplicationResult<Option<String>> {
        Ok(self
            .read_all()?
            .get(key.as_str())
            .map(|saved| saved.saved_at.clone()))
    }

    pub fn save(&self, position: &Position) -> ApplicationResult<()> {
        let mut all = self.read_all()?;
        all.insert(
            position.tree.as_str().to_string(),
            SavedPosition {
                choices: position.choices.clone(),
                saved_at: Utc::now().to_rfc3339(),
            },
        );
        debug!("session store: saved {}", position);
        self.write_all(&all)
    }

    pub fn clear(&self, key: TreeKey) -> ApplicationResult<()> {
        let mut all = self.read_all()?;
        if all.remove(key.as_str()).is_some() {
            debug!("session store: cleared {}", key);
            self.write_all(&all)?;
        }
        Ok(())
    }
}
