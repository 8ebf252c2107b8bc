//! JSON file implementation of ICursorStore
//!
//! The cursor is a single small document. Saves go through a sibling
//! `.tmp` file and a rename so a crash mid-write leaves either the old or
//! the new cursor on disk, never a truncated one.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tokio::sync::Mutex;
use tracing::debug;

use docmeta_core::domain::CursorState;
use docmeta_core::ports::ICursorStore;

use crate::{ensure_parent, StateError};

/// Cursor store backed by one JSON file
#[derive(Debug)]
pub struct FileCursorStore {
    path: PathBuf,
    lock: Mutex<()>,
}

impl FileCursorStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            lock: Mutex::new(()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn tmp_path(&self) -> PathBuf {
        let mut p = self.path.as_os_str().to_owned();
        p.push(".tmp");
        PathBuf::from(p)
    }

    async fn read(&self) -> Result<Option<CursorState>, StateError> {
        let data = match tokio::fs::read(&self.path).await {
            Ok(data) => data,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(StateError::io(&self.path, e)),
        };

        let state = serde_json::from_slice(&data)
            .map_err(|e| StateError::serialization(&self.path, e))?;
        Ok(Some(state))
    }

    async fn write(&self, state: &CursorState) -> Result<(), StateError> {
        ensure_parent(&self.path).await?;

        let data = serde_json::to_vec_pretty(state)
            .map_err(|e| StateError::serialization(&self.path, e))?;

        let tmp_path = self.tmp_path();
        tokio::fs::write(&tmp_path, data)
            .await
            .map_err(|e| StateError::io(&tmp_path, e))?;
        tokio::fs::rename(&tmp_path, &self.path)
            .await
            .map_err(|e| StateError::io(&self.path, e))?;
        Ok(())
    }
}

#[async_trait]
impl ICursorStore for FileCursorStore {
    async fn load(&self) -> anyhow::Result<Option<CursorState>> {
        let _guard = self.lock.lock().await;
        let state = self.read().await?;
        debug!(path = %self.path.display(), found = state.is_some(), "Loaded cursor");
        Ok(state)
    }

    async fn save(&self, state: &CursorState) -> anyhow::Result<()> {
        let _guard = self.lock.lock().await;
        self.write(state).await?;
        debug!(
            path = %self.path.display(),
            resumes_from_delta = state.resumes_from_delta(),
            "Saved cursor"
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tmp_path_is_sibling() {
        let store = FileCursorStore::new("/var/lib/docmeta/cursor.json");
        assert_eq!(
            store.tmp_path(),
            PathBuf::from("/var/lib/docmeta/cursor.json.tmp")
        );
    }
}
