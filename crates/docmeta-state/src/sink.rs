//! NDJSON implementation of IRecordSink

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tokio::io::AsyncWriteExt;
use tokio::sync::Mutex;

use docmeta_core::domain::MetadataRecord;
use docmeta_core::ports::IRecordSink;

use crate::{ensure_parent, StateError};

/// Appends one JSON document per line to a file
///
/// The file is opened per write in append mode; the mutex keeps lines from
/// concurrent writers from interleaving.
#[derive(Debug)]
pub struct NdjsonRecordSink {
    path: PathBuf,
    lock: Mutex<()>,
}

impl NdjsonRecordSink {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            lock: Mutex::new(()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    async fn append(&self, line: &[u8]) -> Result<(), StateError> {
        ensure_parent(&self.path).await?;

        let mut file = tokio::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .await
            .map_err(|e| StateError::io(&self.path, e))?;
        file.write_all(line)
            .await
            .map_err(|e| StateError::io(&self.path, e))?;
        file.flush()
            .await
            .map_err(|e| StateError::io(&self.path, e))
    }
}

#[async_trait]
impl IRecordSink for NdjsonRecordSink {
    async fn write(&self, record: &MetadataRecord) -> anyhow::Result<()> {
        let mut line =
            serde_json::to_vec(record).map_err(|e| StateError::serialization(&self.path, e))?;
        line.push(b'\n');

        let _guard = self.lock.lock().await;
        self.append(&line).await?;
        Ok(())
    }
}
