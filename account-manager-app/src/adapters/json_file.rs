//! JSON file backed account storage.

use async_trait::async_trait;
use std::io::ErrorKind;
use std::path::PathBuf;

use account_manager_core::error::{CoreError, CoreResult};

use super::document::{DocumentBackend, DocumentMedium};

/// Accounts persisted to a JSON file on disk.
pub type JsonFileBackend = DocumentBackend<JsonFile>;

/// A single JSON file, replaced atomically on write.
pub struct JsonFile {
    path: PathBuf,
}

impl JsonFile {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    fn temp_path(&self) -> PathBuf {
        let mut name = self
            .path
            .file_name()
            .map(|n| n.to_os_string())
            .unwrap_or_default();
        name.push(".tmp");
        self.path.with_file_name(name)
    }
}

#[async_trait]
impl DocumentMedium for JsonFile {
    async fn read(&self) -> CoreResult<Option<String>> {
        match tokio::fs::read_to_string(&self.path).await {
            Ok(json) => Ok(Some(json)),
            Err(e) if e.kind() == ErrorKind::NotFound => {
                log::debug!("No account file at {}", self.path.display());
                Ok(None)
            }
            Err(e) => Err(CoreError::StorageError(format!(
                "failed to read {}: {e}",
                self.path.display()
            ))),
        }
    }

    async fn write(&self, json: &str) -> CoreResult<()> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                tokio::fs::create_dir_all(parent).await.map_err(|e| {
                    CoreError::StorageError(format!(
                        "failed to create {}: {e}",
                        parent.display()
                    ))
                })?;
            }
        }

        let temp = self.temp_path();
        tokio::fs::write(&temp, json).await.map_err(|e| {
            CoreError::StorageError(format!("failed to write {}: {e}", temp.display()))
        })?;
        tokio::fs::rename(&temp, &self.path).await.map_err(|e| {
            CoreError::StorageError(format!(
                "failed to replace {}: {e}",
                self.path.display()
            ))
        })
    }
}

impl JsonFileBackend {
    /// Backend over the file at `path`. Nothing is read until first use.
    pub fn open(path: impl Into<PathBuf>) -> Self {
        Self::with_medium(JsonFile::new(path))
    }
}
