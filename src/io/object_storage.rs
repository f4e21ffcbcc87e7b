use std::path::{Path, PathBuf};

use async_trait::async_trait;

use crate::io::backend::BackendError;

/// Blob storage for uploaded files. Returns a URL that resolves to the blob.
#[async_trait]
pub trait ObjectStorage: Send + Sync + 'static {
    async fn upload(&self, file_name: &str, bytes: Vec<u8>) -> Result<String, BackendError>;
}

/// Stores blobs as files under a root directory.
#[derive(Clone, Debug)]
pub struct DirectoryStorage {
    root: PathBuf,
    base_url: String,
}

impl DirectoryStorage {
    pub fn new(root: impl Into<PathBuf>, base_url: impl Into<String>) -> Self {
        Self {
            root: root.into(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }
}

#[async_trait]
impl ObjectStorage for DirectoryStorage {
    async fn upload(&self, file_name: &str, bytes: Vec<u8>) -> Result<String, BackendError> {
        let key = format!("{}-{}", uuid::Uuid::new_v4(), sanitize_file_name(file_name));
        super::atomic_write(&self.root.join(&key), &bytes)?;
        tracing::debug!(key = %key, size = bytes.len(), "stored upload");
        Ok(format!("{}/{}", self.base_url, key))
    }
}

fn sanitize_file_name(file_name: &str) -> String {
    let name = Path::new(file_name)
        .file_name()
        .and_then(|name| name.to_str())
        .unwrap_or("");
    let cleaned: String = name
        .chars()
        .map(|ch| {
            if ch.is_ascii_alphanumeric() || matches!(ch, '.' | '-' | '_') {
                ch
            } else {
                '_'
            }
        })
        .collect();
    if cleaned.trim_matches('.').is_empty() {
        "upload".to_string()
    } else {
        cleaned
    }
}
