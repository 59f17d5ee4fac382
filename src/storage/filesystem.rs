use std::path::{Path, PathBuf};

use async_trait::async_trait;
use bytes::Bytes;

use crate::error::Error;

use super::Storage;

/// Writes everything under one directory, atomically (write to a sibling
/// `.tmp` file, then rename) so a reader never observes a partially
/// written segment or manifest.
pub struct FilesystemStorage {
    root: PathBuf,
}

impl FilesystemStorage {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        FilesystemStorage { root: root.into() }
    }

    fn path(&self, name: &str) -> PathBuf {
        self.root.join(name)
    }
}

async fn write_atomic(path: &Path, bytes: &[u8]) -> Result<(), Error> {
    let tmp = path.with_file_name(format!(
        "{}.tmp",
        path.file_name()
            .and_then(|n| n.to_str())
            .unwrap_or("segment")
    ));
    if let Some(parent) = path.parent() {
        tokio::fs::create_dir_all(parent).await?;
    }
    tokio::fs::write(&tmp, bytes).await?;
    tokio::fs::rename(&tmp, path).await?;
    Ok(())
}

#[async_trait]
impl Storage for FilesystemStorage {
    async fn store_init(&self, name: &str, bytes: Bytes) -> Result<(), Error> {
        write_atomic(&self.path(name), &bytes).await
    }

    async fn store_segment(&self, name: &str, bytes: Bytes) -> Result<(), Error> {
        write_atomic(&self.path(name), &bytes).await
    }

    async fn store_manifests(&self, manifests: &[(String, String)]) -> Result<(), Error> {
        for (name, text) in manifests {
            write_atomic(&self.path(name), text.as_bytes()).await?;
        }
        Ok(())
    }

    async fn remove_segments(&self, names: &[String]) -> Result<(), Error> {
        for name in names {
            match tokio::fs::remove_file(self.path(name)).await {
                Ok(()) => {}
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
                Err(e) => return Err(Error::Io(e)),
            }
        }
        Ok(())
    }
}
