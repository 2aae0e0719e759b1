//! # pb-storage-local
//! Local filesystem implementation of `ObjectStore`.
//! Objects live under a root directory at the caller-chosen path and are
//! served from `url_prefix`.

use std::io::ErrorKind;
use std::path::{Component, Path, PathBuf};

use async_trait::async_trait;
use bytes::Bytes;
use pb_core::traits::ObjectStore;
use pb_core::{AppError, Result, TransportKind};
use tokio::fs;
use tracing::debug;

pub struct LocalObjectStore {
    /// Root directory for all uploads (e.g., "./data/uploads")
    root_path: PathBuf,
    /// Public URL prefix (e.g., "/static/uploads")
    url_prefix: String,
}

impl LocalObjectStore {
    pub fn new(root: impl Into<PathBuf>, url_prefix: impl Into<String>) -> Self {
        Self {
            root_path: root.into(),
            url_prefix: url_prefix.into().trim_end_matches('/').to_string(),
        }
    }

    /// Resolves an object path below the root, refusing anything that
    /// would escape it.
    fn resolve(&self, path: &str) -> Result<PathBuf> {
        let relative = Path::new(path);
        let escapes = relative
            .components()
            .any(|c| !matches!(c, Component::Normal(_)));
        if path.is_empty() || escapes {
            return Err(AppError::transport(
                TransportKind::PermissionDenied,
                format!("object path {path:?} is outside the storage root"),
            ));
        }
        Ok(self.root_path.join(relative))
    }
}

#[async_trait]
impl ObjectStore for LocalObjectStore {
    async fn upload(&self, path: &str, data: Bytes, content_type: &str) -> Result<()> {
        let target = self.resolve(path)?;
        if let Some(parent) = target.parent() {
            fs::create_dir_all(parent).await.map_err(io_error)?;
        }
        fs::write(&target, &data).await.map_err(io_error)?;
        debug!(%path, %content_type, bytes = data.len(), "object stored");
        Ok(())
    }

    async fn public_url(&self, path: &str) -> Result<String> {
        let target = self.resolve(path)?;
        if !fs::try_exists(&target).await.map_err(io_error)? {
            return Err(AppError::transport(
                TransportKind::NotFound,
                format!("object {path} does not exist"),
            ));
        }
        Ok(format!("{}/{}", self.url_prefix, path))
    }

    async fn delete(&self, path: &str) -> Result<()> {
        let target = self.resolve(path)?;
        fs::remove_file(&target).await.map_err(io_error)
    }
}

fn io_error(err: std::io::Error) -> AppError {
    let kind = match err.kind() {
        ErrorKind::NotFound => TransportKind::NotFound,
        ErrorKind::PermissionDenied => TransportKind::PermissionDenied,
        _ => TransportKind::Unknown,
    };
    AppError::transport(kind, err.to_string())
}
