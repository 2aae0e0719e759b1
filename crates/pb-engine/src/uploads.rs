//! Photo upload batching.
//!
//! Uploads in one batch run concurrently and the batch settles as a whole:
//! the output order matches the input order, and a single failure fails the
//! batch after every object it did store has been removed again.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use futures_util::future::join_all;
use pb_core::validation::{validate_image, ReportLimits};
use pb_core::{ImageUpload, ObjectStore, Result, ValidationError};
use tracing::{debug, warn};
use uuid::Uuid;

/// An image that passed validation, with its effective content type.
#[derive(Debug, Clone)]
pub struct PendingUpload {
    pub upload: ImageUpload,
    pub content_type: String,
}

/// Validates every image up front so nothing is uploaded for a bad batch.
pub fn prepare(
    images: Vec<ImageUpload>,
    limits: &ReportLimits,
) -> std::result::Result<Vec<PendingUpload>, ValidationError> {
    images
        .into_iter()
        .map(|upload| {
            let content_type = validate_image(&upload, limits)?;
            Ok(PendingUpload {
                upload,
                content_type,
            })
        })
        .collect()
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredObject {
    pub path: String,
    pub url: String,
}

pub struct Uploader {
    objects: Arc<dyn ObjectStore>,
    prefix: String,
}

impl Uploader {
    pub fn new(objects: Arc<dyn ObjectStore>, prefix: impl Into<String>) -> Self {
        Self {
            objects,
            prefix: prefix.into().trim_matches('/').to_string(),
        }
    }

    pub fn objects(&self) -> Arc<dyn ObjectStore> {
        Arc::clone(&self.objects)
    }

    /// `<prefix>/<millis>_<random>_<file name>`, unique per call.
    pub fn object_path(&self, file_name: &str, now: DateTime<Utc>) -> String {
        let random = Uuid::new_v4().simple().to_string();
        format!(
            "{}/{}_{}_{}",
            self.prefix,
            now.timestamp_millis(),
            &random[..8],
            sanitize_file_name(file_name)
        )
    }

    /// Uploads the batch; all-or-nothing.
    pub async fn upload_all(&self, batch: &[PendingUpload]) -> Result<Vec<StoredObject>> {
        let results = join_all(batch.iter().map(|pending| self.upload_one(pending))).await;

        let mut stored = Vec::with_capacity(results.len());
        let mut first_error = None;
        for result in results {
            match result {
                Ok(object) => stored.push(object),
                Err(err) => {
                    first_error.get_or_insert(err);
                }
            }
        }

        match first_error {
            None => Ok(stored),
            Some(err) => {
                warn!(%err, uploaded = stored.len(), "upload batch failed");
                self.discard(&stored).await;
                Err(err)
            }
        }
    }

    async fn upload_one(&self, pending: &PendingUpload) -> Result<StoredObject> {
        let path = self.object_path(&pending.upload.file_name, Utc::now());
        self.objects
            .upload(&path, pending.upload.bytes.clone(), &pending.content_type)
            .await?;
        let url = self.objects.public_url(&path).await?;
        debug!(%path, "image uploaded");
        Ok(StoredObject { path, url })
    }

    /// Best-effort removal of objects left behind by an aborted mutation.
    pub async fn discard(&self, objects: &[StoredObject]) {
        let results = join_all(objects.iter().map(|o| self.objects.delete(&o.path))).await;
        for (object, result) in objects.iter().zip(results) {
            if let Err(err) = result {
                warn!(%err, path = %object.path, "could not remove orphaned upload");
            }
        }
    }
}

fn sanitize_file_name(name: &str) -> String {
    let base = name.rsplit(['/', '\\']).next().unwrap_or(name);
    let cleaned: String = base
        .chars()
        .map(|c| {
            if c.is_alphanumeric() || matches!(c, '.' | '-' | '_') {
                c
            } else {
                '_'
            }
        })
        .collect();
    if cleaned.is_empty() {
        "image".to_string()
    } else {
        cleaned
    }
}
