//! # Mutation Gateway
//!
//! Executes create/update/status/delete against the remote stores. Every
//! operation takes the acting identity explicitly, checks ownership before
//! writing, and refreshes the [`ReportStore`] on success. The gateway never
//! touches the store's snapshot itself.

use std::sync::Arc;

use chrono::{Local, NaiveDate, Utc};
use pb_core::record::{decode_report, encode_details, encode_new, encode_status};
use pb_core::validation::{check_image_count, validate_draft, ReportLimits};
use pb_core::{
    AppError, AuthorizationError, DocumentStore, Identity, ImageUpload, Images, ObjectStore,
    Report, ReportDraft, ReportId, ReportPatch, ReportStatus, Result, UserId, ValidationError,
};
use tracing::{debug, info, warn};

use crate::inflight::InFlight;
use crate::store::ReportStore;
use crate::uploads::{self, StoredObject, Uploader};

/// Whether the store picked up the change after a successful write.
#[derive(Debug, Clone, PartialEq)]
pub enum ViewRefresh {
    Current,
    /// The write went through but the follow-up refresh failed; the view
    /// shows the previous snapshot until the next successful refresh.
    Stale(AppError),
}

#[derive(Debug, Clone, PartialEq)]
pub struct Receipt {
    pub report_id: ReportId,
    pub view: ViewRefresh,
}

pub struct MutationGateway {
    store: Arc<ReportStore>,
    documents: Arc<dyn DocumentStore>,
    uploader: Uploader,
    limits: ReportLimits,
    in_flight: InFlight,
}

impl MutationGateway {
    pub fn new(store: Arc<ReportStore>, objects: Arc<dyn ObjectStore>) -> Self {
        Self {
            documents: store.documents(),
            store,
            uploader: Uploader::new(objects, "pets"),
            limits: ReportLimits::default(),
            in_flight: InFlight::default(),
        }
    }

    pub fn with_limits(mut self, limits: ReportLimits) -> Self {
        self.limits = limits;
        self
    }

    /// Folder uploaded photos are stored under.
    pub fn with_upload_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.uploader = Uploader::new(self.uploader.objects(), prefix);
        self
    }

    pub fn store(&self) -> &Arc<ReportStore> {
        &self.store
    }

    /// Files a new report owned by `identity`, with status LOST.
    ///
    /// Photos are uploaded before the record is written; if any upload
    /// fails, no record is created.
    pub async fn create(
        &self,
        identity: Option<&Identity>,
        draft: &ReportDraft,
        images: Vec<ImageUpload>,
    ) -> Result<Receipt> {
        // 1. Authentication
        let identity = identity.ok_or(AuthorizationError::NotAuthenticated)?;

        // 2. Validation, before anything leaves the client
        let details = validate_draft(draft, &self.limits, today())?;
        check_image_count(images.len(), &self.limits)?;
        let batch = uploads::prepare(images, &self.limits)?;

        // 3. Media
        let stored = self.uploader.upload_all(&batch).await?;
        let images = images_from(&stored)?;

        // 4. Persistence
        let fields = encode_new(&details, &images, identity, Utc::now());
        let id = match self.documents.insert(self.store.collection(), fields).await {
            Ok(id) => ReportId(id),
            Err(err) => {
                self.uploader.discard(&stored).await;
                return Err(err);
            }
        };
        info!(report_id = %id, owner = %identity.id, images = stored.len(), "report created");

        Ok(self.finish(id).await)
    }

    /// Replaces the editable fields of a report owned by `identity`.
    ///
    /// `patch.retained_images` lists the existing photos to keep; they are
    /// followed by the newly uploaded ones. Owner, creation time and status
    /// are never written here.
    pub async fn update(
        &self,
        identity: Option<&Identity>,
        report_id: &ReportId,
        patch: &ReportPatch,
        new_images: Vec<ImageUpload>,
    ) -> Result<Receipt> {
        let identity = identity.ok_or(AuthorizationError::NotAuthenticated)?;
        let _guard = self.in_flight.acquire(report_id)?;

        let current = self.load(report_id).await?;
        authorize(identity, &current.owner_id, report_id)?;

        let details = validate_draft(&patch.draft, &self.limits, today())?;
        if let Some(unknown) = patch
            .retained_images
            .iter()
            .find(|url| !current.images.contains(url))
        {
            return Err(ValidationError::UnknownImage(unknown.clone()).into());
        }
        check_image_count(patch.retained_images.len() + new_images.len(), &self.limits)?;
        let batch = uploads::prepare(new_images, &self.limits)?;

        let stored = self.uploader.upload_all(&batch).await?;
        let merged: Vec<String> = patch
            .retained_images
            .iter()
            .cloned()
            .chain(stored.iter().map(|o| o.url.clone()))
            .collect();
        let images = Images::try_from(merged)?;

        let fields = encode_details(&details, &images);
        if let Err(err) = self
            .documents
            .update(self.store.collection(), &report_id.0, fields)
            .await
        {
            self.uploader.discard(&stored).await;
            return Err(err);
        }
        info!(%report_id, added = stored.len(), kept = patch.retained_images.len(), "report updated");

        Ok(self.finish(report_id.clone()).await)
    }

    /// Moves a report to `status`. Repeating the current status is accepted
    /// and writes nothing.
    pub async fn set_status(
        &self,
        identity: Option<&Identity>,
        report_id: &ReportId,
        status: ReportStatus,
    ) -> Result<Receipt> {
        let identity = identity.ok_or(AuthorizationError::NotAuthenticated)?;
        let _guard = self.in_flight.acquire(report_id)?;

        let current = self.load(report_id).await?;
        authorize(identity, &current.owner_id, report_id)?;

        if current.status == status {
            debug!(%report_id, ?status, "status unchanged");
        } else {
            self.documents
                .update(
                    self.store.collection(),
                    &report_id.0,
                    encode_status(status, Utc::now()),
                )
                .await?;
            info!(%report_id, ?status, "report status changed");
        }

        Ok(self.finish(report_id.clone()).await)
    }

    /// Removes a report. `owner_id` is the owner the caller believes the
    /// report has; both it and the stored owner must match `identity`.
    /// The report leaves the view only after the remote delete succeeded.
    pub async fn delete(
        &self,
        identity: Option<&Identity>,
        report_id: &ReportId,
        owner_id: &UserId,
    ) -> Result<Receipt> {
        let identity = identity.ok_or(AuthorizationError::NotAuthenticated)?;
        authorize(identity, owner_id, report_id)?;
        let _guard = self.in_flight.acquire(report_id)?;

        let current = self.load(report_id).await?;
        authorize(identity, &current.owner_id, report_id)?;

        self.documents
            .delete(self.store.collection(), &report_id.0)
            .await?;
        info!(%report_id, "report deleted");

        Ok(self.finish(report_id.clone()).await)
    }

    async fn load(&self, report_id: &ReportId) -> Result<Report> {
        let doc = self
            .documents
            .get(self.store.collection(), &report_id.0)
            .await?
            .ok_or_else(|| AppError::NotFound("Report".into(), report_id.0.clone()))?;
        decode_report(&doc)
    }

    async fn finish(&self, report_id: ReportId) -> Receipt {
        let view = match self.store.refresh().await {
            Ok(_) => ViewRefresh::Current,
            Err(err) => {
                warn!(%err, %report_id, "change saved but the view could not be refreshed");
                ViewRefresh::Stale(err)
            }
        };
        Receipt { report_id, view }
    }
}

fn authorize(identity: &Identity, owner_id: &UserId, report_id: &ReportId) -> Result<()> {
    if &identity.id != owner_id {
        warn!(%report_id, caller = %identity.id, "rejected change by non-owner");
        return Err(AuthorizationError::NotOwner {
            report_id: report_id.0.clone(),
        }
        .into());
    }
    Ok(())
}

fn images_from(stored: &[StoredObject]) -> Result<Images> {
    let urls = stored.iter().map(|o| o.url.clone()).collect::<Vec<_>>();
    Ok(Images::try_from(urls)?)
}

fn today() -> NaiveDate {
    Local::now().date_naive()
}
