//! Shared fixtures for the end-to-end scenarios in `tests/`.
//!
//! Every [`Harness`] runs the engine over the real plugins: an in-memory
//! SQLite document store, local object storage in a temp directory and the
//! in-memory session provider.

use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use bytes::Bytes;
use chrono::{Duration, Local};
use pb_auth_simple::SimpleSessionProvider;
use pb_core::{
    AppError, Document, DocumentStore, Fields, Gender, Identity, ImageUpload, ObjectStore, Query,
    Region, ReportDraft, Result,
};
use pb_db_sqlite::SqliteDocumentStore;
use pb_engine::{MutationGateway, ReportStore};
use pb_storage_local::LocalObjectStore;
use secrecy::SecretString;
use tempfile::TempDir;

pub const COLLECTION: &str = "lostPets";

pub struct Harness {
    pub documents: Arc<CountingDocuments>,
    pub store: Arc<ReportStore>,
    pub gateway: MutationGateway,
    pub session: Arc<SimpleSessionProvider>,
    uploads: TempDir,
}

impl Harness {
    pub async fn new() -> Self {
        Self::with_objects(|local| Arc::new(local) as Arc<dyn ObjectStore>).await
    }

    /// Lets a test wrap the local object store, e.g. to inject failures.
    pub async fn with_objects<F>(wrap: F) -> Self
    where
        F: FnOnce(LocalObjectStore) -> Arc<dyn ObjectStore>,
    {
        let uploads = tempfile::tempdir().unwrap();
        let documents = Arc::new(CountingDocuments::new(
            SqliteDocumentStore::in_memory().await.unwrap(),
        ));
        let objects = wrap(LocalObjectStore::new(uploads.path(), "/static/uploads"));

        let store = Arc::new(ReportStore::new(documents.clone(), COLLECTION));
        let gateway = MutationGateway::new(Arc::clone(&store), objects);

        Self {
            documents,
            store,
            gateway,
            session: Arc::new(SimpleSessionProvider::new()),
            uploads,
        }
    }

    /// Registers and signs in a member.
    pub fn sign_up(&self, name: &str) -> Identity {
        self.session
            .sign_up(
                &format!("{name}@example.com"),
                &SecretString::from("correct-horse".to_string()),
                name,
                Some("0912345678"),
            )
            .unwrap()
    }

    /// Number of photo files currently on disk.
    pub fn stored_files(&self) -> usize {
        count_files(self.uploads.path())
    }

    /// Writes a record straight into the document store, bypassing the gateway.
    pub async fn seed(&self, fields: serde_json::Value) -> String {
        let fields = fields.as_object().cloned().unwrap();
        self.documents.insert(COLLECTION, fields).await.unwrap()
    }
}

fn count_files(dir: &Path) -> usize {
    let Ok(entries) = std::fs::read_dir(dir) else {
        return 0;
    };
    entries
        .flatten()
        .map(|entry| {
            let path = entry.path();
            if path.is_dir() {
                count_files(&path)
            } else {
                1
            }
        })
        .sum()
}

/// A complete, valid report form.
pub fn draft(name: &str) -> ReportDraft {
    ReportDraft {
        name: name.into(),
        breed: "Shiba Inu".into(),
        color: "Red".into(),
        age: "3".into(),
        gender: Some(Gender::Male),
        has_collar: Some(true),
        location: Some(Region::Taipei),
        lost_date: Some(Local::now().date_naive() - Duration::days(2)),
        contact_name: "Lin".into(),
        contact_phone: "0912-345-678".into(),
        description: "Answers to his name, scared of scooters".into(),
    }
}

pub fn photo(name: &str) -> ImageUpload {
    ImageUpload::new(name, Bytes::from_static(&[0xff, 0xd8, 0xff, 0xe0]))
}

/// Passes through to the wrapped store and counts inserts.
pub struct CountingDocuments {
    inner: SqliteDocumentStore,
    inserts: AtomicUsize,
}

impl CountingDocuments {
    pub fn new(inner: SqliteDocumentStore) -> Self {
        Self {
            inner,
            inserts: AtomicUsize::new(0),
        }
    }

    pub fn inserts(&self) -> usize {
        self.inserts.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl DocumentStore for CountingDocuments {
    async fn query(&self, collection: &str, query: &Query) -> Result<Vec<Document>> {
        self.inner.query(collection, query).await
    }

    async fn get(&self, collection: &str, id: &str) -> Result<Option<Document>> {
        self.inner.get(collection, id).await
    }

    async fn insert(&self, collection: &str, fields: Fields) -> Result<String> {
        self.inserts.fetch_add(1, Ordering::SeqCst);
        self.inner.insert(collection, fields).await
    }

    async fn update(&self, collection: &str, id: &str, fields: Fields) -> Result<()> {
        self.inner.update(collection, id, fields).await
    }

    async fn delete(&self, collection: &str, id: &str) -> Result<()> {
        self.inner.delete(collection, id).await
    }
}

/// Object store that rejects uploads whose path ends with `poison`.
pub struct FailingUploads {
    inner: LocalObjectStore,
    poison: String,
}

impl FailingUploads {
    pub fn new(inner: LocalObjectStore, poison: impl Into<String>) -> Self {
        Self {
            inner,
            poison: poison.into(),
        }
    }
}

#[async_trait]
impl ObjectStore for FailingUploads {
    async fn upload(&self, path: &str, data: Bytes, content_type: &str) -> Result<()> {
        if path.ends_with(&self.poison) {
            return Err(AppError::from_remote_code(
                "storage/quota-exceeded",
                "bucket is full",
            ));
        }
        self.inner.upload(path, data, content_type).await
    }

    async fn public_url(&self, path: &str) -> Result<String> {
        self.inner.public_url(path).await
    }

    async fn delete(&self, path: &str) -> Result<()> {
        self.inner.delete(path).await
    }
}
