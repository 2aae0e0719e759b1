//! # Core Traits (Ports)
//!
//! Any plugin must implement these traits to be used by the engine.
//! All of them report failures as [`AppError`](crate::AppError), adapters
//! are responsible for translating their native errors.

use async_trait::async_trait;
use bytes::Bytes;
use serde_json::Value;
use tokio::sync::watch;

use crate::error::Result;
use crate::models::{Identity, UserId, UserProfile};

/// Loosely-typed record body as held by the document store.
pub type Fields = serde_json::Map<String, Value>;

/// A stored record together with its store-assigned id.
#[derive(Debug, Clone, PartialEq)]
pub struct Document {
    pub id: String,
    pub fields: Fields,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Ascending,
    Descending,
}

/// Equality constraint on a top-level field.
#[derive(Debug, Clone, PartialEq)]
pub struct FieldFilter {
    pub field: String,
    pub value: Value,
}

#[derive(Debug, Clone, PartialEq)]
pub struct OrderBy {
    pub field: String,
    pub direction: Direction,
}

/// Query against one collection: AND of equality filters, optional ordering.
/// Documents missing the ordering field sort last when descending.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Query {
    pub filters: Vec<FieldFilter>,
    pub order_by: Option<OrderBy>,
}

impl Query {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn filter_eq(mut self, field: impl Into<String>, value: impl Into<Value>) -> Self {
        self.filters.push(FieldFilter {
            field: field.into(),
            value: value.into(),
        });
        self
    }

    pub fn order_by(mut self, field: impl Into<String>, direction: Direction) -> Self {
        self.order_by = Some(OrderBy {
            field: field.into(),
            direction,
        });
        self
    }
}

/// Data persistence contract for report records.
#[cfg_attr(any(test, feature = "testing"), mockall::automock)]
#[async_trait]
pub trait DocumentStore: Send + Sync {
    async fn query(&self, collection: &str, query: &Query) -> Result<Vec<Document>>;

    async fn get(&self, collection: &str, id: &str) -> Result<Option<Document>>;

    /// Stores a new record and returns the id the store assigned to it.
    async fn insert(&self, collection: &str, fields: Fields) -> Result<String>;

    /// Merges `fields` into an existing record. A `null` value clears a field.
    async fn update(&self, collection: &str, id: &str, fields: Fields) -> Result<()>;

    async fn delete(&self, collection: &str, id: &str) -> Result<()>;
}

/// Object storage contract for uploaded photos.
#[cfg_attr(any(test, feature = "testing"), mockall::automock)]
#[async_trait]
pub trait ObjectStore: Send + Sync {
    /// Saves raw bytes at a caller-chosen path. Paths must be unique per upload.
    async fn upload(&self, path: &str, data: Bytes, content_type: &str) -> Result<()>;

    /// Returns the stable public URL of a stored object.
    async fn public_url(&self, path: &str) -> Result<String>;

    /// Removes an object; used to compensate for aborted mutations.
    async fn delete(&self, path: &str) -> Result<()>;
}

/// Identity contract. Changes are pushed through [`SessionIdentity::subscribe`];
/// callers must read the identity at call time instead of caching it.
pub trait SessionIdentity: Send + Sync {
    fn current_identity(&self) -> Option<Identity>;

    fn subscribe(&self) -> watch::Receiver<Option<Identity>>;

    fn profile(&self, user_id: &UserId) -> Option<UserProfile>;
}
