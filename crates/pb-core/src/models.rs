//! # Domain Models
//!
//! These structs represent the core entities of Pawboard.
//! Records arrive from the document store loosely typed; everything here is
//! the strongly-typed shape business logic works with (see `record`).

use bytes::Bytes;
use chrono::{DateTime, NaiveDate, TimeZone, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::region::Region;

/// Opaque identifier assigned by the document store on creation.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ReportId(pub String);

/// Identifier of an authenticated account.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct UserId(pub String);

impl fmt::Display for ReportId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for ReportId {
    fn from(value: &str) -> Self {
        ReportId(value.to_string())
    }
}

impl From<&str> for UserId {
    fn from(value: &str) -> Self {
        UserId(value.to_string())
    }
}

/// The authenticated caller, as supplied by the session identity port.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Identity {
    pub id: UserId,
    pub email: String,
    pub display_name: Option<String>,
}

/// Extra account data kept alongside the identity (used to pre-fill contacts).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserProfile {
    pub id: UserId,
    pub email: String,
    pub display_name: String,
    pub phone: Option<String>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReportStatus {
    #[default]
    Lost,
    Found,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Gender {
    #[serde(alias = "公", alias = "boy")]
    Male,
    #[serde(alias = "母", alias = "girl")]
    Female,
}

/// Ordered photo URLs of a report. Always holds between 1 and
/// [`Images::MAX`] entries; order is display order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "Vec<String>", into = "Vec<String>")]
pub struct Images(Vec<String>);

impl Images {
    pub const MAX: usize = 3;

    pub fn as_slice(&self) -> &[String] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Never true for a constructed value; present for API symmetry.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn contains(&self, url: &str) -> bool {
        self.0.iter().any(|u| u == url)
    }
}

impl TryFrom<Vec<String>> for Images {
    type Error = crate::error::ValidationError;

    fn try_from(urls: Vec<String>) -> Result<Self, Self::Error> {
        if urls.is_empty() || urls.len() > Images::MAX {
            return Err(crate::error::ValidationError::ImageCount {
                count: urls.len(),
                max: Images::MAX,
            });
        }
        Ok(Images(urls))
    }
}

impl From<Images> for Vec<String> {
    fn from(images: Images) -> Self {
        images.0
    }
}

/// A single lost/found-pet submission.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Report {
    pub id: ReportId,
    pub owner_id: UserId,
    /// Denormalized from the session identity at creation.
    pub owner_email: String,
    pub status: ReportStatus,
    /// Server-assigned; legacy records may lack it.
    pub created_at: Option<DateTime<Utc>>,
    pub found_at: Option<DateTime<Utc>>,
    pub lost_date: NaiveDate,
    pub location: Region,
    pub name: String,
    pub breed: String,
    pub color: String,
    pub age: String,
    pub gender: Gender,
    pub has_collar: bool,
    pub description: Option<String>,
    pub images: Images,
    pub contact_name: String,
    pub contact_phone: String,
}

impl Report {
    /// Whole days elapsed since the report was filed, rounded down.
    pub fn days_since_report<Tz: TimeZone>(&self, now: &DateTime<Tz>) -> Option<i64> {
        let created = self.created_at?;
        Some(
            now.clone()
                .with_timezone(&Utc)
                .signed_duration_since(created)
                .num_days(),
        )
    }

    pub fn is_owned_by(&self, identity: &Identity) -> bool {
        self.owner_id == identity.id
    }
}

/// Form input for creating or editing a report. Every field is optional
/// until validated into [`ReportDetails`].
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ReportDraft {
    pub name: String,
    pub breed: String,
    pub color: String,
    pub age: String,
    pub gender: Option<Gender>,
    pub has_collar: Option<bool>,
    pub location: Option<Region>,
    pub lost_date: Option<NaiveDate>,
    pub contact_name: String,
    pub contact_phone: String,
    pub description: String,
}

impl ReportDraft {
    /// An empty draft with contact fields taken from the signed-in profile.
    pub fn prefilled_for(profile: &UserProfile) -> Self {
        Self {
            contact_name: profile.display_name.clone(),
            contact_phone: profile.phone.clone().unwrap_or_default(),
            ..Self::default()
        }
    }
}

/// The editable portion of a report after validation.
#[derive(Debug, Clone, PartialEq)]
pub struct ReportDetails {
    pub name: String,
    pub breed: String,
    pub color: String,
    pub age: String,
    pub gender: Gender,
    pub has_collar: bool,
    pub location: Region,
    pub lost_date: NaiveDate,
    pub contact_name: String,
    /// Normalized to digits only.
    pub contact_phone: String,
    pub description: Option<String>,
}

/// Edit request: the full replacement of the editable fields plus the
/// existing image URLs the caller chose to keep, in display order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ReportPatch {
    pub draft: ReportDraft,
    pub retained_images: Vec<String>,
}

/// A photo selected for upload.
#[derive(Debug, Clone, PartialEq)]
pub struct ImageUpload {
    pub file_name: String,
    /// Declared MIME type; guessed from the file name when absent.
    pub content_type: Option<String>,
    pub bytes: Bytes,
}

impl ImageUpload {
    pub fn new(file_name: impl Into<String>, bytes: impl Into<Bytes>) -> Self {
        Self {
            file_name: file_name.into(),
            content_type: None,
            bytes: bytes.into(),
        }
    }

    pub fn with_content_type(mut self, content_type: impl Into<String>) -> Self {
        self.content_type = Some(content_type.into());
        self
    }
}
