//! # Record Codec
//!
//! Maps loosely-typed documents to [`Report`] at the store boundary, and
//! builds the field maps written back. Older record shapes are coerced here
//! so business logic never deals with optional chaining.

use chrono::{DateTime, NaiveDate, SecondsFormat, TimeZone, Utc};
use serde::de::{self, Deserializer};
use serde::Deserialize;
use serde_json::{json, Value};

use crate::error::AppError;
use crate::filter::parse_collar;
use crate::models::{
    Gender, Identity, Images, Report, ReportDetails, ReportId, ReportStatus, UserId,
};
use crate::region::Region;
use crate::traits::{Document, Fields};

/// Canonical field names.
pub mod field {
    pub const OWNER_ID: &str = "ownerId";
    pub const OWNER_EMAIL: &str = "ownerEmail";
    pub const STATUS: &str = "status";
    pub const CREATED_AT: &str = "createdAt";
    pub const FOUND_AT: &str = "foundAt";
    pub const IMAGES: &str = "images";
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct StoredReport {
    #[serde(alias = "userId")]
    owner_id: String,
    #[serde(default, alias = "userEmail")]
    owner_email: String,
    #[serde(default, deserialize_with = "lenient_status")]
    status: ReportStatus,
    #[serde(default, deserialize_with = "timestamp")]
    created_at: Option<DateTime<Utc>>,
    #[serde(default, deserialize_with = "timestamp")]
    found_at: Option<DateTime<Utc>>,
    lost_date: NaiveDate,
    location: Region,
    name: String,
    breed: String,
    #[serde(default)]
    color: String,
    #[serde(default)]
    age: String,
    #[serde(deserialize_with = "gender")]
    gender: Gender,
    #[serde(alias = "collar", deserialize_with = "collar")]
    has_collar: bool,
    #[serde(default)]
    description: Option<String>,
    #[serde(default, alias = "imageUrls")]
    images: Vec<String>,
    #[serde(default)]
    image_url: Option<String>,
    #[serde(default)]
    contact_name: String,
    #[serde(default)]
    contact_phone: String,
}

/// Decodes one stored document.
pub fn decode_report(doc: &Document) -> Result<Report, AppError> {
    let decode_err = |reason: String| AppError::Decode {
        id: doc.id.clone(),
        reason,
    };

    let stored = StoredReport::deserialize(Value::Object(canonical_fields(&doc.fields)))
        .map_err(|e| decode_err(e.to_string()))?;

    // an edit clears `imageUrl`, so only never-edited records fold it in
    let mut urls = stored.images;
    if let Some(legacy) = stored.image_url.filter(|u| !u.is_empty()) {
        if !urls.contains(&legacy) {
            urls.insert(0, legacy);
        }
    }
    let images = Images::try_from(urls).map_err(|e| decode_err(e.to_string()))?;

    Ok(Report {
        id: ReportId(doc.id.clone()),
        owner_id: UserId(stored.owner_id),
        owner_email: stored.owner_email,
        status: stored.status,
        created_at: stored.created_at,
        found_at: stored.found_at,
        lost_date: stored.lost_date,
        location: stored.location,
        name: stored.name,
        breed: stored.breed,
        color: stored.color,
        age: stored.age,
        gender: stored.gender,
        has_collar: stored.has_collar,
        description: stored.description.filter(|d| !d.trim().is_empty()),
        images,
        contact_name: stored.contact_name,
        contact_phone: stored.contact_phone,
    })
}

/// Older spellings and the canonical key they map to.
const LEGACY_KEYS: [(&str, &str); 4] = [
    ("userId", field::OWNER_ID),
    ("userEmail", field::OWNER_EMAIL),
    ("collar", "hasCollar"),
    ("imageUrls", field::IMAGES),
];

/// Drops null legacy keys, and legacy keys shadowed by their canonical
/// spelling, so a record touched by both writers still decodes.
fn canonical_fields(fields: &Fields) -> Fields {
    let mut fields = fields.clone();
    for (legacy, canonical) in LEGACY_KEYS {
        let shadowed = fields.get(canonical).is_some_and(|v| !v.is_null());
        if shadowed || fields.get(legacy).is_some_and(Value::is_null) {
            fields.remove(legacy);
        }
    }
    fields
}

/// Fields of a brand-new record.
pub fn encode_new(
    details: &ReportDetails,
    images: &Images,
    owner: &Identity,
    created_at: DateTime<Utc>,
) -> Fields {
    let mut fields = encode_details(details, images);
    fields.insert(field::OWNER_ID.into(), json!(owner.id.0));
    fields.insert(field::OWNER_EMAIL.into(), json!(owner.email));
    fields.insert(field::STATUS.into(), json!(ReportStatus::Lost));
    fields.insert(field::CREATED_AT.into(), json!(format_timestamp(created_at)));
    fields.retain(|_, value| !value.is_null());
    fields
}

/// Editable fields only: never carries owner, creation time or status.
/// Legacy collar and photo keys are written as null so a merge removes them;
/// otherwise a removed legacy photo would be folded back on the next decode.
pub fn encode_details(details: &ReportDetails, images: &Images) -> Fields {
    let value = json!({
        "name": details.name,
        "breed": details.breed,
        "color": details.color,
        "age": details.age,
        "gender": details.gender,
        "hasCollar": details.has_collar,
        "location": details.location,
        "lostDate": details.lost_date,
        "contactName": details.contact_name,
        "contactPhone": details.contact_phone,
        "description": details.description,
        "images": images.as_slice(),
        "collar": null,
        "imageUrls": null,
        "imageUrl": null,
    });
    match value {
        Value::Object(fields) => fields,
        _ => Fields::new(),
    }
}

/// Status transition fields; leaving `found` clears the found timestamp.
pub fn encode_status(status: ReportStatus, now: DateTime<Utc>) -> Fields {
    let found_at = match status {
        ReportStatus::Found => json!(format_timestamp(now)),
        ReportStatus::Lost => Value::Null,
    };
    let mut fields = Fields::new();
    fields.insert(field::STATUS.into(), json!(status));
    fields.insert(field::FOUND_AT.into(), found_at);
    fields
}

/// Fixed-width RFC 3339 in UTC, so lexical order equals chronological order.
pub fn format_timestamp(ts: DateTime<Utc>) -> String {
    ts.to_rfc3339_opts(SecondsFormat::Millis, true)
}

fn lenient_status<'de, D: Deserializer<'de>>(d: D) -> Result<ReportStatus, D::Error> {
    let raw = Option::<String>::deserialize(d)?;
    match raw.as_deref().map(str::to_ascii_lowercase).as_deref() {
        None | Some("") | Some("lost") => Ok(ReportStatus::Lost),
        Some("found") => Ok(ReportStatus::Found),
        Some(other) => Err(de::Error::custom(format!("unknown status {other:?}"))),
    }
}

fn gender<'de, D: Deserializer<'de>>(d: D) -> Result<Gender, D::Error> {
    let raw = String::deserialize(d)?;
    match raw.trim().to_lowercase().as_str() {
        "male" | "boy" | "公" => Ok(Gender::Male),
        "female" | "girl" | "母" => Ok(Gender::Female),
        other => Err(de::Error::custom(format!("unknown gender {other:?}"))),
    }
}

fn collar<'de, D: Deserializer<'de>>(d: D) -> Result<bool, D::Error> {
    match Value::deserialize(d)? {
        Value::Bool(flag) => Ok(flag),
        Value::String(s) => {
            parse_collar(&s).ok_or_else(|| de::Error::custom(format!("unknown collar value {s:?}")))
        }
        other => Err(de::Error::custom(format!("unexpected collar value {other}"))),
    }
}

/// Accepts RFC 3339 strings, epoch milliseconds, or `{seconds, nanoseconds}`.
fn timestamp<'de, D: Deserializer<'de>>(d: D) -> Result<Option<DateTime<Utc>>, D::Error> {
    match Value::deserialize(d)? {
        Value::Null => Ok(None),
        Value::String(s) => DateTime::parse_from_rfc3339(&s)
            .map(|ts| Some(ts.with_timezone(&Utc)))
            .map_err(de::Error::custom),
        Value::Number(n) => n
            .as_i64()
            .and_then(|ms| Utc.timestamp_millis_opt(ms).single())
            .map(Some)
            .ok_or_else(|| de::Error::custom(format!("timestamp out of range: {n}"))),
        Value::Object(map) => {
            let seconds = map.get("seconds").and_then(Value::as_i64);
            let nanos = map.get("nanoseconds").and_then(Value::as_u64).unwrap_or(0);
            seconds
                .and_then(|s| Utc.timestamp_opt(s, nanos as u32).single())
                .map(Some)
                .ok_or_else(|| de::Error::custom("malformed timestamp object"))
        }
        other => Err(de::Error::custom(format!("unexpected timestamp {other}"))),
    }
}
