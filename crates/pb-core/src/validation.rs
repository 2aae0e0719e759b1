//! # Input Validation
//!
//! Field-level checks applied before anything touches the remote stores.

use chrono::NaiveDate;
use once_cell::sync::Lazy;
use regex::Regex;
use serde::Deserialize;

use crate::error::ValidationError;
use crate::models::{ImageUpload, Images, ReportDetails, ReportDraft};

static PHONE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^09\d{8}$").expect("static regex"));
static EMAIL: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").expect("static regex"));

/// Upper bounds enforced on report input.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct ReportLimits {
    /// Capped at [`Images::MAX`].
    pub max_images: usize,
    pub max_image_bytes: usize,
    pub max_description_chars: usize,
}

impl Default for ReportLimits {
    fn default() -> Self {
        Self {
            max_images: Images::MAX,
            max_image_bytes: 2 * 1024 * 1024,
            max_description_chars: 1000,
        }
    }
}

impl ReportLimits {
    pub fn image_cap(&self) -> usize {
        self.max_images.clamp(1, Images::MAX)
    }
}

/// Checks a draft and produces the typed editable fields.
///
/// `today` is the caller's local calendar date; a lost date after it is
/// rejected.
pub fn validate_draft(
    draft: &ReportDraft,
    limits: &ReportLimits,
    today: NaiveDate,
) -> Result<ReportDetails, ValidationError> {
    let name = required_text(&draft.name, "name")?;
    let breed = required_text(&draft.breed, "breed")?;
    let color = required_text(&draft.color, "color")?;
    let age = required_text(&draft.age, "age")?;
    let gender = draft.gender.ok_or(ValidationError::MissingField("gender"))?;
    let has_collar = draft
        .has_collar
        .ok_or(ValidationError::MissingField("collar"))?;
    let location = draft
        .location
        .ok_or(ValidationError::MissingField("location"))?;
    let lost_date = draft
        .lost_date
        .ok_or(ValidationError::MissingField("lost date"))?;
    let contact_name = required_text(&draft.contact_name, "contact name")?;
    let contact_phone = required_text(&draft.contact_phone, "contact phone")?;

    if lost_date > today {
        return Err(ValidationError::FutureLostDate(lost_date));
    }
    let contact_phone = normalize_phone(&contact_phone)?;

    let description = draft.description.trim();
    let len = description.chars().count();
    if len > limits.max_description_chars {
        return Err(ValidationError::DescriptionTooLong {
            len,
            max: limits.max_description_chars,
        });
    }

    Ok(ReportDetails {
        name,
        breed,
        color,
        age,
        gender,
        has_collar,
        location,
        lost_date,
        contact_name,
        contact_phone,
        description: (!description.is_empty()).then(|| description.to_string()),
    })
}

fn required_text(value: &str, field: &'static str) -> Result<String, ValidationError> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(ValidationError::MissingField(field));
    }
    Ok(trimmed.to_string())
}

/// Strips spaces and dashes and checks the mobile number shape.
pub fn normalize_phone(raw: &str) -> Result<String, ValidationError> {
    let digits: String = raw.chars().filter(|c| *c != ' ' && *c != '-').collect();
    if PHONE.is_match(&digits) {
        Ok(digits)
    } else {
        Err(ValidationError::PhoneShape(raw.to_string()))
    }
}

pub fn validate_email(email: &str) -> Result<(), ValidationError> {
    if EMAIL.is_match(email.trim()) {
        Ok(())
    } else {
        Err(ValidationError::Email(email.to_string()))
    }
}

/// Checks size and type of one upload and returns the effective content type.
pub fn validate_image(upload: &ImageUpload, limits: &ReportLimits) -> Result<String, ValidationError> {
    if upload.bytes.len() > limits.max_image_bytes {
        return Err(ValidationError::ImageTooLarge {
            name: upload.file_name.clone(),
            size: upload.bytes.len(),
            max: limits.max_image_bytes,
        });
    }

    let content_type = match &upload.content_type {
        Some(declared) => declared.parse::<mime::Mime>().ok(),
        None => mime_guess::from_path(&upload.file_name).first(),
    };
    match content_type {
        Some(ct) if ct.type_() == mime::IMAGE => Ok(ct.essence_str().to_string()),
        other => Err(ValidationError::ImageType {
            name: upload.file_name.clone(),
            content_type: other.map_or_else(|| "unknown".to_string(), |ct| ct.to_string()),
        }),
    }
}

/// The resulting photo count of a create or edit must stay within bounds.
pub fn check_image_count(count: usize, limits: &ReportLimits) -> Result<(), ValidationError> {
    let max = limits.image_cap();
    if count == 0 || count > max {
        return Err(ValidationError::ImageCount { count, max });
    }
    Ok(())
}
