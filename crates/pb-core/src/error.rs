//! # AppError
//!
//! Centralized error handling for the Pawboard ecosystem.
//! Maps remote and input failures to a small set of stable domain kinds.

use thiserror::Error;

/// The primary error type for all pb-core operations.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum AppError {
    /// Resource not found (e.g., Report)
    #[error("{0} not found with ID {1}")]
    NotFound(String, String),

    /// Malformed input (bad phone shape, future date, image violations, ...)
    #[error("validation error: {0}")]
    Validation(#[from] ValidationError),

    /// Identity absent, or identity is not the owner
    #[error("unauthorized: {0}")]
    Unauthorized(#[from] AuthorizationError),

    /// Remote document/object store unreachable or rejected the call
    #[error("transport error ({kind}): {message}")]
    Transport { kind: TransportKind, message: String },

    /// Another operation is already running against the same resource,
    /// or the resource already exists (e.g., duplicate account email)
    #[error("conflict: {0}")]
    Conflict(String),

    /// A stored record could not be mapped to a domain model
    #[error("malformed record {id}: {reason}")]
    Decode { id: String, reason: String },
}

impl AppError {
    pub fn transport(kind: TransportKind, message: impl Into<String>) -> Self {
        AppError::Transport {
            kind,
            message: message.into(),
        }
    }

    /// Builds a transport error from a remote error code such as
    /// `permission-denied` or `storage/quota-exceeded`.
    pub fn from_remote_code(code: &str, message: impl Into<String>) -> Self {
        AppError::transport(TransportKind::from_remote_code(code), message)
    }

    /// A short message fit for showing to the person who triggered the call.
    pub fn user_message(&self) -> String {
        match self {
            AppError::NotFound(..) => "The report could not be found.".to_string(),
            AppError::Validation(err) => err.to_string(),
            AppError::Unauthorized(AuthorizationError::NotAuthenticated) => {
                "Please sign in first.".to_string()
            }
            AppError::Unauthorized(_) => "You can only change reports you created.".to_string(),
            AppError::Transport { kind, .. } => kind.user_message().to_string(),
            AppError::Conflict(msg) => msg.clone(),
            AppError::Decode { .. } => "A stored report is damaged.".to_string(),
        }
    }
}

/// Input violations, surfaced immediately and never retried.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    #[error("{0} is required")]
    MissingField(&'static str),

    #[error("lost date {0} is in the future")]
    FutureLostDate(chrono::NaiveDate),

    #[error("phone number {0:?} must look like 0912345678")]
    PhoneShape(String),

    #[error("description is {len} characters, the limit is {max}")]
    DescriptionTooLong { len: usize, max: usize },

    #[error("a report needs between 1 and {max} images, got {count}")]
    ImageCount { count: usize, max: usize },

    #[error("image {name:?} is {size} bytes, the limit is {max}")]
    ImageTooLarge { name: String, size: usize, max: usize },

    #[error("file {name:?} is not an image ({content_type})")]
    ImageType { name: String, content_type: String },

    #[error("image {0:?} does not belong to this report")]
    UnknownImage(String),

    #[error("invalid email address {0:?}")]
    Email(String),

    #[error("password must be at least {0} characters")]
    WeakPassword(usize),
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AuthorizationError {
    #[error("authentication required")]
    NotAuthenticated,

    #[error("report {report_id} is owned by someone else")]
    NotOwner { report_id: String },

    #[error("email or password is incorrect")]
    InvalidCredentials,
}

/// Stable classification of remote failures.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TransportKind {
    PermissionDenied,
    Unavailable,
    NotFound,
    ResourceExhausted,
    QuotaExceeded,
    InvalidFormat,
    Cancelled,
    Network,
    Unauthenticated,
    Unknown,
}

impl TransportKind {
    /// Translates a remote error code into a stable kind.
    /// Unrecognized codes map to `Unknown`.
    pub fn from_remote_code(code: &str) -> Self {
        match code {
            "permission-denied" | "storage/unauthorized" => TransportKind::PermissionDenied,
            "unavailable" | "deadline-exceeded" => TransportKind::Unavailable,
            "not-found" | "storage/object-not-found" => TransportKind::NotFound,
            "resource-exhausted" | "auth/too-many-requests" => TransportKind::ResourceExhausted,
            "storage/quota-exceeded" => TransportKind::QuotaExceeded,
            "storage/invalid-format" => TransportKind::InvalidFormat,
            "storage/canceled" | "cancelled" => TransportKind::Cancelled,
            "network-request-failed" | "auth/network-request-failed" | "storage/unknown" => {
                TransportKind::Network
            }
            "unauthenticated" | "auth/user-token-expired" => TransportKind::Unauthenticated,
            _ => TransportKind::Unknown,
        }
    }

    pub fn user_message(self) -> &'static str {
        match self {
            TransportKind::PermissionDenied => "You do not have permission to do that.",
            TransportKind::Unavailable => "The server is unreachable, check your connection.",
            TransportKind::NotFound => "The requested data could not be found.",
            TransportKind::ResourceExhausted => "The service is busy, please try again later.",
            TransportKind::QuotaExceeded => "Storage is full.",
            TransportKind::InvalidFormat => "That file format is not supported.",
            TransportKind::Cancelled => "The upload was cancelled.",
            TransportKind::Network => "Network request failed, check your connection.",
            TransportKind::Unauthenticated => "Your session has expired, please sign in again.",
            TransportKind::Unknown => "Something went wrong, please try again later.",
        }
    }
}

impl std::fmt::Display for TransportKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            TransportKind::PermissionDenied => "permission-denied",
            TransportKind::Unavailable => "unavailable",
            TransportKind::NotFound => "not-found",
            TransportKind::ResourceExhausted => "resource-exhausted",
            TransportKind::QuotaExceeded => "quota-exceeded",
            TransportKind::InvalidFormat => "invalid-format",
            TransportKind::Cancelled => "cancelled",
            TransportKind::Network => "network",
            TransportKind::Unauthenticated => "unauthenticated",
            TransportKind::Unknown => "unknown",
        };
        f.write_str(name)
    }
}

/// A specialized Result type for Pawboard logic.
pub type Result<T> = std::result::Result<T, AppError>;
