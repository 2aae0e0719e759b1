//! pawboard/crates/pb-core/src/lib.rs
//!
//! The central domain logic and interface definitions for Pawboard.

pub mod error;
pub mod filter;
pub mod models;
pub mod record;
pub mod region;
pub mod traits;
pub mod validation;

// Re-exporting for easier access in other crates
pub use error::*;
pub use filter::{FilterCriteria, RawFilter, Recency};
pub use models::*;
pub use region::Region;
pub use traits::*;
pub use validation::ReportLimits;
